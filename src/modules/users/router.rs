use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{create_user, get_profile, update_profile};

pub fn init_users_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/me", get(get_profile).patch(update_profile))
}
