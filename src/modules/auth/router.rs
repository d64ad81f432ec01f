use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::{obtain_token, register_with_pin};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/token", post(obtain_token))
        .route("/register", post(register_with_pin))
}
