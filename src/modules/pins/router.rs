use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{get_pin, issue_pins, list_pins, redeem_pin};

pub fn init_pins_router() -> Router<AppState> {
    Router::new()
        .route("/", post(issue_pins).get(list_pins))
        .route("/redeem", post(redeem_pin))
        .route("/{code}", get(get_pin))
}
