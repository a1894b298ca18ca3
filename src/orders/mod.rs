mod dto;
pub mod handlers;
pub mod repo;
pub mod service;

use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::order_form).post(handlers::create_order))
        .route("/order/success/:order_id", get(handlers::order_success))
}
