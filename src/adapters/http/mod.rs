pub mod routes;
pub mod state;
pub mod ws;

use axum::{routing::{get, post}, Router};
use crate::adapters::http::state::HttpState;
use crate::adapters::http::ws::ws_handler;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/hazards", get(routes::list_hazards))
        .route("/log-hazard", post(routes::log_hazard))
        .route("/ws/video", get(ws_handler))
        .with_state(state)
}
