use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, AppState};

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Tool catalogue and dispatch
        .route("/tools", get(handlers::list_tools))
        .route("/tools/:name", post(handlers::call_tool))
}
