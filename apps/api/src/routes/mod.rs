pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::course::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/generate-course", post(handlers::handle_generate_course))
        .route(
            "/generate-course-simple",
            post(handlers::handle_generate_course_simple),
        )
        .with_state(state)
}
