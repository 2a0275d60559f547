use crate::error::AppError;
use crate::handlers::{health, sales};
use crate::state::AppState;
use axum::{Router, http::Uri, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/skinport-live", get(sales::live_sales))
        .route("/health", get(health::health))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
