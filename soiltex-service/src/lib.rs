//! Soiltex Service Library
//!
//! HTTP handlers and types for the soil texture and hydraulics service.
//! This library is used by both the soiltex-service binary and integration tests.

pub mod handlers;
pub mod locale;

use std::sync::Arc;

use axum::{routing::get, Router};
use soiltex::SoilService;

/// Application state shared across handlers.
pub struct AppState {
    /// Soil service for texture and hydraulics queries.
    pub soil_service: SoilService,
}

/// API routes without documentation or middleware layers.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/soil-texture", get(handlers::get_soil_texture))
        .route("/api/soil-hydraulics", get(handlers::get_soil_hydraulics))
        .route("/health", get(handlers::health_check))
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{
    ErrorResponse, HealthResponse, HydraulicsQuery, HydraulicsResponse, TextureLayer, TextureQuery,
};
pub use locale::Lang;
