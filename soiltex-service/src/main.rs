//! Soiltex Service - HTTP microservice for soil texture and hydraulics.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SOILTEX_PORT` | HTTP server port | 5000 |
//! | `SOILTEX_SOIL_TABLE` | Soil class table JSON | `<exe dir>/data/soil_texture.json`, then `./data/soil_texture.json` |
//! | `SOILTEX_WCS_URL` | SoilGrids WCS endpoint | `https://maps.isric.org/mapserv` |
//! | `SOILTEX_FETCH_TIMEOUT` | Per-request timeout in seconds | 120 |
//! | `SOILTEX_MODEL_CMD` | Moisture model executable | None |
//! | `SOILTEX_MODEL_ARGS` | Fixed model arguments, whitespace-separated | None |
//! | `SOILTEX_MODEL_NAME` | Name for plain-text model output | executable stem |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /api/soil-texture?longitude=X&latitude=Y` - Texture per depth
//! - `GET /api/soil-hydraulics?longitude=X&latitude=Y&depth=0-5cm&lang=en` - Soil class and hydraulics
//! - `GET /health` - Health check
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use soiltex::SoilServiceBuilder;
use soiltex_service::{app, handlers, locale, AppState};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation for the soiltex service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Soiltex Service",
        version = "0.1.0",
        description = "Soil texture per depth from SoilGrids, soil class matching and hydraulic properties.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_soil_texture,
        handlers::get_soil_hydraulics,
        handlers::health_check,
    ),
    components(
        schemas(
            handlers::TextureQuery,
            handlers::HydraulicsQuery,
            handlers::TextureLayer,
            handlers::Location,
            handlers::TextureComposition,
            handlers::HydraulicPropertiesView,
            handlers::HydraulicsResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            locale::Lang,
        )
    ),
    tags(
        (name = "soil", description = "Soil texture and hydraulics endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soiltex_service=info,soiltex=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("SOILTEX_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5000);

    // The blocking HTTP client must not be created on a runtime thread
    let soil_service =
        tokio::task::spawn_blocking(|| SoilServiceBuilder::from_env().build()).await??;

    tracing::info!(
        soil_table = soil_service.soil_table().is_some(),
        model = soil_service.has_model(),
        port = port,
        "Starting soiltex service"
    );

    let state = Arc::new(AppState { soil_service });

    let app = app(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
