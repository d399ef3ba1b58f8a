//! HTTP request handlers for the soil service.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use soiltex::{Coordinates, HydraulicProperties, HydraulicsOutcome, SoilError, SoilSample};
use utoipa::{IntoParams, ToSchema};

use crate::locale::{labels, Lang};
use crate::AppState;

/// Depth used when the hydraulics query names none.
pub const DEFAULT_DEPTH: &str = "0-5cm";

fn default_depth() -> String {
    DEFAULT_DEPTH.to_string()
}

/// Query parameters for the texture endpoint.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TextureQuery {
    /// Longitude in decimal degrees (-180 to 180).
    pub longitude: f64,
    /// Latitude in decimal degrees (-90 to 90).
    pub latitude: f64,
}

/// Query parameters for the hydraulics endpoint.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HydraulicsQuery {
    /// Longitude in decimal degrees (-180 to 180).
    pub longitude: f64,
    /// Latitude in decimal degrees (-90 to 90).
    pub latitude: f64,
    /// Soil layer: 0-5cm, 5-15cm, 15-30cm or 30-60cm.
    #[serde(default = "default_depth")]
    pub depth: String,
    /// Label language, `en` or `zh`.
    #[serde(default)]
    pub lang: Lang,
}

/// Texture composition of one soil layer.
#[derive(Debug, Serialize, ToSchema)]
pub struct TextureLayer {
    /// Depth label, e.g. `0-5cm`.
    pub depth: String,
    pub clay_content: f64,
    pub sand_content: f64,
    pub silt_content: f64,
    /// Sum of the three raw contents.
    pub total: f64,
    pub clay_percent: f64,
    pub sand_percent: f64,
    pub silt_percent: f64,
    /// Unit of the raw contents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl From<SoilSample> for TextureLayer {
    fn from(s: SoilSample) -> Self {
        Self {
            depth: s.depth.to_string(),
            clay_content: s.clay_content,
            sand_content: s.sand_content,
            silt_content: s.silt_content,
            total: s.total,
            clay_percent: s.clay_percent,
            sand_percent: s.sand_percent,
            silt_percent: s.silt_percent,
            unit: s.unit,
        }
    }
}

/// Query location.
#[derive(Debug, Serialize, ToSchema)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

/// Texture percentages at the requested depth.
#[derive(Debug, Serialize, ToSchema)]
pub struct TextureComposition {
    pub clay_percent: f64,
    pub sand_percent: f64,
    pub silt_percent: f64,
}

/// Hydraulic properties, merged across models and per model.
#[derive(Debug, Serialize, ToSchema)]
pub struct HydraulicPropertiesView {
    /// Metrics from all models; later models override earlier ones.
    #[schema(value_type = Object)]
    pub merged: HydraulicProperties,
    /// Metrics extracted from each model's output.
    #[schema(value_type = Object)]
    pub per_model: BTreeMap<String, HydraulicProperties>,
    /// Values the model reported in structured form.
    #[schema(value_type = Object)]
    pub model_fields: BTreeMap<String, serde_json::Value>,
}

/// Hydraulics response.
///
/// When a step fails, `error` is set and only the fields computed before
/// the failure are present.
#[derive(Debug, Serialize, ToSchema)]
pub struct HydraulicsResponse {
    pub location: Location,
    pub depth: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<TextureComposition>,
    /// Matched soil class code, always 4 characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydraulic_properties: Option<HydraulicPropertiesView>,
    /// Display labels for the field names above.
    #[schema(value_type = Object)]
    pub labels: BTreeMap<&'static str, &'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HydraulicsResponse {
    fn from_outcome(outcome: HydraulicsOutcome, lang: Lang) -> Self {
        let (soil_code, soil_class) = match outcome.soil_match {
            Some(m) => (Some(m.normalized_code), m.name),
            None => (None, None),
        };

        Self {
            location: Location {
                longitude: outcome.location.longitude,
                latitude: outcome.location.latitude,
            },
            depth: outcome.depth,
            texture: outcome.texture.map(|s| TextureComposition {
                clay_percent: s.clay_percent,
                sand_percent: s.sand_percent,
                silt_percent: s.silt_percent,
            }),
            soil_code,
            soil_class,
            hydraulic_properties: outcome.report.map(|r| HydraulicPropertiesView {
                merged: r.merged,
                per_model: r.per_model,
                model_fields: outcome.model_fields,
            }),
            labels: labels(lang),
            error: outcome.error.map(|e| e.to_string()),
        }
    }
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Get soil texture per depth for given coordinates.
///
/// Depths without complete data are left out, so the list may be empty.
#[utoipa::path(
    get,
    path = "/api/soil-texture",
    params(TextureQuery),
    responses(
        (status = 200, description = "Texture per depth", body = Vec<TextureLayer>),
        (status = 400, description = "Invalid or missing coordinates", body = ErrorResponse),
        (status = 500, description = "Unexpected error", body = ErrorResponse)
    ),
    tag = "soil"
)]
#[axum::debug_handler]
pub async fn get_soil_texture(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TextureQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_error(rejection),
    };

    tracing::debug!(
        longitude = query.longitude,
        latitude = query.latitude,
        "Texture query"
    );

    let point = Coordinates::new(query.longitude, query.latitude);
    let result = tokio::task::spawn_blocking(move || state.soil_service.texture(point)).await;

    match result {
        Ok(Ok(samples)) => {
            tracing::info!(
                longitude = query.longitude,
                latitude = query.latitude,
                depths = samples.len(),
                "Texture found"
            );
            let layers: Vec<TextureLayer> = samples.into_iter().map(TextureLayer::from).collect();
            (StatusCode::OK, Json(layers)).into_response()
        }
        Ok(Err(e)) => error_response(query.longitude, query.latitude, e),
        Err(e) => internal_error(query.longitude, query.latitude, e),
    }
}

/// Get soil class and hydraulic properties at one depth.
///
/// Failures after coordinate validation are reported in the `error` field
/// of a 200 response, alongside whatever was already computed.
#[utoipa::path(
    get,
    path = "/api/soil-hydraulics",
    params(HydraulicsQuery),
    responses(
        (status = 200, description = "Hydraulics, possibly partial with an error", body = HydraulicsResponse),
        (status = 400, description = "Invalid or missing coordinates", body = ErrorResponse),
        (status = 500, description = "Unexpected error", body = ErrorResponse)
    ),
    tag = "soil"
)]
#[axum::debug_handler]
pub async fn get_soil_hydraulics(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HydraulicsQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return query_error(rejection),
    };

    tracing::debug!(
        longitude = query.longitude,
        latitude = query.latitude,
        depth = %query.depth,
        "Hydraulics query"
    );

    let point = Coordinates::new(query.longitude, query.latitude);
    let depth = query.depth.clone();
    let result =
        tokio::task::spawn_blocking(move || state.soil_service.hydraulics(point, &depth)).await;

    match result {
        Ok(Ok(outcome)) => {
            tracing::info!(
                longitude = query.longitude,
                latitude = query.latitude,
                depth = %query.depth,
                complete = outcome.is_complete(),
                "Hydraulics resolved"
            );
            let response = HydraulicsResponse::from_outcome(outcome, query.lang);
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Err(e)) => error_response(query.longitude, query.latitude, e),
        Err(e) => internal_error(query.longitude, query.latitude, e),
    }
}

/// Create an error response for soil queries.
fn error_response(longitude: f64, latitude: f64, e: SoilError) -> Response {
    let status = match &e {
        SoilError::InvalidCoordinates { .. } | SoilError::UnknownDepth { .. } => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    tracing::warn!(longitude = longitude, latitude = latitude, error = %e, "Soil query failed");

    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

/// Missing or unparsable query parameters.
fn query_error(rejection: QueryRejection) -> Response {
    tracing::warn!(error = %rejection, "Invalid query parameters");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: rejection.body_text(),
        }),
    )
        .into_response()
}

/// A blocking task panicked or was cancelled.
fn internal_error(longitude: f64, latitude: f64, e: tokio::task::JoinError) -> Response {
    tracing::error!(longitude = longitude, latitude = latitude, error = %e, "Soil query task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Query failed: {}", e),
        }),
    )
        .into_response()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
