// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// `POST /analyze` (also mounted under `/api/v1/analyze`) takes
// `{ticker, interval, period, weight}` and returns the analysis report.
// Every failure is turned into `{"error": "<message>"}` with a non-success
// status; unknown tickers are 404, everything else 500.
//
// CORS is permissive so the dashboard can be served from anywhere.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::analysis::{self, AnalysisParams, AnalysisReport};
use crate::app_state::AppState;
use crate::calibration::Calibration;
use crate::market_data::ProviderError;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/analyze", post(analyze))
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/calibration", get(get_calibration))
        .route("/api/v1/calibration/reload", post(reload_calibration))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

/// Error payload returned by every endpoint.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        let status = match &err {
            ProviderError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    calibration_multiplier: f64,
    analyses_served: u64,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        calibration_multiplier: state.calibration().multiplier,
        analyses_served: state.analyses_served(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Analyze
// =============================================================================

/// Omitted fields fall back to the configured defaults.
#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    ticker: String,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    weight: Option<f64>,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected analyze request");
        ApiError::from(rejection)
    })?;

    let config = &state.config;
    let params = AnalysisParams {
        ticker: req.ticker.trim().to_uppercase(),
        interval: req.interval.unwrap_or_else(|| config.default_interval.clone()),
        period: req.period.unwrap_or_else(|| config.default_period.clone()),
        weight: req.weight.unwrap_or(config.default_weight),
    };

    let multiplier = state.calibration().multiplier;

    let report = analysis::analyze(state.provider.as_ref(), config, multiplier, &params)
        .await
        .map_err(|e| {
            warn!(ticker = %params.ticker, error = %e, "analysis failed");
            ApiError::from(e)
        })?;

    state.record_analysis();
    Ok(Json(report))
}

// =============================================================================
// Calibration
// =============================================================================

async fn get_calibration(State(state): State<Arc<AppState>>) -> Json<Calibration> {
    Json(state.calibration())
}

async fn reload_calibration(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Calibration>, ApiError> {
    state.reload_calibration().map(Json).map_err(|e| {
        error!(error = %e, "calibration reload failed");
        ApiError::internal(format!("{e:#}"))
    })
}
