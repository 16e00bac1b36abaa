//! Diabetes risk endpoints under `/api`

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::{Error, ErrorBody, Result};
use crate::risk::RiskLevel;
use crate::server::state::ServerState;
use crate::storage::{PredictionRecord, RECENT_LIMIT};
use crate::tabular::TabularRequest;

/// Create the tabular prediction router
pub fn create_router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/predictions", get(recent_predictions))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    onnx_model_loaded: bool,
    features: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    prediction: u8,
    probability: f64,
    risk_level: RiskLevel,
    accuracy: Option<f64>,
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        onnx_model_loaded: state.tabular.is_loaded(),
        features: state.tabular.descriptor().feature_names().to_vec(),
    })
}

async fn predict(
    State(state): State<ServerState>,
    payload: std::result::Result<Json<TabularRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(request) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    let service = state.tabular.clone();
    let inputs = request.features();
    let prediction = tokio::task::spawn_blocking(move || service.predict(&request)).await??;

    // the log write never affects the response
    let record = PredictionRecord::now(inputs, prediction.prediction, prediction.probability);
    let store = state.predictions.clone();
    tokio::spawn(async move {
        if let Err(e) = store.append(record).await {
            warn!("Failed to save prediction: {}", e);
        }
    });

    Ok(Json(PredictResponse {
        prediction: prediction.prediction,
        probability: prediction.probability,
        risk_level: prediction.risk_level,
        accuracy: state.tabular.descriptor().accuracy(),
    }))
}

async fn recent_predictions(State(state): State<ServerState>) -> Response {
    match state.predictions.recent(RECENT_LIMIT).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            error!("Failed to fetch predictions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(format!("Failed to fetch predictions: {}", e))),
            )
                .into_response()
        }
    }
}
