//! Brain tumor classification endpoints

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Json, Multipart, State,
    },
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::error::{Error, Result};
use crate::server::state::ServerState;
use crate::vision::{ImageClassification, ImageModelInfo};

/// Multipart field carrying the uploaded image
const UPLOAD_FIELD: &str = "file";

/// Create the image classification router
///
/// `max_upload_bytes` replaces axum's 2 MiB default body limit; 0 disables it.
pub fn create_router(max_upload_bytes: usize) -> Router<ServerState> {
    let body_limit = if max_upload_bytes == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(max_upload_bytes)
    };

    Router::new()
        .route("/model-info", get(model_info))
        .route("/predict", post(classify))
        .layer(body_limit)
}

async fn model_info(State(state): State<ServerState>) -> Result<Json<ImageModelInfo>> {
    Ok(Json(state.vision.describe().await?))
}

async fn classify(
    State(state): State<ServerState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ImageClassification>> {
    let mut multipart = multipart.map_err(|e| Error::InvalidInput(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(upload_error)?;

        let result = state.vision.classify(content_type.as_deref(), bytes).await?;
        return Ok(Json(result));
    }

    Err(Error::InvalidInput(format!("Missing '{}' field", UPLOAD_FIELD)))
}

fn upload_error(err: MultipartError) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(err.body_text())
    } else {
        Error::InvalidInput(err.body_text())
    }
}
