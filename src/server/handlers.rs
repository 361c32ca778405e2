//! Route handlers.

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, warn};

use super::types::{ErrorResponse, HealthResponse, PredictQuery, PredictResponse};
use super::ServerState;
use crate::classifier::ModelState;
use crate::error::EmotionError;

/// Multipart field carrying the audio file
const FILE_FIELD: &str = "file";

const NO_AUDIO_FILE: &str = "No audio file provided";

/// Largest plain-text error body rewritten by [`json_error_bodies`]
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// HTTP status for a pipeline error
pub fn status_for(err: &EmotionError) -> StatusCode {
    match err {
        EmotionError::DecodeError(_) | EmotionError::EmptySignalError => StatusCode::BAD_REQUEST,
        EmotionError::InferenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EmotionError::ModelLoadError(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// `POST /predict`
pub async fn predict_handler(
    State(state): State<ServerState>,
    query: Result<Query<PredictQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };

    // A body that is not a multipart form carries no file
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("Rejected upload: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, NO_AUDIO_FILE);
        }
    };

    let audio = match read_file_field(&mut multipart).await {
        Ok(Some(audio)) => audio,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, NO_AUDIO_FILE),
        Err((status, message)) => return error_response(status, message),
    };

    debug!("Prediction request: {} bytes", audio.len());

    let pipeline = state.pipeline.clone();
    let task = tokio::task::spawn_blocking(move || pipeline.predict_detailed(&audio));

    match tokio::time::timeout(state.request_timeout, task).await {
        Ok(Ok(Ok(prediction))) => {
            let body = PredictResponse::from_prediction(prediction, query.scores);
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Ok(Err(e))) => {
            if e.is_client_error() {
                debug!("Rejected upload: {}", e);
            } else {
                error!("Prediction failed: {}", e);
            }
            error_response(status_for(&e), e.to_string())
        }
        Ok(Err(join_error)) => {
            error!("Prediction task failed: {}", join_error);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Prediction task failed")
        }
        Err(_) => {
            warn!(
                "Prediction timed out after {} ms",
                state.request_timeout.as_millis()
            );
            error_response(StatusCode::GATEWAY_TIMEOUT, "Prediction timed out")
        }
    }
}

/// Pull the `file` field out of the form, skipping any other fields
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<Bytes>, (StatusCode, String)> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err((e.status(), e.body_text())),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        if let Some(file_name) = field.file_name() {
            debug!("Upload file name: {}", file_name);
        }

        return field
            .bytes()
            .await
            .map(Some)
            .map_err(|e| (e.status(), e.body_text()));
    }
}

/// Rewrite plain-text error responses from layers (body limit, CORS,
/// method mismatch) into the `{"error": ...}` shape
pub async fn json_error_bodies(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
        return response;
    }

    let message = match axum::body::to_bytes(response.into_body(), MAX_ERROR_BODY_BYTES).await {
        Ok(body) if !body.is_empty() => String::from_utf8_lossy(&body).trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    error_response(status, message)
}

/// `GET /health`
pub async fn health_handler(State(state): State<ServerState>) -> Json<HealthResponse> {
    let model_state = state.pipeline.model_state();
    Json(HealthResponse {
        healthy: model_state != ModelState::Failed,
        model_state,
        model_path: state.pipeline.model_path().display().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
