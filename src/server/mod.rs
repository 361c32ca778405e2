//! HTTP interface for emotion prediction.
//!
//! ## Routes
//!
//! - `POST /predict` - multipart form with a `file` field; answers
//!   `{"prediction": "<label>"}` or `{"error": "<message>"}`.
//!   `?scores=true` adds the class index and raw scores.
//! - `GET /health` - model lifecycle state
//!
//! Decoding and inference run on tokio's blocking pool so one slow
//! prediction never stalls the accept loop.

mod handlers;
mod types;

pub use handlers::status_for;
pub use types::{ErrorResponse, HealthResponse, PredictQuery, PredictResponse};

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::pipeline::EmotionPipeline;

/// Shared state for the HTTP server
#[derive(Clone)]
pub struct ServerState {
    pub pipeline: Arc<EmotionPipeline>,
    pub request_timeout: Duration,
}

/// Build the router
pub fn router(state: ServerState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict_handler))
        .route("/health", get(handlers::health_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(middleware::map_response(handlers::json_error_bodies))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serve until Ctrl+C
pub async fn start_server(config: &Config, pipeline: Arc<EmotionPipeline>) -> Result<()> {
    if config.eager_load {
        let preload = pipeline.clone();
        let result = tokio::task::spawn_blocking(move || preload.preload())
            .await
            .context("Model preload task failed")?;
        if let Err(e) = result {
            // Keep serving: requests will report the load failure
            error!("Model preload failed: {}", e);
        }
    }

    let state = ServerState {
        pipeline,
        request_timeout: config.request_timeout(),
    };
    let app = router(state, config.max_upload_bytes);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Emotion server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, shutting down...");
        })
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ModelState;
    use crate::test_support::{bias_only_model, sine_wav_bytes};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::path::PathBuf;
    use tower::ServiceExt;

    const BOUNDARY: &str = "emotion-test-boundary";

    fn multipart_body(field: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"clip.wav\"\r\n",
                field
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn predict_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header("content-length", body.len())
            .body(Body::from(body))
            .unwrap()
    }

    fn app_for(model_path: PathBuf) -> (Router, Arc<EmotionPipeline>) {
        let pipeline = Arc::new(EmotionPipeline::from_config(&Config::default(), model_path));
        let state = ServerState {
            pipeline: pipeline.clone(),
            request_timeout: Duration::from_secs(30),
        };
        (router(state, 1024 * 1024), pipeline)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_predict_success() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(bias_only_model(dir.path(), 4));

        let wav = sine_wav_bytes(440.0, 16000, 0.5, 1);
        let response = app
            .oneshot(predict_request("/predict", multipart_body("file", &wav)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body, serde_json::json!({ "prediction": "angry" }));
    }

    #[tokio::test]
    async fn test_predict_with_scores() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(bias_only_model(dir.path(), 1));

        let wav = sine_wav_bytes(440.0, 16000, 0.25, 1);
        let response = app
            .oneshot(predict_request("/predict?scores=true", multipart_body("file", &wav)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["prediction"], "calm");
        assert_eq!(body["class_index"], 1);
        assert_eq!(body["scores"].as_array().map(|s| s.len()), Some(8));
        let confidence = body["confidence"].as_f64().unwrap();
        assert_eq!(body["scores"][1].as_f64(), Some(confidence));
    }

    #[tokio::test]
    async fn test_predict_missing_file_field() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(bias_only_model(dir.path(), 0));

        let response = app
            .oneshot(predict_request("/predict", multipart_body("document", b"abc")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body, serde_json::json!({ "error": "No audio file provided" }));
    }

    #[tokio::test]
    async fn test_predict_undecodable_audio() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(bias_only_model(dir.path(), 0));

        let response = app
            .oneshot(predict_request("/predict", multipart_body("file", b"not audio at all")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Failed to decode audio"));
    }

    #[tokio::test]
    async fn test_predict_missing_model() {
        let (app, pipeline) = app_for(PathBuf::from("/nonexistent/emotion.onnx"));

        let wav = sine_wav_bytes(440.0, 16000, 0.1, 1);
        let response = app
            .oneshot(predict_request("/predict", multipart_body("file", &wav)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(pipeline.model_state(), ModelState::Failed);
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Arc::new(EmotionPipeline::from_config(
            &Config::default(),
            bias_only_model(dir.path(), 0),
        ));
        let state = ServerState {
            pipeline,
            request_timeout: Duration::from_secs(30),
        };
        let app = router(state, 1024);

        let wav = sine_wav_bytes(440.0, 16000, 1.0, 1);
        let response = app
            .oneshot(predict_request("/predict", multipart_body("file", &wav)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_predict_non_multipart_body() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(bias_only_model(dir.path(), 0));

        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"file": "clip.wav"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body, serde_json::json!({ "error": "No audio file provided" }));
    }

    #[tokio::test]
    async fn test_predict_empty_post() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(bias_only_model(dir.path(), 0));

        let request = Request::post("/predict").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body, serde_json::json!({ "error": "No audio file provided" }));
    }

    #[tokio::test]
    async fn test_predict_invalid_query() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(bias_only_model(dir.path(), 0));

        let wav = sine_wav_bytes(440.0, 16000, 0.1, 1);
        let response = app
            .oneshot(predict_request("/predict?scores=yes", multipart_body("file", &wav)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("query string"));
    }

    #[tokio::test]
    async fn test_wrong_method_answers_json() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = app_for(bias_only_model(dir.path(), 0));

        let response = app
            .oneshot(Request::get("/predict").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = json_body(response).await;
        assert_eq!(body, serde_json::json!({ "error": "Method Not Allowed" }));
    }

    #[tokio::test]
    async fn test_health_reports_model_state() {
        let dir = tempfile::tempdir().unwrap();
        let (app, pipeline) = app_for(bias_only_model(dir.path(), 0));

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["model_state"], "unloaded");

        pipeline.preload().unwrap();

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["model_state"], "ready");
    }

    #[test]
    fn test_status_mapping() {
        use crate::error::EmotionError;
        assert_eq!(
            status_for(&EmotionError::DecodeError("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&EmotionError::EmptySignalError), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&EmotionError::InferenceError("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&EmotionError::ModelLoadError("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
