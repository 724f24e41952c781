//! Integration tests for the Gemini client against an in-process mock service

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use drone_locate_inference::{GeminiClient, GeminiConfig, ImagePart, InferenceError, LocationModel};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Captured {
    path: String,
    api_key: Option<String>,
    body: serde_json::Value,
}

type Seen = Arc<Mutex<Vec<Captured>>>;

async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

fn client_for(base: &str, timeout: Duration) -> GeminiClient {
    let mut config = GeminiConfig::new("test-key");
    config.api_base = base.to_string();
    config.model = "gemini-test".to_string();
    config.timeout = timeout;
    GeminiClient::new(config).unwrap()
}

fn images() -> (ImagePart, ImagePart) {
    (
        ImagePart::new("image/jpeg", b"frame-bytes".to_vec()),
        ImagePart::new("image/png", b"satellite-bytes".to_vec()),
    )
}

async fn record_and_reply(
    State(seen): State<Seen>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    seen.lock().unwrap().push(Captured {
        path: uri.path().to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    Json(serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [{ "text": "Coordinates: 35%, 62% (river bend)\nConfidence: 8/10" }],
                "role": "model"
            },
            "finishReason": "STOP"
        }]
    }))
}

#[tokio::test]
async fn test_infer_sends_prompt_and_both_images() {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .fallback(record_and_reply)
        .with_state(seen.clone());
    let base = spawn_mock(router).await;

    let (frame, satellite) = images();
    let reply = client_for(&base, Duration::from_secs(5))
        .infer(&frame, &satellite)
        .await
        .unwrap();
    assert_eq!(reply, "Coordinates: 35%, 62% (river bend)\nConfidence: 8/10");

    let captured = seen.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    let request = &captured[0];
    assert_eq!(request.path, "/v1beta/models/gemini-test:generateContent");
    assert_eq!(request.api_key.as_deref(), Some("test-key"));

    let parts = request.body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert!(parts[0]["text"].as_str().unwrap().contains("satellite/aerial image"));
    assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
    assert_eq!(parts[1]["inline_data"]["data"], "ZnJhbWUtYnl0ZXM=");
    assert_eq!(parts[2]["inline_data"]["mime_type"], "image/png");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let router = Router::new().fallback(|| async {
        (StatusCode::TOO_MANY_REQUESTS, "quota exceeded")
    });
    let base = spawn_mock(router).await;

    let (frame, satellite) = images();
    let err = client_for(&base, Duration::from_secs(5))
        .infer(&frame, &satellite)
        .await
        .unwrap_err();

    match err {
        InferenceError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body, "quota exceeded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reply_without_text_is_malformed() {
    let router = Router::new().fallback(|| async {
        Json(serde_json::json!({ "candidates": [] }))
    });
    let base = spawn_mock(router).await;

    let (frame, satellite) = images();
    let err = client_for(&base, Duration::from_secs(5))
        .infer(&frame, &satellite)
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let router = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "too late"
    });
    let base = spawn_mock(router).await;

    let (frame, satellite) = images();
    let err = client_for(&base, Duration::from_millis(200))
        .infer(&frame, &satellite)
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_service_is_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (frame, satellite) = images();
    let err = client_for(&format!("http://{addr}"), Duration::from_secs(5))
        .infer(&frame, &satellite)
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::Connection(_)), "got {err:?}");
}
