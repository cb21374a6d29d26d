//! HTTP Server & Routing Integration Tests
//!
//! Exercises the router with stub model collaborators and an in-memory score store.

mod helpers;

use audix_common::config::ModelsConfig;
use audix_common::events::EventBus;
use audix_ml::db::SqliteScoreStore;
use audix_ml::workflow::Ingestor;
use audix_ml::{build_router, AppState, ServiceParts};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::audio_generator::{silent_wav, tone_wav};
use helpers::stubs::{ScriptedClassifier, StubSeparator};
use helpers::TEST_SAMPLE_RATE;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "audix-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, Vec<u8>),
}

fn multipart_request(uri: &str, parts: Vec<Part<'_>>) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value)
                        .as_bytes(),
                );
            }
            Part::File(name, filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn test_app(separator: StubSeparator, classifier: ScriptedClassifier) -> Router {
    let state = AppState::new(ServiceParts {
        separator: Arc::new(separator),
        classifier: Arc::new(classifier),
        scores: SqliteScoreStore::in_memory().await.unwrap(),
        event_bus: EventBus::new(64),
        ingestor: Ingestor::new(TEST_SAMPLE_RATE),
        batch_concurrency: 2,
        models: ModelsConfig::default(),
    });
    build_router(state)
}

async fn healthy_app() -> Router {
    test_app(StubSeparator::all(), ScriptedClassifier::uniform(0.1, false)).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn wav() -> Vec<u8> {
    tone_wav(TEST_SAMPLE_RATE, 1.0, 0.5)
}

#[tokio::test]
async fn test_health_reports_module_and_store() {
    let app = healthy_app().await;

    let (status, json) = send(&app, get("/server/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "audix-ml");
    assert_eq!(json["score_store"], "ok");
    assert_eq!(json["separator"]["name"], "stub-separator");
    assert_eq!(json["classifier"]["name"], "scripted-classifier");
}

#[tokio::test]
async fn test_root_and_info_list_routes() {
    let app = healthy_app().await;

    for uri in ["/", "/server/info"] {
        let (status, json) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["service"], "audix-ml");
        let routes = json["routes"].as_array().unwrap();
        assert!(routes.iter().any(|r| r["path"] == "/developer/device/analyze"));
    }
}

#[tokio::test]
async fn test_parts_lists_canonical_components() {
    let app = healthy_app().await;

    let (status, json) = send(&app, get("/developer/parts")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 5);
    assert_eq!(
        json["parts"],
        serde_json::json!(["fan", "pump", "slider", "gearbox", "bearing"])
    );
}

#[tokio::test]
async fn test_analyze_then_lookup_score() {
    let app = healthy_app().await;

    let request = multipart_request(
        "/developer/device/analyze",
        vec![
            Part::File("file", "machine.wav", wav()),
            Part::Text("device_id", "42"),
            Part::Text("target_parts", "fan, pump"),
        ],
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["status"], "success");
    assert_eq!(json["pipeline_info"]["original_filename"], "machine.wav");
    assert_eq!(json["pipeline_info"]["target_parts"], serde_json::json!(["fan", "pump"]));
    assert_eq!(json["analysis_results"]["total_parts"], 2);
    assert_eq!(json["analysis_results"]["anomaly_count"], 0);
    let score = json["analysis_results"]["normalScore"].as_f64().unwrap();
    assert!((score - 0.9).abs() < 1e-9);
    assert_eq!(json["side_effects"]["score_store"]["status"], "applied");
    assert_eq!(json["side_effects"]["alert"]["status"], "skipped");

    let (status, json) = send(&app, get("/developer/device/42/score")).await;
    assert_eq!(status, StatusCode::OK);
    assert!((json["normalScore"].as_f64().unwrap() - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_analyze_rejects_non_wav_upload() {
    let app = healthy_app().await;

    let request = multipart_request(
        "/developer/device/analyze",
        vec![
            Part::File("file", "machine.mp3", b"ID3 not wav".to_vec()),
            Part::Text("device_id", "1"),
        ],
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INPUT_FORMAT");
}

#[tokio::test]
async fn test_analyze_rejects_unknown_part() {
    let app = healthy_app().await;

    let request = multipart_request(
        "/developer/device/analyze",
        vec![
            Part::File("file", "machine.wav", wav()),
            Part::Text("device_id", "1"),
            Part::Text("target_parts", "fan,valve"),
        ],
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "INVALID_COMPONENTS");
    assert!(json["error"]["message"].as_str().unwrap().contains("valve"));
}

#[tokio::test]
async fn test_analyze_requires_integer_device_id() {
    let app = healthy_app().await;

    let missing = multipart_request(
        "/developer/device/analyze",
        vec![Part::File("file", "machine.wav", wav())],
    );
    let (status, _) = send(&app, missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let not_numeric = multipart_request(
        "/developer/device/analyze",
        vec![
            Part::File("file", "machine.wav", wav()),
            Part::Text("device_id", "pump-room"),
        ],
    );
    let (status, json) = send(&app, not_numeric).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_pipeline_failure_is_tagged_with_stage() {
    let app = test_app(StubSeparator::failing(), ScriptedClassifier::uniform(0.1, false)).await;

    let request = multipart_request(
        "/developer/device/analyze",
        vec![
            Part::File("file", "machine.wav", wav()),
            Part::Text("device_id", "5"),
        ],
    );
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "PIPELINE_FAILED");
    assert_eq!(json["error"]["stage"], "separation");

    let (_, health) = send(&app, get("/server/health")).await;
    assert!(health["last_error"].as_str().unwrap().contains("separation"));

    let (status, _) = send(&app, get("/developer/device/5/score")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_over_cap_rejected() {
    let app = healthy_app().await;

    let mut parts: Vec<Part> = (0..11).map(|_| Part::File("files", "r.wav", wav())).collect();
    parts.push(Part::Text("device_id", "9"));
    let (status, json) = send(&app, multipart_request("/developer/batch/analyze", parts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BATCH_TOO_LARGE");
}

#[tokio::test]
async fn test_batch_reports_each_file_in_order() {
    let app = healthy_app().await;

    let parts = vec![
        Part::Text("device_id", "9"),
        Part::File("files", "first.wav", wav()),
        Part::File("files", "second.flac", b"fLaC".to_vec()),
        Part::File("files", "third.wav", wav()),
    ];
    let (status, json) = send(&app, multipart_request("/developer/batch/analyze", parts)).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["total_files"], 3);
    assert_eq!(json["successful"], 2);
    assert_eq!(json["failed"], 1);

    let results = json["results"].as_array().unwrap();
    assert_eq!(results[0]["status"], "success");
    assert_eq!(results[0]["analysis_results"]["device_id"], "9_file_1");
    assert_eq!(results[1]["status"], "error");
    assert_eq!(results[1]["stage"], "input");
    assert_eq!(results[1]["device_id"], "9_file_2");
    assert_eq!(results[2]["filename"], "third.wav");

    let (status, _) = send(&app, get("/developer/device/9_file_3/score")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_batch_pipeline_failure_sets_last_error() {
    let app = test_app(
        StubSeparator::all().failing_on_silence(),
        ScriptedClassifier::uniform(0.1, false),
    )
    .await;

    let parts = vec![
        Part::Text("device_id", "7"),
        Part::File("files", "running.wav", wav()),
        Part::File("files", "idle.wav", silent_wav(TEST_SAMPLE_RATE, 0.5)),
    ];
    let (status, json) = send(&app, multipart_request("/developer/batch/analyze", parts)).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["results"][1]["stage"], "separation");

    let (_, health) = send(&app, get("/server/health")).await;
    let last_error = health["last_error"].as_str().unwrap();
    assert!(last_error.contains("separation"), "{}", last_error);
    assert!(last_error.contains("7_file_2"), "{}", last_error);
}

#[tokio::test]
async fn test_unknown_device_score_is_404() {
    let app = healthy_app().await;

    let (status, json) = send(&app, get("/developer/device/12345/score")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_event_streams_are_server_sent_events() {
    let app = healthy_app().await;

    for uri in ["/events", "/events/alerts"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/event-stream"), "{}: {}", uri, content_type);
    }
}
