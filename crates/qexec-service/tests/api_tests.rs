//! Integration tests for the execution service HTTP API.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{StatusCode, header};
use axum::routing::get;
use axum_test::TestServer;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qexec_service::{Config, ServiceContext, rest};
use serde_json::{Value, json};

// ============================================================================
// Test helpers
// ============================================================================

const PREFIX: &str = "/braket-service/api/v1.0";

const BELL_IR: &str = r#"{"instructions":[{"type":"h","target":0},{"type":"cnot","control":0,"target":1}]}"#;

const PARAM_IR: &str = r#"{"instructions":[{"type":"rx","target":0,"angle":"theta"},{"type":"h","target":1}]}"#;

fn test_config() -> Config {
    let mut config = Config::default();
    config.execution.workers = 2;
    config.execution.poll_interval_ms = 5;
    config.execution.max_poll_attempts = 2000;
    config.download.timeout_seconds = 5;
    config
}

async fn test_server() -> TestServer {
    let ctx = ServiceContext::build(test_config())
        .await
        .expect("service context");
    TestServer::new(rest::router(Arc::new(ctx))).expect("test server")
}

/// Submit and return the result location.
async fn submit(server: &TestServer, body: Value) -> String {
    let response = server.post(&format!("{PREFIX}/execute")).json(&body).await;
    response.assert_status(StatusCode::ACCEPTED);
    let body: Value = response.json();
    body["Location"].as_str().expect("location").to_string()
}

/// Poll a result until it completes.
async fn wait_for_result(server: &TestServer, location: &str) -> Value {
    for _ in 0..1000 {
        let body: Value = server.get(location).await.json();
        if body["complete"] == true {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("result at {location} never completed");
}

/// Serve `app` over plain HTTP on a random local port.
async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// Serve `body` at `/circuit.json` and return its URL.
async fn serve_file(body: &'static str) -> String {
    let app = axum::Router::new().route("/circuit.json", get(move || async move { body }));
    format!("{}/circuit.json", serve(app).await)
}

/// URL that answers every request with `status`.
async fn serve_status(status: StatusCode) -> String {
    let app = axum::Router::new().route("/circuit.json", get(move || async move { status }));
    format!("{}/circuit.json", serve(app).await)
}

fn counts_total(result: &Value) -> u64 {
    result
        .as_object()
        .expect("histogram")
        .values()
        .map(|v| v.as_u64().expect("count"))
        .sum()
}

// ============================================================================
// Execute
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_returns_location() {
    let server = test_server().await;
    let response = server
        .post(&format!("{PREFIX}/execute"))
        .json(&json!({ "qpu-name": "local-simulator", "braket-ir": BELL_IR, "shots": 10 }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);

    let body: Value = response.json();
    let location = body["Location"].as_str().unwrap();
    assert!(location.starts_with("/braket-service/api/v1.0/results/"));
    assert_eq!(response.header(header::LOCATION), location);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_local_simulator_job_completes() {
    let server = test_server().await;
    let location = submit(
        &server,
        json!({ "qpu-name": "local-simulator", "braket-ir": BELL_IR, "shots": 100 }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(body["backend"], "local-simulator");
    assert_eq!(body["shots"], 100);
    assert_eq!(counts_total(&body["result"]), 100);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_impl_data_is_base64() {
    let server = test_server().await;
    let location = submit(
        &server,
        json!({
            "qpu-name": "local-simulator",
            "impl-language": "braket-ir",
            "impl-data": STANDARD.encode(BELL_IR),
            "shots": 20
        }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(counts_total(&body["result"]), 20);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_impl_url_is_downloaded() {
    let server = test_server().await;
    let url = serve_file(BELL_IR).await;
    let location = submit(
        &server,
        json!({
            "qpu-name": "local-simulator",
            "impl-language": "Braket-IR",
            "impl-url": url,
            "shots": 30
        }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(counts_total(&body["result"]), 30);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_input_params_are_bound() {
    let server = test_server().await;
    let location = submit(
        &server,
        json!({
            "qpu-name": "local-simulator",
            "braket-ir": PARAM_IR,
            "shots": 40,
            "input-params": {
                "theta": { "rawValue": "1.5", "type": "Float" },
                "token": { "rawValue": "ignored-by-simulator", "type": "Unknown" }
            }
        }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(counts_total(&body["result"]), 40);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_incomplete_result_has_no_payload() {
    let server = test_server().await;
    let location = submit(
        &server,
        json!({ "qpu-name": "local-simulator", "braket-ir": BELL_IR, "shots": 5 }),
    )
    .await;

    let body: Value = server.get(&location).await.json();
    if body["complete"] == false {
        assert!(body.get("result").is_none());
        assert!(body.get("backend").is_none());
        assert!(body.get("shots").is_none());
    }
}

// ============================================================================
// Failed jobs
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_qpu_fails_job() {
    let server = test_server().await;
    let location = submit(
        &server,
        json!({ "qpu-name": "no-such-qpu", "braket-ir": BELL_IR, "shots": 10 }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(body["result"]["error"], "qpu-name wrong or error with aws");
    assert_eq!(body["backend"], "no-such-qpu");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_ir_fails_job() {
    let server = test_server().await;
    let location = submit(
        &server,
        json!({ "qpu-name": "local-simulator", "braket-ir": "{\"instructions\": [", "shots": 10 }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(
        body["result"]["error"],
        "URL not found or Error during restoration of braket circuit."
    );
    assert_eq!(body["result"]["cause"], "MalformedIR");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restricted_host_without_token_fails_job() {
    let server = test_server().await;
    let location = submit(
        &server,
        json!({
            "qpu-name": "local-simulator",
            "impl-language": "braket-ir",
            "impl-url": "https://platform.planqk.de/files/circuit.json",
            "shots": 10
        }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(body["result"]["cause"], "AuthError");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_download_fails_with_auth_error() {
    let server = test_server().await;
    let url = serve_status(StatusCode::UNAUTHORIZED).await;
    let location = submit(
        &server,
        json!({
            "qpu-name": "local-simulator",
            "impl-language": "braket-ir",
            "impl-url": url,
            "shots": 10
        }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(body["result"]["cause"], "AuthError");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_download_fails_with_download_error() {
    let server = test_server().await;
    let url = serve_status(StatusCode::NOT_FOUND).await;
    let location = submit(
        &server,
        json!({
            "qpu-name": "local-simulator",
            "impl-language": "braket-ir",
            "impl-url": url,
            "shots": 10
        }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(body["result"]["cause"], "DownloadError");
    assert_eq!(
        body["result"]["error"],
        "URL not found or Error during restoration of braket circuit."
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unbound_parameter_fails_job() {
    let server = test_server().await;
    let location = submit(
        &server,
        json!({ "qpu-name": "local-simulator", "braket-ir": PARAM_IR, "shots": 10 }),
    )
    .await;

    let body = wait_for_result(&server, &location).await;
    assert_eq!(body["result"]["cause"], "BindingError");
}

// ============================================================================
// Request validation
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_qpu_name_is_rejected() {
    let server = test_server().await;
    let response = server
        .post(&format!("{PREFIX}/execute"))
        .json(&json!({ "braket-ir": BELL_IR }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], 400);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_zero_shots_is_rejected() {
    let server = test_server().await;
    let response = server
        .post(&format!("{PREFIX}/execute"))
        .json(&json!({ "qpu-name": "local-simulator", "braket-ir": BELL_IR, "shots": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_body_is_rejected() {
    let server = test_server().await;
    let response = server
        .post(&format!("{PREFIX}/execute"))
        .json(&json!({ "qpu-name": "local-simulator", "shots": "many" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_result_is_404() {
    let server = test_server().await;
    let response = server.get(&format!("{PREFIX}/results/does-not-exist")).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert_eq!(body["code"], 404);
}

// ============================================================================
// Transpile
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_transpile_reports_metrics() {
    let server = test_server().await;
    let response = server
        .post(&format!("{PREFIX}/transpile"))
        .json(&json!({ "braket-ir": BELL_IR }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["depth"], 2);
    assert_eq!(body["width"], 2);
    assert_eq!(body["multi-qubit-gate-depth"], -1);
    assert_eq!(body["total-number-of-operations"], 2);
    assert_eq!(body["number-of-single-qubit-gates"], 1);
    assert_eq!(body["number-of-multi-qubit-gates"], 1);
    assert_eq!(body["number-of-measurement-operations"], 0);

    let ir = body["transpiled-braket-ir"].as_str().unwrap();
    let program: Value = serde_json::from_str(ir).unwrap();
    assert_eq!(program["instructions"].as_array().unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transpile_failure_is_reported_in_body() {
    let server = test_server().await;
    let response = server
        .post(&format!("{PREFIX}/transpile"))
        .json(&json!({ "braket-ir": "not json" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body, json!({ "error": "transpilation failed" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_transpile_rejects_huge_qubit_index() {
    let server = test_server().await;
    let response = tokio::time::timeout(
        Duration::from_secs(5),
        server
            .post(&format!("{PREFIX}/transpile"))
            .json(&json!({
                "braket-ir": r#"{"instructions":[{"type":"x","target":4294967295}]}"#
            })),
    )
    .await
    .expect("transpile answered in time");
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body, json!({ "error": "transpilation failed" }));
}

// ============================================================================
// Misc endpoints
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_version() {
    let server = test_server().await;
    let response = server.get(&format!("{PREFIX}/version")).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body, json!({ "version": "1.0" }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_calibration_matrix_is_not_supported() {
    let server = test_server().await;
    let response = server
        .post(&format!("{PREFIX}/calculate-calibration-matrix"))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
