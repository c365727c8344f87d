//! End-to-end tests of the HTTP routes over the real provider wiring.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{Value, json};
use tower::ServiceExt;
use tracklane_server::{ServerConfig, bootstrap, router};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(config: &ServerConfig) -> Router {
    let state = bootstrap::state(config, &Client::new()).expect("state");
    router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn known_number_is_served_from_mock_dataset() {
    let (status, body) = send(
        app(&ServerConfig::default()),
        post("/api/tracking", r#"{ "trackingNumber": "maeu1234567" }"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "mock");
    assert_eq!(body["isLiveData"], false);
    assert_eq!(body["data"]["shipmentNumber"], "MAEU1234567");
}

#[tokio::test]
async fn nothing_configured_lists_all_providers() {
    let mut config = ServerConfig::default();
    config.providers.mock.enabled = false;

    let (status, body) = send(
        app(&config),
        post("/api/tracking", r#"{ "trackingNumber": "UNKNOWN000" }"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["source"], "Multi-Provider");
    assert_eq!(body["isLiveData"], false);
    assert_eq!(
        body["fallbackOptions"],
        json!(["mock", "maersk", "shipsgo", "trackingmore"])
    );
}

#[tokio::test]
async fn unknown_number_reports_attempts_and_skipped() {
    let (status, body) = send(
        app(&ServerConfig::default()),
        post("/api/tracking", r#"{ "trackingNumber": "UNKNOWN000" }"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "All tracking providers failed: mock: Tracking number not found in mock dataset"
    );
    assert_eq!(body["attempts"][0]["source"], "mock");
    assert_eq!(
        body["fallbackOptions"],
        json!(["maersk", "shipsgo", "trackingmore"])
    );
}

#[tokio::test]
async fn falls_back_to_live_carrier() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/synergy/tracking/MSKU9070323"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "containers": [{ "container_num": "MSKU9070323", "status": "IN-PROGRESS" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ServerConfig::default();
    config.providers.maersk.consumer_key = Some("key".to_owned());
    config.providers.maersk.base_url = Some(server.uri());

    let (status, body) = send(
        app(&config),
        post("/api/tracking", r#"{ "trackingNumber": "MSKU9070323" }"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "maersk");
    assert_eq!(body["isLiveData"], true);
    assert!(body["scrapedAt"].is_string(), "live results are stamped");
}

#[tokio::test]
async fn invalid_queries_are_bad_requests() {
    let blank = send(
        app(&ServerConfig::default()),
        post("/api/tracking", r#"{ "trackingNumber": "  " }"#),
    )
    .await;
    let malformed = send(app(&ServerConfig::default()), post("/api/tracking", "{ nope")).await;
    let missing = send(app(&ServerConfig::default()), post("/api/tracking", "{}")).await;

    for (status, body) in [blank, malformed, missing] {
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_query");
        assert!(body["error"]["message"].is_string(), "message present");
    }
}

#[tokio::test]
async fn status_reports_configured_providers() {
    let (status, body) = send(app(&ServerConfig::default()), get("/api/tracking/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalProviders"], 4);
    assert_eq!(body["availableProviders"], 1);
    assert_eq!(body["providers"][0]["name"], "mock");
    assert_eq!(body["providers"][0]["available"], true);
    assert_eq!(body["providers"][1]["missing"], json!(["consumer_key"]));
}

#[tokio::test]
async fn batch_settles_each_shipment() {
    let (status, body) = send(
        app(&ServerConfig::default()),
        post(
            "/api/tracking/batch",
            r#"{ "shipments": [
                { "trackingNumber": "MAEU1234567" },
                { "trackingNumber": "UNKNOWN000" },
                { "trackingNumber": "bad number!" }
            ] }"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["succeeded"], 1);
    assert_eq!(body["failed"], 2);
    assert_eq!(body["outcomes"][0]["result"]["source"], "mock");
    assert_eq!(body["outcomes"][1]["result"]["success"], false);
    assert!(body["outcomes"][2]["error"].is_string(), "invalid entries settle with an error");
}

#[tokio::test]
async fn batch_size_is_bounded() {
    let mut config = ServerConfig::default();
    config.tracking.max_batch_size = 2;

    let (empty_status, empty) = send(app(&config), post("/api/tracking/batch", r#"{ "shipments": [] }"#)).await;
    let (large_status, large) = send(
        app(&config),
        post(
            "/api/tracking/batch",
            r#"{ "shipments": [{ "trackingNumber": "A1" }, { "trackingNumber": "A2" }, { "trackingNumber": "A3" }] }"#,
        ),
    )
    .await;

    assert_eq!(empty_status, StatusCode::BAD_REQUEST);
    assert_eq!(empty["error"]["code"], "invalid_query");
    assert_eq!(large_status, StatusCode::BAD_REQUEST);
    assert_eq!(large["error"]["message"], "batch of 3 exceeds the limit of 2");
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(app(&ServerConfig::default()), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
