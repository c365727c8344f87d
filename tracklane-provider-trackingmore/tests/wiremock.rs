//! TrackingMore adapter against a mocked API.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracklane_core::model::TrackingQuery;
use tracklane_core::ports::{PortError, TrackingPort};
use tracklane_provider_trackingmore::{TrackingMorePort, TrackingMoreSettings};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> TrackingMoreSettings {
    TrackingMoreSettings {
        api_key: Some("tm-key".to_owned()),
        base_url: server.uri(),
        timeout: Duration::from_millis(500),
    }
}

#[tokio::test]
async fn successful_lookup_forwards_courier_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/trackings/get"))
        .and(query_param("tracking_numbers", "176-12345675"))
        .and(query_param("courier_code", "lufthansa-cargo"))
        .and(header("Tracking-Api-Key", "tm-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "code": 200, "message": "Request response is successful" },
            "data": [{
                "tracking_number": "176-12345675",
                "courier_code": "lufthansa-cargo",
                "delivery_status": "transit",
                "origin_info": {
                    "trackinfo": [{
                        "checkpoint_date": "2024-03-05T09:30:00+01:00",
                        "tracking_detail": "Loaded on flight",
                        "location": "Frankfurt"
                    }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let port = TrackingMorePort::new(Client::new(), settings(&server));
    let query = TrackingQuery::new("176-12345675").with_carrier_hint("Lufthansa-Cargo");
    let result = port.attempt(&query).await.expect("configured");

    assert!(result.is_success(), "got {result:?}");
    assert_eq!(result.source(), "trackingmore");
    let data = result.data().expect("data");
    assert_eq!(data.status, "In Transit");
    assert_eq!(data.last_location, "Frankfurt");
    assert_eq!(data.container_type, None);
    let value = serde_json::to_value(&result).expect("serialize");
    assert!(
        value["data"].get("containerType").is_none(),
        "containerType must be omitted, got {value}"
    );
}

#[tokio::test]
async fn empty_data_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "code": 200, "message": "Request response is successful" },
            "data": []
        })))
        .mount(&server)
        .await;

    let port = TrackingMorePort::new(Client::new(), settings(&server));
    let result = port
        .attempt(&TrackingQuery::new("UNKNOWN000"))
        .await
        .expect("configured");

    assert_eq!(result.error(), Some("Tracking number not found"));
}

#[tokio::test]
async fn error_meta_becomes_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "code": 4101, "message": "Tracking No. already exists." }
        })))
        .mount(&server)
        .await;

    let port = TrackingMorePort::new(Client::new(), settings(&server));
    let result = port
        .attempt(&TrackingQuery::new("1Z999AA10123456784"))
        .await
        .expect("configured");

    assert_eq!(
        result.error(),
        Some("Provider error: Tracking No. already exists. (4101)")
    );
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "meta": { "code": 200 }, "data": [] }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let port = TrackingMorePort::new(Client::new(), settings(&server));
    let result = port
        .attempt(&TrackingQuery::new("1Z999AA10123456784"))
        .await
        .expect("configured");

    assert_eq!(result.error(), Some("Request timed out after 500 ms"));
}

#[tokio::test]
async fn blank_api_key_is_a_configuration_error() {
    let port = TrackingMorePort::new(
        Client::new(),
        TrackingMoreSettings {
            api_key: Some("   ".to_owned()),
            ..TrackingMoreSettings::default()
        },
    );

    assert_eq!(port.status().missing, ["api_key"]);
    let err = port
        .attempt(&TrackingQuery::new("1Z999AA10123456784"))
        .await
        .expect_err("unconfigured");
    assert!(matches!(err, PortError::MissingConfiguration(_)), "got {err}");
}
