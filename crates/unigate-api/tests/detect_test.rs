#![allow(clippy::unwrap_used)]
// Detection decision-table tests against a wiremock controller.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unigate_api::{ApiClient, ControllerType, Detection, DetectorConfig, detect_controller_type};

const PROXIED_SITES: &str = "/proxy/network/api/self/sites";
const DIRECT_SITES: &str = "/api/self/sites";

fn sites_envelope() -> serde_json::Value {
    json!({
        "meta": { "rc": "ok" },
        "data": [{ "name": "default", "desc": "Default" }]
    })
}

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        base_url,
        "default".into(),
        ControllerType::Direct,
    );
    (server, client)
}

fn fast_config() -> DetectorConfig {
    DetectorConfig {
        probe_timeout: Duration::from_millis(500),
        max_rounds: 3,
        initial_backoff: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn proxied_only_detects_proxied_without_retry() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(PROXIED_SITES))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DIRECT_SITES))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let detection = detect_controller_type(&client, &fast_config()).await;
    assert_eq!(detection, Detection::Proxied);
    assert_eq!(detection.controller_type(), Some(ControllerType::Proxied));
}

#[tokio::test]
async fn direct_only_detects_direct() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(PROXIED_SITES))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DIRECT_SITES))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(&server)
        .await;

    let detection = detect_controller_type(&client, &fast_config()).await;
    assert_eq!(detection, Detection::Direct);
}

#[tokio::test]
async fn both_succeeding_prefers_direct() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(PROXIED_SITES))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DIRECT_SITES))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(&server)
        .await;

    let detection = detect_controller_type(&client, &fast_config()).await;
    assert_eq!(detection, Detection::Direct);
}

#[tokio::test]
async fn both_failing_exhausts_rounds_and_reports_inconclusive() {
    let (server, client) = setup().await;

    // Three rounds, one probe per family per round.
    Mock::given(method("GET"))
        .and(path(PROXIED_SITES))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DIRECT_SITES))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let detection = detect_controller_type(&client, &fast_config()).await;
    assert_eq!(detection, Detection::Inconclusive);
    assert_eq!(detection.controller_type(), None);
}

#[tokio::test]
async fn http_200_without_data_key_counts_as_probe_failure() {
    let (server, client) = setup().await;

    // A captive portal or reverse proxy can answer 200 with an unrelated body.
    Mock::given(method("GET"))
        .and(path(PROXIED_SITES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "login": true })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DIRECT_SITES))
        .respond_with(ResponseTemplate::new(200).set_body_json(sites_envelope()))
        .mount(&server)
        .await;

    let detection = detect_controller_type(&client, &fast_config()).await;
    assert_eq!(detection, Detection::Direct);
}

#[tokio::test]
async fn malformed_json_counts_as_probe_failure_not_fatal() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(PROXIED_SITES))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DIRECT_SITES))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let detection = detect_controller_type(&client, &fast_config()).await;
    assert_eq!(detection, Detection::Inconclusive);
}
