#![allow(clippy::unwrap_used)]
// Session lifecycle tests against a mock controller.

use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use unigate_api::{ControllerType, ControllerTypeOverride, DetectorConfig};
use unigate_core::cache::CacheKey;
use unigate_core::config::{ConnectionConfig, TlsVerification};
use unigate_core::session::ConnectionManager;
use unigate_api::request::ApiRequest;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> ConnectionConfig {
    ConnectionConfig {
        url: Url::parse(&server.uri()).unwrap(),
        username: "admin".into(),
        password: SecretString::from("secret"),
        site: "default".into(),
        tls: TlsVerification::SystemDefaults,
        timeout: Duration::from_secs(5),
        cache_ttl: Duration::from_secs(30),
        max_retries: 3,
        retry_delay: Duration::from_millis(10),
        controller_type: ControllerTypeOverride::ForceDirect,
        detector: DetectorConfig {
            probe_timeout: Duration::from_millis(500),
            max_rounds: 1,
            initial_backoff: Duration::from_millis(5),
        },
    }
}

fn ok_envelope(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "meta": { "rc": "ok" },
        "data": data,
    }))
}

async fn mount_direct_login(server: &MockServer, expected_logins: u64) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ok_envelope(json!([])))
        .expect(expected_logins)
        .mount(server)
        .await;
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let server = MockServer::start().await;
    mount_direct_login(&server, 1).await;

    let manager = ConnectionManager::new(test_config(&server));
    manager.initialize().await.unwrap();
    manager.initialize().await.unwrap();

    assert!(manager.is_connected());
    assert_eq!(manager.controller_type(), Some(ControllerType::Direct));
}

#[tokio::test]
async fn concurrent_connects_share_one_login() {
    let server = MockServer::start().await;
    mount_direct_login(&server, 1).await;

    let manager = std::sync::Arc::new(ConnectionManager::new(test_config(&server)));
    let (a, b) = tokio::join!(
        {
            let m = std::sync::Arc::clone(&manager);
            async move { m.ensure_connected().await }
        },
        {
            let m = std::sync::Arc::clone(&manager);
            async move { m.ensure_connected().await }
        },
    );
    a.unwrap();
    b.unwrap();
    assert!(manager.is_connected());
}

#[tokio::test]
async fn login_failure_retries_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let manager = ConnectionManager::new(test_config(&server));
    let err = manager.initialize().await.unwrap_err();
    assert!(!manager.is_connected(), "failed init must not leave a session: {err}");
}

#[tokio::test]
async fn invalid_tls_config_fails_without_retry() {
    let server = MockServer::start().await;
    // No login mock mounted: a config error must never reach the network.
    let mut config = test_config(&server);
    config.tls = TlsVerification::CustomCa("/nonexistent/ca.pem".into());

    let manager = ConnectionManager::new(config);
    let err = manager.initialize().await.unwrap_err();
    assert!(err.is_config(), "expected config error, got: {err}");
}

#[tokio::test]
async fn expired_session_relogs_in_and_retries_once() {
    let server = MockServer::start().await;
    mount_direct_login(&server, 2).await;

    // First call hits an expired session, the retry after re-login succeeds.
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sysinfo"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sysinfo"))
        .respond_with(ok_envelope(json!([{ "version": "9.0.108" }])))
        .expect(1)
        .mount(&server)
        .await;

    let manager = ConnectionManager::new(test_config(&server));
    manager.initialize().await.unwrap();

    let data = manager
        .request(&ApiRequest::get("stat/sysinfo"), false)
        .await
        .unwrap();
    assert_eq!(data, json!([{ "version": "9.0.108" }]));
}

#[tokio::test]
async fn persistent_session_rejection_surfaces_after_one_retry() {
    let server = MockServer::start().await;
    // Initial login plus exactly one re-login; no third attempt.
    mount_direct_login(&server, 2).await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sysinfo"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let manager = ConnectionManager::new(test_config(&server));
    manager.initialize().await.unwrap();

    let err = manager
        .request(&ApiRequest::get("stat/sysinfo"), false)
        .await
        .unwrap_err();
    assert!(!err.is_config(), "unexpected error class: {err}");
}

#[tokio::test]
async fn auto_mode_detects_direct_controller() {
    let server = MockServer::start().await;
    // Proxied login endpoint does not exist, so login goes direct.
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_direct_login(&server, 1).await;
    // Detection probes: only the direct family answers with an envelope.
    Mock::given(method("GET"))
        .and(path("/api/self/sites"))
        .respond_with(ok_envelope(json!([{ "name": "default" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy/network/api/self/sites"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.controller_type = ControllerTypeOverride::Auto;

    let manager = ConnectionManager::new(config);
    manager.initialize().await.unwrap();
    assert_eq!(manager.controller_type(), Some(ControllerType::Direct));
}

#[tokio::test]
async fn request_without_session_reconnects_on_demand() {
    let server = MockServer::start().await;
    mount_direct_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/health"))
        .respond_with(ok_envelope(json!([{ "subsystem": "wlan", "status": "ok" }])))
        .expect(1)
        .mount(&server)
        .await;

    let manager = ConnectionManager::new(test_config(&server));
    // No explicit initialize: request must bring the session up itself.
    let data = manager
        .request(&ApiRequest::get("stat/health"), false)
        .await
        .unwrap();
    assert_eq!(data[0]["subsystem"], "wlan");
}

#[tokio::test]
async fn cleanup_is_idempotent_and_drops_state() {
    let server = MockServer::start().await;
    mount_direct_login(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let manager = ConnectionManager::new(test_config(&server));
    manager.initialize().await.unwrap();
    let key = CacheKey::new("sites", "default");
    manager.update_cache(key.clone(), json!([1, 2]), None);

    manager.cleanup().await;
    assert!(!manager.is_connected());
    assert!(manager.get_cached(&key, None).is_none());

    // Second cleanup with no session is a no-op.
    manager.cleanup().await;
}

#[tokio::test]
async fn set_site_redirects_requests_and_clears_cache() {
    let server = MockServer::start().await;
    mount_direct_login(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/s/branch/stat/health"))
        .respond_with(ok_envelope(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let manager = ConnectionManager::new(test_config(&server));
    manager.initialize().await.unwrap();

    let key = CacheKey::new("health", "default");
    manager.update_cache(key.clone(), json!([{ "status": "ok" }]), None);

    manager.set_site("branch");
    assert_eq!(manager.site(), "branch");
    assert!(manager.get_cached(&key, None).is_none());

    manager
        .request(&ApiRequest::get("stat/health"), false)
        .await
        .unwrap();
}
