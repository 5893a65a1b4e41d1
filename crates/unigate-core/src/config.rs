// ── Runtime connection configuration ──
//
// Describes *how* to reach a controller: URL, credentials, TLS posture,
// and the retry/cache tuning knobs. Built by unigate-config (or directly
// by tests); core never reads config files.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use unigate_api::detect::DetectorConfig;
use unigate_api::platform::ControllerTypeOverride;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs). Default for local controllers.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for a single controller connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Controller base URL (e.g., `https://192.168.1.1:8443`).
    pub url: Url,
    /// Username for session auth.
    pub username: String,
    /// Password for session auth (never logged).
    pub password: SecretString,
    /// Site to operate on.
    pub site: String,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request transport timeout.
    pub timeout: Duration,
    /// Store-wide default TTL for cached responses.
    pub cache_ttl: Duration,
    /// Login attempts per `initialize()` call.
    pub max_retries: u32,
    /// Fixed delay between login attempts; does not grow across attempts.
    pub retry_delay: Duration,
    /// Operator controller-type override; `Auto` probes the live host.
    pub controller_type: ControllerTypeOverride,
    /// Controller-type detector tuning.
    pub detector: DetectorConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("https://192.168.1.1").expect("static default URL"),
            username: "admin".into(),
            password: SecretString::from(String::new()),
            site: "default".into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            controller_type: ControllerTypeOverride::Auto,
            detector: DetectorConfig::default(),
        }
    }
}
