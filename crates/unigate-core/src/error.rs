// ── Core error types ──
//
// User-facing errors from unigate-core. Consumers never see raw reqwest
// errors or JSON parse failures; the `From<unigate_api::Error>` impl
// translates wire-layer failures into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Controller is not connected")]
    ControllerDisconnected,

    #[error("Controller request timed out")]
    Timeout,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("Resource not found: {path}")]
    NotFound { path: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Configuration mistakes are fatal: the bounded retry loop must not
    /// spin on them.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from wire-layer errors ────────────────────────────────

impl From<unigate_api::Error> for CoreError {
    fn from(err: unigate_api::Error) -> Self {
        match err {
            unigate_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            unigate_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "session expired -- re-authentication required".into(),
            },
            unigate_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else if e.status().map(|s| s.as_u16()) == Some(404) {
                    CoreError::NotFound {
                        path: e.url().map(|u| u.path().to_owned()).unwrap_or_default(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            unigate_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid controller URL: {e}"),
            },
            unigate_api::Error::Tls(message) => CoreError::Config { message },
            unigate_api::Error::Api { message } => CoreError::Api {
                message,
                status: None,
            },
            unigate_api::Error::Status { status: 404, message: _ } => CoreError::NotFound {
                path: String::new(),
            },
            unigate_api::Error::Status { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            unigate_api::Error::Deserialization { message, .. } => CoreError::Api {
                message: format!("malformed controller response: {message}"),
                status: None,
            },
        }
    }
}
