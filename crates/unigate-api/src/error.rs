use thiserror::Error;

/// Top-level error type for the `unigate-api` crate.
///
/// Covers every failure mode of the wire layer: authentication, transport,
/// envelope-level API errors, and malformed payloads. `unigate-core`
/// classifies these to decide between retry, re-login, and surfacing.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The controller rejected the session cookie mid-flight.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Error reported inside the `{meta: {rc, msg}}` envelope.
    #[error("API error: {message}")]
    Api { message: String },

    /// Non-success HTTP status outside the auth/envelope paths.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Returns `true` if this is a transient connectivity error worth
    /// retrying during session initialization.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Status { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Returns `true` for configuration mistakes that retrying cannot fix
    /// (bad URLs, unreadable certificates).
    pub fn is_config(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::Tls(_))
    }
}
