//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use unigate_config::ConfigError;
use unigate_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to controller at {url}")]
    #[diagnostic(
        code(unigate::connection_failed),
        help(
            "Check that the controller is running and accessible.\n\
             Reason: {reason}\n\
             Try: unigate status --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Controller connection was lost")]
    #[diagnostic(
        code(unigate::disconnected),
        help("The session could not be re-established. Check controller availability.")
    )]
    Disconnected,

    #[error("Request timed out")]
    #[diagnostic(
        code(unigate::timeout),
        help("Increase timeout with --timeout or check controller responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(unigate::auth_failed),
        help(
            "Verify the username and password for this profile.\n\
             Passwords resolve from UNIGATE_PASSWORD, the system keyring,\n\
             then the profile's plaintext field."
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(unigate::no_credentials),
        help("Set username/password in the profile or export UNIGATE_USERNAME / UNIGATE_PASSWORD.")
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Not found: {path}")]
    #[diagnostic(code(unigate::not_found))]
    NotFound { path: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Controller API error: {message}")]
    #[diagnostic(code(unigate::api_error))]
    ApiError { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(unigate::validation))]
    Validation { field: String, reason: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(unigate::profile_not_found),
        help("List profiles with: unigate config profiles")
    )]
    ProfileNotFound { name: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(unigate::config))]
    Config { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Disconnected => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::ControllerDisconnected => CliError::Disconnected,
            CoreError::Timeout => CliError::Timeout,
            CoreError::NotFound { path } => CliError::NotFound { path },
            CoreError::Api { message, .. } => CliError::ApiError { message },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound { name: profile },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
