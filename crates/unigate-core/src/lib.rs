//! Session and connection management for UniFi-style network controllers.
//!
//! Builds on `unigate-api`'s wire client with the stateful pieces a
//! long-running gateway needs: an idempotent, retrying
//! [`ConnectionManager`] that owns login and controller-type detection,
//! transparent single-shot re-login on session expiry, a TTL'd
//! [`cache::ResponseCache`], best-effort request
//! [`diagnostics`], and the read-only [`SystemApi`] facade.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod session;
pub mod system;

pub use cache::{CacheKey, ResponseCache};
pub use config::{ConnectionConfig, TlsVerification};
pub use diagnostics::{ApiCallRecord, DiagnosticsSink, Outcome, TracingSink};
pub use error::CoreError;
pub use session::ConnectionManager;
pub use system::SystemApi;
