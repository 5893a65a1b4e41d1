//! Wire-level client for UniFi-style network controller management APIs.
//!
//! This crate owns transport mechanics only: building TLS/cookie-aware
//! HTTP clients ([`transport`]), mapping [`ApiRequest`]s onto the two
//! controller path families ([`platform`], [`request`]), session
//! login/logout ([`ApiClient`]), and empirical controller-type detection
//! ([`detect`]). Session lifecycle, caching, and retry policy live in
//! `unigate-core`.

pub mod client;
pub mod detect;
pub mod error;
pub mod platform;
pub mod request;
pub mod transport;

pub use client::ApiClient;
pub use detect::{Detection, DetectorConfig, detect_controller_type, probe_login_flavor};
pub use error::Error;
pub use platform::{ControllerType, ControllerTypeOverride};
pub use request::{ApiRequest, ApiVersion, Envelope, Meta};
pub use transport::{TlsMode, TransportConfig};
