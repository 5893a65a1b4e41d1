// ── Request diagnostics ──
//
// Structured per-request records for operators debugging controller
// behavior. Recording is strictly best-effort: a sink must never block
// or fail the request path, so the trait is infallible by contract and
// the executor calls it after the outcome is already decided.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

/// One request attempt as seen by the executor.
#[derive(Debug, Clone)]
pub struct ApiCallRecord {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    /// Request payload with credential-bearing fields redacted.
    pub payload: Option<Value>,
    /// Response body on success, error text on failure.
    pub outcome: Outcome,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Value),
    Failure(String),
}

impl ApiCallRecord {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Receives one record per request attempt (including the retried attempt
/// after a re-login). Implementations must not panic.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, record: ApiCallRecord);
}

/// Default sink: structured `tracing` events.
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, record: ApiCallRecord) {
        match &record.outcome {
            Outcome::Success(_) => info!(
                target: "unigate::diagnostics",
                method = %record.method,
                path = %record.path,
                duration_ms = record.duration.as_millis() as u64,
                success = true,
                "api request"
            ),
            Outcome::Failure(error) => info!(
                target: "unigate::diagnostics",
                method = %record.method,
                path = %record.path,
                duration_ms = record.duration.as_millis() as u64,
                success = false,
                %error,
                "api request"
            ),
        }
    }
}

/// Field-name fragments that mark a value as secret.
const SENSITIVE_FRAGMENTS: [&str; 4] = ["password", "secret", "token", "key"];

/// Deep-copy a payload with credential-bearing fields replaced by
/// `"<redacted>"`. Matching is case-insensitive on field-name fragments.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(k, v)| {
                    let lower = k.to_lowercase();
                    if SENSITIVE_FRAGMENTS.iter().any(|frag| lower.contains(frag)) {
                        (k.clone(), Value::String("<redacted>".into()))
                    } else {
                        (k.clone(), redact(v))
                    }
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}
