// Controller HTTP client.
//
// Wraps `reqwest::Client` with login/logout, CSRF handling, and a single
// `execute` entry point that maps an `ApiRequest` to a URL for an explicit
// controller type, sends it, and classifies the outcome. The session cookie
// lives in the client's jar; rebuilding the client drops the session.

use std::sync::RwLock;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::platform::ControllerType;
use crate::request::{ApiRequest, ApiVersion, Envelope};
use crate::transport::TransportConfig;

/// Envelope `meta.msg` value the controller uses to signal a dead session.
const LOGIN_REQUIRED_MSG: &str = "api.err.LoginRequired";

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    site: RwLock<String>,
    /// Variant whose login endpoint this client authenticates against.
    /// Also the URL-family fallback when detection is inconclusive.
    login_flavor: ControllerType,
    /// CSRF token captured from the login response; required for mutating
    /// requests through the proxied deployment.
    csrf_token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// A cookie jar is created automatically if the config doesn't carry
    /// one (session auth requires cookies).
    pub fn new(
        base_url: Url,
        site: String,
        login_flavor: ControllerType,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            site: RwLock::new(site),
            login_flavor,
            csrf_token: RwLock::new(None),
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (tests).
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        site: String,
        login_flavor: ControllerType,
    ) -> Self {
        Self {
            http,
            base_url,
            site: RwLock::new(site),
            login_flavor,
            csrf_token: RwLock::new(None),
        }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client (used by the detector for probes).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The current site identifier.
    pub fn site(&self) -> String {
        self.site.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Re-target this client at a different site.
    pub fn set_site(&self, site: String) {
        if let Ok(mut guard) = self.site.write() {
            *guard = site;
        }
    }

    /// The variant used for the login endpoint and as URL-family fallback.
    pub fn login_flavor(&self) -> ControllerType {
        self.login_flavor
    }

    // ── Authentication ──────────────────────────────────────────────

    /// Authenticate with username/password.
    ///
    /// On success the session cookie is stored in the client's jar and a
    /// CSRF token (if issued) is captured for mutating requests.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self
            .base_url
            .join(self.login_flavor.login_path())
            .map_err(Error::InvalidUrl)?;

        debug!(%url, "logging in");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        if let Some(token) = resp
            .headers()
            .get("X-CSRF-Token")
            .or_else(|| resp.headers().get("x-csrf-token"))
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut guard) = self.csrf_token.write() {
                *guard = Some(token.to_owned());
            }
        }

        debug!("login successful");
        Ok(())
    }

    /// End the current session. Transport errors are surfaced; the caller
    /// decides whether logout failure matters (cleanup treats it as
    /// best-effort).
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self
            .base_url
            .join(self.login_flavor.logout_path())
            .map_err(Error::InvalidUrl)?;

        debug!(%url, "logging out");

        let _resp = self
            .http
            .post(url)
            .send()
            .await
            .map_err(Error::Transport)?;

        Ok(())
    }

    // ── Request execution ───────────────────────────────────────────

    /// Execute a single API request against a controller of the given type.
    ///
    /// Returns the raw response body: the full `{meta, data}` envelope for
    /// v1 requests, the bare JSON body for v2. A dead session surfaces as
    /// [`Error::SessionExpired`] so the caller can re-login and retry.
    pub async fn execute(
        &self,
        request: &ApiRequest,
        controller: ControllerType,
    ) -> Result<Value, Error> {
        let url = request.url(&self.base_url, &self.site(), controller)?;
        debug!(method = %request.method, %url, "executing API request");

        let mut builder = self.http.request(request.method.clone(), url);

        if request.method != Method::GET {
            let token = self
                .csrf_token
                .read()
                .ok()
                .and_then(|guard| guard.clone());
            if let Some(token) = token {
                builder = builder.header("X-CSRF-Token", token);
            }
        }

        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        match request.version {
            ApiVersion::V1 => {
                // Error statuses often carry an envelope with a msg; fall
                // back to the HTTP status when the body isn't one.
                match Self::parse_envelope(&body) {
                    Err(Error::Deserialization { .. }) if !status.is_success() => {
                        Err(Error::Status {
                            status: status.as_u16(),
                            message: body.chars().take(512).collect(),
                        })
                    }
                    other => other,
                }
            }
            ApiVersion::V2 => Self::parse_bare(status, &body),
        }
    }

    /// Parse a v1 `{meta, data}` envelope, returning the whole envelope
    /// as JSON on success.
    fn parse_envelope(body: &str) -> Result<Value, Error> {
        let envelope: Envelope =
            serde_json::from_str(body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.to_owned(),
            })?;

        match envelope.meta.rc.as_str() {
            "ok" => serde_json::from_str(body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.to_owned(),
            }),
            _ => {
                let message = envelope
                    .meta
                    .msg
                    .unwrap_or_else(|| format!("rc={}", envelope.meta.rc));
                if message == LOGIN_REQUIRED_MSG {
                    Err(Error::SessionExpired)
                } else {
                    Err(Error::Api { message })
                }
            }
        }
    }

    /// Parse a v2 response: bare JSON on 2xx, status error otherwise.
    fn parse_bare(status: reqwest::StatusCode, body: &str) -> Result<Value, Error> {
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                message: body.chars().take(512).collect(),
            });
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_rc_error_maps_to_api_error() {
        let body = r#"{"meta":{"rc":"error","msg":"api.err.NoSiteContext"},"data":[]}"#;
        let err = ApiClient::parse_envelope(body).expect_err("rc=error must fail");
        assert!(matches!(err, Error::Api { ref message } if message == "api.err.NoSiteContext"));
    }

    #[test]
    fn envelope_login_required_maps_to_session_expired() {
        let body = r#"{"meta":{"rc":"error","msg":"api.err.LoginRequired"},"data":[]}"#;
        let err = ApiClient::parse_envelope(body).expect_err("must fail");
        assert!(err.is_auth_expired());
    }

    #[test]
    fn envelope_ok_returns_full_envelope() {
        let body = r#"{"meta":{"rc":"ok"},"data":[{"name":"default"}]}"#;
        let value = ApiClient::parse_envelope(body).expect("ok envelope");
        assert_eq!(value["meta"]["rc"], "ok");
        assert_eq!(value["data"][0]["name"], "default");
    }

    #[test]
    fn bare_parse_rejects_http_errors() {
        let err = ApiClient::parse_bare(reqwest::StatusCode::BAD_REQUEST, "nope")
            .expect_err("4xx must fail");
        assert!(matches!(err, Error::Status { status: 400, .. }));
    }
}
