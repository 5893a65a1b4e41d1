// API request value type and URL mapping.
//
// An `ApiRequest` is immutable once built; the controller type is threaded
// in explicitly when the URL is constructed, so no shared transport flag
// needs to be swapped around a call.

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::Error;
use crate::platform::ControllerType;

/// Which generation of the management API an endpoint belongs to.
///
/// Legacy (v1) endpoints wrap responses in the `{meta, data}` envelope;
/// v2 endpoints return bare JSON bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiVersion {
    #[default]
    V1,
    V2,
}

/// A single outbound API call.
///
/// `path` is relative to the site root (e.g. `stat/sysinfo`) unless the
/// request is marked controller-scoped (e.g. `self/sites`), which skips
/// the `s/{site}` segment.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub version: ApiVersion,
    controller_scoped: bool,
}

impl ApiRequest {
    /// A site-scoped GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
            version: ApiVersion::V1,
            controller_scoped: false,
        }
    }

    /// A site-scoped POST request with a JSON body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
            version: ApiVersion::V1,
            controller_scoped: false,
        }
    }

    /// A site-scoped PUT request with a JSON body.
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(body),
            version: ApiVersion::V1,
            controller_scoped: false,
        }
    }

    /// A site-scoped DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: None,
            version: ApiVersion::V1,
            controller_scoped: false,
        }
    }

    /// Mark this request controller-scoped: the URL skips the `s/{site}`
    /// segment (`self/sites`, `stat/admin`, ...).
    pub fn controller_scoped(mut self) -> Self {
        self.controller_scoped = true;
        self
    }

    /// Use the v2 API path family for this request.
    pub fn v2(mut self) -> Self {
        self.version = ApiVersion::V2;
        self
    }

    /// Build the full URL for this request against a controller of the
    /// given type.
    ///
    /// Path families:
    /// - v1 site-scoped:       `{base}{prefix}/api/s/{site}/{path}`
    /// - v1 controller-scoped: `{base}{prefix}/api/{path}`
    /// - v2:                   `{base}{prefix}/v2/api/site/{site}/{path}`
    ///
    /// where `{prefix}` is `/proxy/network` for proxied controllers and
    /// empty for direct ones.
    pub fn url(&self, base: &Url, site: &str, controller: ControllerType) -> Result<Url, Error> {
        let prefix = controller.path_prefix();
        let path = self.path.trim_start_matches('/');
        let full = match self.version {
            ApiVersion::V1 if self.controller_scoped => format!("{prefix}/api/{path}"),
            ApiVersion::V1 => format!("{prefix}/api/s/{site}/{path}"),
            ApiVersion::V2 => format!("{prefix}/v2/api/site/{site}/{path}"),
        };
        base.join(&full).map_err(Error::InvalidUrl)
    }
}

// ── Response envelope ───────────────────────────────────────────────

/// Standard legacy response envelope.
///
/// Every v1 endpoint wraps its payload:
/// ```json
/// { "meta": { "rc": "ok", "msg": "optional" }, "data": [...] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub meta: Meta,
    #[serde(default)]
    pub data: Value,
}

/// Metadata from the envelope. `rc == "ok"` means success.
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub rc: String,
    #[serde(default)]
    pub msg: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://controller.example:8443").expect("static url")
    }

    #[test]
    fn v1_site_scoped_url_direct() {
        let req = ApiRequest::get("stat/sysinfo");
        let url = req.url(&base(), "default", ControllerType::Direct).expect("url");
        assert_eq!(url.as_str(), "https://controller.example:8443/api/s/default/stat/sysinfo");
    }

    #[test]
    fn v1_site_scoped_url_proxied() {
        let req = ApiRequest::get("stat/sysinfo");
        let url = req.url(&base(), "branch", ControllerType::Proxied).expect("url");
        assert_eq!(
            url.as_str(),
            "https://controller.example:8443/proxy/network/api/s/branch/stat/sysinfo"
        );
    }

    #[test]
    fn v1_controller_scoped_skips_site_segment() {
        let req = ApiRequest::get("self/sites").controller_scoped();
        let url = req.url(&base(), "default", ControllerType::Direct).expect("url");
        assert_eq!(url.as_str(), "https://controller.example:8443/api/self/sites");
    }

    #[test]
    fn v2_url_uses_site_path_family() {
        let req = ApiRequest::get("trafficrules").v2();
        let url = req.url(&base(), "default", ControllerType::Proxied).expect("url");
        assert_eq!(
            url.as_str(),
            "https://controller.example:8443/proxy/network/v2/api/site/default/trafficrules"
        );
    }

    #[test]
    fn leading_slash_in_path_is_tolerated() {
        let req = ApiRequest::get("/stat/health");
        let url = req.url(&base(), "default", ControllerType::Direct).expect("url");
        assert_eq!(url.as_str(), "https://controller.example:8443/api/s/default/stat/health");
    }
}
