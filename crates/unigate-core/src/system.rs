//! Read-only system facade: controller info, health, and site listing.
//!
//! Short-TTL caching keeps repeated status queries cheap without going
//! stale; sysinfo tolerates older controllers that only expose
//! `stat/status` by synthesizing a minimal info object from it.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};

use unigate_api::request::ApiRequest;

use crate::cache::CacheKey;
use crate::error::CoreError;
use crate::session::ConnectionManager;

const SYSINFO_TTL: Duration = Duration::from_secs(15);
const HEALTH_TTL: Duration = Duration::from_secs(10);
const SITES_TTL: Duration = Duration::from_secs(30);

/// System-level queries against the controller, backed by a
/// [`ConnectionManager`].
pub struct SystemApi<'a> {
    manager: &'a ConnectionManager,
}

impl<'a> SystemApi<'a> {
    pub fn new(manager: &'a ConnectionManager) -> Self {
        Self { manager }
    }

    /// Controller system information (`stat/sysinfo`), cached for 15s.
    ///
    /// Older firmware lacks the endpoint and UniFi OS consoles often
    /// answer it with an empty data array; in either case this falls
    /// back to `stat/status` and wraps it with connection metadata so
    /// callers always get something shaped like a sysinfo record.
    pub async fn get_sysinfo(&self) -> Result<Value, CoreError> {
        let key = CacheKey::new("sysinfo", &self.manager.site());
        if let Some(cached) = self.manager.get_cached(&key, Some(SYSINFO_TTL)) {
            debug!("sysinfo served from cache");
            return Ok(cached);
        }

        let request = ApiRequest::get("stat/sysinfo");
        let info = match self.manager.request(&request, false).await {
            Ok(data) => {
                let record = Self::first_record(data);
                if Self::is_empty_record(&record) {
                    warn!("stat/sysinfo returned no records, falling back to stat/status");
                    self.sysinfo_from_status().await?
                } else {
                    record
                }
            }
            Err(e) if e.is_not_found() => {
                warn!("stat/sysinfo unavailable, falling back to stat/status");
                self.sysinfo_from_status().await?
            }
            Err(e) => return Err(e),
        };

        self.manager
            .update_cache(key, info.clone(), Some(SYSINFO_TTL));
        Ok(info)
    }

    async fn sysinfo_from_status(&self) -> Result<Value, CoreError> {
        let status = self
            .manager
            .request(&ApiRequest::get("stat/status").controller_scoped(), true)
            .await?;
        let config = self.manager.config();
        Ok(json!({
            "status": status.get("meta").and_then(|m| m.get("rc")).cloned().unwrap_or(Value::Null),
            "controller_url": config.url.as_str(),
            "site": self.manager.site(),
            "controller_type": self.manager.controller_type().map(|c| c.to_string()),
            "source": "stat/status",
        }))
    }

    /// Per-subsystem health for the current site (`stat/health`), cached
    /// for 10s.
    pub async fn get_health(&self) -> Result<Value, CoreError> {
        let key = CacheKey::new("health", &self.manager.site());
        if let Some(cached) = self.manager.get_cached(&key, Some(HEALTH_TTL)) {
            debug!("health served from cache");
            return Ok(cached);
        }

        let data = self
            .manager
            .request(&ApiRequest::get("stat/health"), false)
            .await?;
        self.manager.update_cache(key, data.clone(), Some(HEALTH_TTL));
        Ok(data)
    }

    /// Sites visible to the authenticated account (`self/sites`).
    pub async fn list_sites(&self) -> Result<Value, CoreError> {
        let key = CacheKey::new("sites", &self.manager.site());
        if let Some(cached) = self.manager.get_cached(&key, Some(SITES_TTL)) {
            return Ok(cached);
        }

        let data = self
            .manager
            .request(&ApiRequest::get("self/sites").controller_scoped(), false)
            .await?;
        self.manager.update_cache(key, data.clone(), Some(SITES_TTL));
        Ok(data)
    }

    /// Re-target a different site by its short name, after checking it is
    /// one the account can actually see.
    pub async fn switch_site(&self, name: &str) -> Result<(), CoreError> {
        let sites = self.list_sites().await?;
        let known = sites.as_array().is_some_and(|arr| {
            arr.iter()
                .any(|s| s.get("name").and_then(Value::as_str) == Some(name))
        });
        if !known {
            return Err(CoreError::NotFound {
                path: format!("site '{name}'"),
            });
        }
        self.manager.set_site(name);
        Ok(())
    }

    /// Sysinfo arrives as a single-element data array; unwrap it.
    fn first_record(data: Value) -> Value {
        match data {
            Value::Array(mut arr) if !arr.is_empty() => arr.remove(0),
            other => other,
        }
    }

    fn is_empty_record(record: &Value) -> bool {
        match record {
            Value::Null => true,
            Value::Array(arr) => arr.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}
