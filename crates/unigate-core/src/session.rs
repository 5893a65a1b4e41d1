// ── Connection and session management ──
//
// Owns the authenticated session against the controller: login with
// bounded fixed-delay retries, controller-type detection, transparent
// re-login on session loss, and the per-connection response cache.
//
// Concurrency: `connect_lock` serializes login sequences so racing
// reconnects perform exactly one login; the request path reads session
// state through a std RwLock held only for copies, never across awaits.
// The controller type is passed explicitly into each call, so no shared
// transport flag is mutated around requests.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use unigate_api::detect::{Detection, detect_controller_type, probe_login_flavor};
use unigate_api::platform::ControllerType;
use unigate_api::request::ApiRequest;
use unigate_api::transport::{TlsMode, TransportConfig};
use unigate_api::{ApiClient, Error as ApiError};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::{ConnectionConfig, TlsVerification};
use crate::diagnostics::{ApiCallRecord, DiagnosticsSink, Outcome, redact};
use crate::error::CoreError;

/// Session state mutated only while holding `connect_lock` (writes) and
/// read as a snapshot by the request path.
#[derive(Default)]
struct SessionState {
    client: Option<Arc<ApiClient>>,
    authenticated: bool,
    /// Detection outcome, cached for the lifetime of the session.
    detection: Option<Detection>,
    /// Resolved path family for requests: override, else detection,
    /// else the login flavor (transport default).
    effective: Option<ControllerType>,
}

/// Manages the connection and session with the network controller.
pub struct ConnectionManager {
    config: ConnectionConfig,
    cache: ResponseCache,
    sink: Option<Arc<dyn DiagnosticsSink>>,
    state: RwLock<SessionState>,
    /// Current target site; follows `set_site` across reconnects.
    site: RwLock<String>,
    connect_lock: tokio::sync::Mutex<()>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        let cache = ResponseCache::new(config.cache_ttl);
        let site = config.site.clone();
        Self {
            config,
            cache,
            sink: None,
            state: RwLock::new(SessionState::default()),
            site: RwLock::new(site),
            connect_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Attach a diagnostics sink. Recording is best-effort and never
    /// affects request outcomes.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The current target site.
    pub fn site(&self) -> String {
        self.site.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// The resolved controller type, if the session is up and detection
    /// (or an override) settled it.
    pub fn controller_type(&self) -> Option<ControllerType> {
        self.state.read().ok().and_then(|s| s.effective)
    }

    /// The cached detection outcome for this session.
    pub fn detection(&self) -> Option<Detection> {
        self.state.read().ok().and_then(|s| s.detection)
    }

    /// True when an authenticated session is live.
    pub fn is_connected(&self) -> bool {
        self.state
            .read()
            .map(|s| s.authenticated && s.client.is_some())
            .unwrap_or(false)
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Establish the session.
    ///
    /// Idempotent: a live session returns immediately without a second
    /// login. Otherwise one login sequence runs under the connect lock
    /// (concurrent callers await it), with up to `max_retries` attempts
    /// separated by the fixed `retry_delay`. Configuration errors fail
    /// immediately without retry. A fresh session invalidates the whole
    /// cache.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        if self.is_connected() {
            return Ok(());
        }

        let _guard = self.connect_lock.lock().await;

        // A racing caller may have connected while we waited for the lock.
        if self.is_connected() {
            return Ok(());
        }

        info!(url = %self.config.url, "connecting to controller");

        let mut last_err = CoreError::ControllerDisconnected;
        for attempt in 1..=self.config.max_retries.max(1) {
            match self.try_connect().await {
                Ok(()) => {
                    self.cache.invalidate_all();
                    info!(
                        url = %self.config.url,
                        site = %self.site(),
                        "connected to controller"
                    );
                    return Ok(());
                }
                Err(e) if e.is_config() => {
                    error!(error = %e, "controller configuration invalid, not retrying");
                    self.clear_session();
                    return Err(e);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "connection attempt failed");
                    last_err = e;
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        error!(
            attempts = self.config.max_retries,
            error = %last_err,
            "failed to initialize controller connection"
        );
        self.clear_session();
        Err(last_err)
    }

    /// One connection attempt: tear down any stale transport, pick the
    /// login flavor (override or probe), login, then detect the controller
    /// type over the authenticated session.
    async fn try_connect(&self) -> Result<(), CoreError> {
        self.clear_session();

        let transport = self.build_transport();

        let login_flavor = match self.config.controller_type.forced() {
            Some(forced) => forced,
            None => {
                // Pre-login heuristic only; full detection runs after login.
                let probe_http = transport.build_client()?;
                probe_login_flavor(&probe_http, &self.config.url).await?
            }
        };
        debug!(%login_flavor, "using login flavor");

        let client = Arc::new(ApiClient::new(
            self.config.url.clone(),
            self.site(),
            login_flavor,
            &transport,
        )?);

        client
            .login(&self.config.username, &self.config.password)
            .await?;

        let (detection, effective) = match self.config.controller_type.forced() {
            Some(forced) => (None, forced),
            None => {
                let detection = detect_controller_type(&client, &self.config.detector).await;
                let effective = detection.controller_type().unwrap_or(login_flavor);
                (Some(detection), effective)
            }
        };
        debug!(?detection, %effective, "controller type resolved");

        if let Ok(mut state) = self.state.write() {
            state.client = Some(client);
            state.authenticated = true;
            state.detection = detection;
            state.effective = Some(effective);
        }
        Ok(())
    }

    /// Ensure an authenticated session exists, reconnecting if it was
    /// never established or has been marked lost.
    pub async fn ensure_connected(&self) -> Result<(), CoreError> {
        if self.is_connected() {
            return Ok(());
        }
        warn!("controller session missing or lost, reconnecting");
        self.initialize().await
    }

    /// Close the session and drop all state. Idempotent; logout failures
    /// are logged and ignored.
    pub async fn cleanup(&self) {
        let client = self.state.read().ok().and_then(|s| s.client.clone());
        if let Some(client) = client {
            if let Err(e) = client.logout().await {
                warn!(error = %e, "logout failed during cleanup");
            }
        }
        self.clear_session();
        self.cache.invalidate_all();
        info!("controller connection cleaned up");
    }

    fn clear_session(&self) {
        if let Ok(mut state) = self.state.write() {
            *state = SessionState::default();
        }
    }

    /// Mark the session lost so the next `ensure_connected` re-initializes.
    fn mark_session_lost(&self) {
        if let Ok(mut state) = self.state.write() {
            state.authenticated = false;
        }
    }

    fn build_transport(&self) -> TransportConfig {
        let tls = match &self.config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.config.timeout,
            cookie_jar: None,
        }
    }

    fn current_session(&self) -> Result<(Arc<ApiClient>, ControllerType), CoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| CoreError::Internal("session state poisoned".into()))?;
        match (&state.client, state.effective) {
            (Some(client), Some(effective)) if state.authenticated => {
                Ok((Arc::clone(client), effective))
            }
            _ => Err(CoreError::ControllerDisconnected),
        }
    }

    // ── Request execution ────────────────────────────────────────────

    /// Execute an API request against the controller.
    ///
    /// Requires a live session. On an "authentication required" signal the
    /// manager re-logs-in once and retries the call exactly once; any other
    /// failure surfaces immediately (domain-level fallbacks, such as trying
    /// an alternate legacy endpoint on 404, stay with the caller).
    ///
    /// Returns the full `{meta, data}` envelope when `return_raw` is set,
    /// otherwise just the `data` field.
    pub async fn request(&self, request: &ApiRequest, return_raw: bool) -> Result<Value, CoreError> {
        self.ensure_connected().await.map_err(|e| {
            warn!(error = %e, "request refused: controller not connected");
            CoreError::ControllerDisconnected
        })?;

        let (client, controller) = self.current_session()?;

        match self.execute_once(&client, request, controller).await {
            Ok(response) => Ok(Self::unwrap_response(response, return_raw)),
            Err(e) if e.is_auth_expired() => {
                warn!("session rejected during request, attempting re-login");
                self.mark_session_lost();
                self.initialize().await.map_err(|login_err| {
                    error!(error = %login_err, "re-login failed, cannot proceed with request");
                    CoreError::ControllerDisconnected
                })?;

                info!("re-login successful, retrying original request once");
                let (client, controller) = self.current_session()?;
                let response = self.execute_once(&client, request, controller).await?;
                Ok(Self::unwrap_response(response, return_raw))
            }
            Err(e) => {
                error!(
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "api request failed"
                );
                Err(e.into())
            }
        }
    }

    /// One attempt: execute, time, and record through the diagnostics sink.
    async fn execute_once(
        &self,
        client: &ApiClient,
        request: &ApiRequest,
        controller: ControllerType,
    ) -> Result<Value, ApiError> {
        let start = Instant::now();
        let result = client.execute(request, controller).await;
        self.record_diagnostics(request, &result, start.elapsed());
        result
    }

    fn record_diagnostics(
        &self,
        request: &ApiRequest,
        result: &Result<Value, ApiError>,
        duration: Duration,
    ) {
        let Some(ref sink) = self.sink else { return };

        let outcome = match result {
            Ok(value) => Outcome::Success(value.clone()),
            Err(e) => Outcome::Failure(e.to_string()),
        };
        sink.record(ApiCallRecord {
            timestamp: Utc::now(),
            method: request.method.to_string(),
            path: request.path.clone(),
            payload: request.body.as_ref().map(redact),
            outcome,
            duration,
        });
    }

    fn unwrap_response(response: Value, return_raw: bool) -> Value {
        if return_raw {
            response
        } else {
            response.get("data").cloned().unwrap_or(response)
        }
    }

    // ── Cache accessors ──────────────────────────────────────────────

    /// Fetch a cached response if fresher than the effective TTL.
    pub fn get_cached(&self, key: &CacheKey, ttl: Option<Duration>) -> Option<Value> {
        self.cache.get(key, ttl)
    }

    /// Store a response for later `get_cached` calls.
    pub fn update_cache(&self, key: CacheKey, value: Value, ttl: Option<Duration>) {
        self.cache.put(key, value, ttl);
    }

    /// Invalidate a resource family, or the whole store when `prefix`
    /// is `None`.
    pub fn invalidate_cache(&self, prefix: Option<&str>) {
        match prefix {
            Some(p) => self.cache.invalidate_prefix(p),
            None => self.cache.invalidate_all(),
        }
    }

    /// Direct access to the cache (tests and facades).
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    // ── Site selection ───────────────────────────────────────────────

    /// Switch the target site and invalidate all cached responses.
    pub fn set_site(&self, site: &str) {
        if let Ok(mut guard) = self.site.write() {
            site.clone_into(&mut guard);
        }
        let client = self.state.read().ok().and_then(|s| s.client.clone());
        if let Some(client) = client {
            client.set_site(site.to_owned());
        }
        self.cache.invalidate_all();
        info!(site, "switched target site, cache invalidated");
    }
}
