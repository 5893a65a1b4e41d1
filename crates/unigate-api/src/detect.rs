// Controller-type detection.
//
// The proxied and direct deployments serve the same API under different
// path prefixes, and guessing wrong fails every subsequent request. The
// detector settles the question empirically: probe a known-stable read
// endpoint (`self/sites`) under both prefixes and apply a fixed decision
// table, retrying inconclusive rounds with exponential backoff.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::client::ApiClient;
use crate::error::Error;
use crate::platform::ControllerType;
use crate::request::ApiRequest;

/// Outcome of a detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Proxied,
    Direct,
    /// Every probe round failed. The caller falls back to the transport's
    /// default path family or requires an operator override.
    Inconclusive,
}

impl Detection {
    /// The detected controller type, if the run was conclusive.
    pub fn controller_type(&self) -> Option<ControllerType> {
        match self {
            Self::Proxied => Some(ControllerType::Proxied),
            Self::Direct => Some(ControllerType::Direct),
            Self::Inconclusive => None,
        }
    }
}

/// Tuning for the detector. Defaults match production behavior; tests
/// shrink the timeout and backoff to run at millisecond scale.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Per-probe timeout.
    pub probe_timeout: Duration,
    /// Probe rounds before giving up.
    pub max_rounds: u32,
    /// Backoff before the second round; doubles each subsequent round.
    pub initial_backoff: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            max_rounds: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Determine the controller type by probing `self/sites` under both
/// path families.
///
/// Decision table per round:
/// - proxied succeeds, direct fails  → `Proxied`
/// - direct succeeds, proxied fails  → `Direct`
/// - both succeed                    → `Direct` (canonical, lower overhead)
/// - both fail                       → retry with backoff, then `Inconclusive`
///
/// Probe-level failures (timeout, refused connection, malformed JSON) count
/// as that probe failing; they never abort the round. Runs over the client's
/// authenticated session, so call it after login succeeds.
pub async fn detect_controller_type(client: &ApiClient, config: &DetectorConfig) -> Detection {
    let request = ApiRequest::get("self/sites").controller_scoped();
    let site = client.site();

    for round in 0..config.max_rounds {
        let proxied_url = request.url(client.base_url(), &site, ControllerType::Proxied);
        let direct_url = request.url(client.base_url(), &site, ControllerType::Direct);

        let (proxied_ok, direct_ok) = match (proxied_url, direct_url) {
            (Ok(p), Ok(d)) => tokio::join!(
                probe(client.http(), p, config.probe_timeout),
                probe(client.http(), d, config.probe_timeout),
            ),
            // Base URL can't form one of the candidates; nothing a retry fixes.
            _ => break,
        };

        debug!(round, proxied_ok, direct_ok, "detection probe round complete");

        match (proxied_ok, direct_ok) {
            (true, false) => return Detection::Proxied,
            (_, true) => return Detection::Direct,
            (false, false) => {
                if round + 1 < config.max_rounds {
                    let backoff = config.initial_backoff * 2u32.saturating_pow(round);
                    debug!(round, ?backoff, "both probes failed, backing off");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    warn!(
        rounds = config.max_rounds,
        "controller type detection inconclusive: neither the proxied nor the direct \
         API path answered with a valid site list. Check that the controller host is \
         reachable and the session is valid, or set an explicit controller-type \
         override (force-proxied / force-direct) in the connection configuration."
    );
    Detection::Inconclusive
}

/// Issue one probe. Success means HTTP 200 with a JSON object carrying a
/// top-level `data` envelope key.
async fn probe(http: &reqwest::Client, url: Url, timeout: Duration) -> bool {
    let fut = async {
        let resp = match http.get(url.clone()).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(%url, error = %e, "probe transport failure");
                return false;
            }
        };

        if resp.status() != reqwest::StatusCode::OK {
            debug!(%url, status = %resp.status(), "probe rejected");
            return false;
        }

        match resp.json::<Value>().await {
            Ok(body) => body.get("data").is_some(),
            Err(e) => {
                debug!(%url, error = %e, "probe body not valid JSON");
                false
            }
        }
    };

    match tokio::time::timeout(timeout, fut).await {
        Ok(ok) => ok,
        Err(_) => {
            debug!(%url, "probe timed out");
            false
        }
    }
}

/// Pick the login-endpoint flavor by probing the proxied login path.
///
/// Proxied deployments answer `/api/auth/login` with *something* (401/405);
/// direct controllers 404 it. This is a cheap pre-login heuristic so we know
/// which login endpoint to POST to — the full envelope-based detection runs
/// after login. Connection-level failure on the direct path is a hard error:
/// the host is unreachable either way.
pub async fn probe_login_flavor(http: &reqwest::Client, base_url: &Url) -> Result<ControllerType, Error> {
    let proxied_login = base_url
        .join(ControllerType::Proxied.login_path())
        .map_err(Error::InvalidUrl)?;

    debug!(%proxied_login, "probing proxied login endpoint");

    if let Ok(resp) = http.get(proxied_login).send().await {
        if resp.status() != reqwest::StatusCode::NOT_FOUND {
            debug!("login flavor: proxied");
            return Ok(ControllerType::Proxied);
        }
    }

    let direct_login = base_url
        .join(ControllerType::Direct.login_path())
        .map_err(Error::InvalidUrl)?;

    debug!(%direct_login, "probing direct login endpoint");

    match http.get(direct_login).send().await {
        Ok(_) => {
            debug!("login flavor: direct");
            Ok(ControllerType::Direct)
        }
        Err(e) => Err(Error::Transport(e)),
    }
}
