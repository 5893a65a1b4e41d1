//! Configuration loading and credential resolution for unigate.
//!
//! TOML profiles merged with `UNIGATE_`-prefixed environment variables,
//! password resolution (env + keyring + plaintext), and translation to
//! `unigate_core::ConnectionConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use unigate_api::ControllerTypeOverride;
use unigate_core::{ConnectionConfig, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by explicit name or fall back to the default.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|p| (name, p))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

/// A named controller profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "https://192.168.1.1").
    pub controller: String,

    /// Site name.
    #[serde(default = "default_site")]
    pub site: String,

    /// Login username.
    pub username: Option<String>,

    /// Login password (plaintext — prefer keyring or `UNIGATE_PASSWORD`).
    pub password: Option<String>,

    /// Controller type: "auto", "proxied", or "direct".
    #[serde(default = "default_controller_type")]
    pub controller_type: String,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification (self-signed controllers).
    pub insecure: Option<bool>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    /// Default cache TTL in seconds.
    pub cache_ttl: Option<u64>,

    /// Login attempts before giving up.
    pub max_retries: Option<u32>,

    /// Fixed delay between login attempts, in seconds.
    pub retry_delay: Option<u64>,
}

fn default_site() -> String {
    "default".into()
}
fn default_controller_type() -> String {
    "auto".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "unigate", "unigate").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("unigate");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, still merging `UNIGATE_` env overrides.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UNIGATE_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the login password: env var, then keyring, then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Ok(pw) = std::env::var("UNIGATE_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    if let Ok(entry) = keyring::Entry::new("unigate", &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve the login username from the profile or `UNIGATE_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var("UNIGATE_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

// ── Translation to ConnectionConfig ─────────────────────────────────

fn parse_controller_type(raw: &str) -> Result<ControllerTypeOverride, ConfigError> {
    match raw {
        "auto" => Ok(ControllerTypeOverride::Auto),
        "proxied" => Ok(ControllerTypeOverride::ForceProxied),
        "direct" => Ok(ControllerTypeOverride::ForceDirect),
        other => Err(ConfigError::Validation {
            field: "controller_type".into(),
            reason: format!("expected 'auto', 'proxied', or 'direct', got '{other}'"),
        }),
    }
}

/// Build a `ConnectionConfig` from a profile.
pub fn profile_to_connection_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ConnectionConfig, ConfigError> {
    let url: url::Url = profile
        .controller
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "controller".into(),
            reason: format!("invalid URL: {}", profile.controller),
        })?;

    let username = resolve_username(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;
    let controller_type = parse_controller_type(&profile.controller_type)?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::DangerAcceptInvalid // local controllers typically self-signed
    };

    let defaults = ConnectionConfig::default();
    Ok(ConnectionConfig {
        url,
        username,
        password,
        site: profile.site.clone(),
        tls,
        timeout: profile.timeout.map_or(defaults.timeout, Duration::from_secs),
        cache_ttl: profile
            .cache_ttl
            .map_or(defaults.cache_ttl, Duration::from_secs),
        max_retries: profile.max_retries.unwrap_or(defaults.max_retries),
        retry_delay: profile
            .retry_delay
            .map_or(defaults.retry_delay, Duration::from_secs),
        controller_type,
        detector: defaults.detector,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(toml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_profiles_from_toml() {
        let file = write_config(
            r#"
            default_profile = "home"

            [profiles.home]
            controller = "https://192.168.1.1"
            username = "admin"
            password = "hunter2"
            site = "default"
            controller_type = "proxied"
            "#,
        );

        let config = load_config_from(file.path()).unwrap();
        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "home");
        assert_eq!(profile.controller, "https://192.168.1.1");
        assert_eq!(profile.controller_type, "proxied");
    }

    #[test]
    fn missing_profile_is_an_error() {
        let file = write_config("default_profile = \"nope\"\n");
        let config = load_config_from(file.path()).unwrap();
        assert!(matches!(
            config.profile(None),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn profile_translates_to_connection_config() {
        let profile = Profile {
            controller: "https://unifi.local:8443".into(),
            site: "branch".into(),
            username: Some("admin".into()),
            password: Some("hunter2".into()),
            controller_type: "direct".into(),
            ca_cert: None,
            insecure: Some(true),
            timeout: Some(10),
            cache_ttl: Some(5),
            max_retries: Some(2),
            retry_delay: Some(1),
        };

        let config = profile_to_connection_config(&profile, "test").unwrap();
        assert_eq!(config.url.as_str(), "https://unifi.local:8443/");
        assert_eq!(config.site, "branch");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 2);
        assert!(matches!(
            config.controller_type,
            ControllerTypeOverride::ForceDirect
        ));
    }

    #[test]
    fn bad_controller_type_is_rejected() {
        let err = parse_controller_type("upside-down").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn bad_url_is_rejected() {
        let profile = Profile {
            controller: "not a url".into(),
            site: default_site(),
            username: Some("admin".into()),
            password: Some("pw".into()),
            controller_type: default_controller_type(),
            ca_cert: None,
            insecure: None,
            timeout: None,
            cache_ttl: None,
            max_retries: None,
            retry_delay: None,
        };
        let err = profile_to_connection_config(&profile, "test").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
