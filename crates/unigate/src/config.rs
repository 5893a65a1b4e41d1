//! CLI-flag-aware configuration resolution.
//!
//! Layers `GlobalOpts` overrides on top of the profile loaded by
//! `unigate-config`, producing the `ConnectionConfig` the session
//! manager consumes.

use std::time::Duration;

use unigate_api::ControllerTypeOverride;
use unigate_config as cfg;
use unigate_core::{ConnectionConfig, TlsVerification};

use crate::cli::{ControllerTypeArg, GlobalOpts};
use crate::error::CliError;

/// The profile name in effect: `--profile`, else the config default.
pub fn active_profile_name(global: &GlobalOpts, config: &cfg::Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

fn override_from_flag(flag: ControllerTypeArg) -> ControllerTypeOverride {
    match flag {
        ControllerTypeArg::Auto => ControllerTypeOverride::Auto,
        ControllerTypeArg::Proxied => ControllerTypeOverride::ForceProxied,
        ControllerTypeArg::Direct => ControllerTypeOverride::ForceDirect,
    }
}

/// Build a `ConnectionConfig` from the config file, profile, and CLI flags.
pub fn build_connection_config(global: &GlobalOpts) -> Result<ConnectionConfig, CliError> {
    let config = cfg::load_config_or_default();
    let profile_name = active_profile_name(global, &config);

    let mut conn = if let Some(profile) = config.profiles.get(&profile_name) {
        cfg::profile_to_connection_config(profile, &profile_name)?
    } else {
        // No profile: build entirely from flags and env vars.
        from_flags_only(global, &profile_name)?
    };

    // CLI flags beat the profile.
    if let Some(ref url_str) = global.controller {
        conn.url = parse_url(url_str)?;
    }
    if let Some(ref site) = global.site {
        conn.site.clone_from(site);
    }
    if let Some(ref username) = global.username {
        conn.username.clone_from(username);
    }
    if global.insecure {
        conn.tls = TlsVerification::DangerAcceptInvalid;
    }
    conn.timeout = Duration::from_secs(global.timeout);
    if !matches!(global.controller_type, ControllerTypeArg::Auto) {
        conn.controller_type = override_from_flag(global.controller_type);
    }

    Ok(conn)
}

fn from_flags_only(global: &GlobalOpts, profile_name: &str) -> Result<ConnectionConfig, CliError> {
    let url_str = global
        .controller
        .as_deref()
        .ok_or_else(|| CliError::ProfileNotFound {
            name: profile_name.to_owned(),
        })?;

    let username = global
        .username
        .clone()
        .or_else(|| std::env::var("UNIGATE_USERNAME").ok())
        .ok_or_else(|| CliError::NoCredentials {
            profile: profile_name.to_owned(),
        })?;
    let password = std::env::var("UNIGATE_PASSWORD")
        .map(secrecy::SecretString::from)
        .map_err(|_| CliError::NoCredentials {
            profile: profile_name.to_owned(),
        })?;

    let defaults = ConnectionConfig::default();
    Ok(ConnectionConfig {
        url: parse_url(url_str)?,
        username,
        password,
        site: global.site.clone().unwrap_or_else(|| "default".into()),
        tls: if global.insecure {
            TlsVerification::DangerAcceptInvalid
        } else {
            TlsVerification::SystemDefaults
        },
        timeout: Duration::from_secs(global.timeout),
        controller_type: override_from_flag(global.controller_type),
        ..defaults
    })
}

fn parse_url(raw: &str) -> Result<url::Url, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: "controller".into(),
        reason: format!("invalid URL: {raw}"),
    })
}
