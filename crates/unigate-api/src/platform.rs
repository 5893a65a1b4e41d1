// Controller deployment variants and the operator override.
//
// The same management API is served under two path families depending
// on where the controller runs. Picking the wrong family makes every
// request 404, so the variant is either detected empirically (detect.rs)
// or forced by the operator.

/// The deployment variant of the controller's management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerType {
    /// Gateway-hosted controller reached through the `/proxy/network` prefix.
    Proxied,
    /// Appliance-hosted controller reached directly, no prefix.
    Direct,
}

impl ControllerType {
    /// The path prefix applied to every API URL for this variant.
    pub fn path_prefix(&self) -> &'static str {
        match self {
            Self::Proxied => "/proxy/network",
            Self::Direct => "",
        }
    }

    /// The login endpoint path for this variant.
    pub fn login_path(&self) -> &'static str {
        match self {
            Self::Proxied => "/api/auth/login",
            Self::Direct => "/api/login",
        }
    }

    /// The logout endpoint path for this variant.
    pub fn logout_path(&self) -> &'static str {
        match self {
            Self::Proxied => "/api/auth/logout",
            Self::Direct => "/api/logout",
        }
    }
}

impl std::fmt::Display for ControllerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proxied => write!(f, "proxied"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

/// Operator-supplied controller type override.
///
/// `Auto` means "probe the live host"; the forced variants bypass
/// detection entirely and are honored before the first login attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControllerTypeOverride {
    #[default]
    Auto,
    ForceProxied,
    ForceDirect,
}

impl ControllerTypeOverride {
    /// The forced variant, if any.
    pub fn forced(&self) -> Option<ControllerType> {
        match self {
            Self::Auto => None,
            Self::ForceProxied => Some(ControllerType::Proxied),
            Self::ForceDirect => Some(ControllerType::Direct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxied_prefix_applies_to_login_and_api_paths() {
        assert_eq!(ControllerType::Proxied.path_prefix(), "/proxy/network");
        assert_eq!(ControllerType::Proxied.login_path(), "/api/auth/login");
    }

    #[test]
    fn direct_variant_has_no_prefix() {
        assert_eq!(ControllerType::Direct.path_prefix(), "");
        assert_eq!(ControllerType::Direct.login_path(), "/api/login");
    }

    #[test]
    fn override_forced_mapping() {
        assert_eq!(ControllerTypeOverride::Auto.forced(), None);
        assert_eq!(
            ControllerTypeOverride::ForceProxied.forced(),
            Some(ControllerType::Proxied)
        );
        assert_eq!(
            ControllerTypeOverride::ForceDirect.forced(),
            Some(ControllerType::Direct)
        );
    }
}
