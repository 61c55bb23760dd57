//! Provisioning endpoint configuration
//!
//! Built once at startup from the two base URLs and treated as read-only
//! afterwards; every derived endpoint is computed here so the rest of the
//! pipeline never does string surgery on URLs.

/// Resolved endpoints for one simulator/provider pair.
#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    /// Base URL of the back-end simulator, no trailing slash.
    pub sim_server_url: String,
    /// OIDC provider issuer URL on the MyAM server.
    pub provider_url: String,
    /// Token-endpoint audience for request objects.
    pub audience: String,
    /// Bank endpoint passed to lockbox and asset operations.
    pub bank_endpoint: String,
    /// Locale requested on login URLs.
    pub ui_locales: String,
}

impl ProvisioningConfig {
    pub fn new(sim_server_url: &str, myam_url: &str) -> Self {
        let sim = sim_server_url.trim_end_matches('/');
        let myam = myam_url.trim_end_matches('/');
        Self {
            sim_server_url: sim.to_string(),
            provider_url: format!("{myam}/myam/oidc"),
            audience: format!("{myam}/myam/oidc/token"),
            bank_endpoint: format!("{sim}/my-bank"),
            ui_locales: "en".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_endpoints_from_base_urls() {
        let config = ProvisioningConfig::new("http://sim.example:8080", "http://myam.example");
        assert_eq!(config.sim_server_url, "http://sim.example:8080");
        assert_eq!(config.provider_url, "http://myam.example/myam/oidc");
        assert_eq!(config.audience, "http://myam.example/myam/oidc/token");
        assert_eq!(config.bank_endpoint, "http://sim.example:8080/my-bank");
        assert_eq!(config.ui_locales, "en");
    }

    #[test]
    fn trailing_slashes_are_normalized() {
        let config = ProvisioningConfig::new("http://sim.example/", "http://myam.example/");
        assert_eq!(config.provider_url, "http://myam.example/myam/oidc");
        assert_eq!(config.bank_endpoint, "http://sim.example/my-bank");
    }
}
