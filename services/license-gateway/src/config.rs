//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The simulator and
//! MyAM base URLs can be overridden with SIMSERVER_URL and MYAM_URL so
//! deployments can point one binary at different simulator instances without
//! editing the TOML.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub simulator: SimulatorConfig,
    pub myam: MyamConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_ui_path")]
    pub ui_path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Back-end simulator endpoint
#[derive(Debug, Deserialize)]
pub struct SimulatorConfig {
    pub url: String,
}

/// MyAM identity provider endpoint
#[derive(Debug, Deserialize)]
pub struct MyamConfig {
    pub url: String,
}

fn default_ui_path() -> String {
    "/ui".to_string()
}

fn default_max_connections() -> usize {
    100
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("SIMSERVER_URL") {
            config.simulator.url = url;
        }
        if let Ok(url) = std::env::var("MYAM_URL") {
            config.myam.url = url;
        }

        for (name, url) in [
            ("simulator.url", &config.simulator.url),
            ("myam.url", &config.myam.url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if !config.http.ui_path.starts_with('/') {
            return Err(common::Error::Config(format!(
                "http.ui_path must start with '/', got: {}",
                config.http.ui_path
            )));
        }

        if config.http.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("license-gateway.toml")
    }
}
