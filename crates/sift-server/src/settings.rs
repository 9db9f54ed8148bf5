//! Server settings: file plus environment layering

use serde::Deserialize;
use sift_core::{CuratorConfig, HubConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub curator: CuratorConfig,

    #[serde(default)]
    pub hub: HubConfig,
}

impl Settings {
    /// Load from `sift.toml` (if present) with `SIFT_*` env overrides,
    /// e.g. `SIFT_HTTP__PORT=9000`.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("sift").required(false))
            .add_source(config::Environment::with_prefix("SIFT").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}
