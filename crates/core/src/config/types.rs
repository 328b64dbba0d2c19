use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};

use crate::catalogue::CatalogueConfig;
use crate::reconcile::ReconcilerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Torrent client to reconcile. Without it reconciliation is disabled.
    #[serde(default)]
    pub transmission: Option<TransmissionConfig>,
    #[serde(default)]
    pub catalogue: CatalogueConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    /// Label name -> required download path prefix.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Transmission daemon configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransmissionConfig {
    /// RPC endpoint (e.g., "http://localhost:9091/transmission/rpc")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// HTTP client timeout in seconds (default: 30).
    /// Individual reconciler calls carry their own, shorter deadlines.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<SanitizedTransmissionConfig>,
    pub catalogue: CatalogueConfig,
    pub reconciler: ReconcilerConfig,
    pub labels: BTreeMap<String, String>,
}

/// Sanitized Transmission config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTransmissionConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            transmission: config
                .transmission
                .as_ref()
                .map(|t| SanitizedTransmissionConfig {
                    url: t.url.clone(),
                    username: t.username.clone(),
                    password_configured: !t.password.is_empty(),
                    timeout_secs: t.timeout_secs,
                }),
            catalogue: config.catalogue.clone(),
            reconciler: config.reconciler.clone(),
            labels: config.labels.clone(),
        }
    }
}
