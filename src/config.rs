//! Device connection settings
//!
//! Settings come from `config.toml` in the config directory, then
//! `PANOS_*` environment variables override individual fields:
//!
//! ```toml
//! timeout = 30
//! jobs = 4
//! scenario_dirs = ["~/lab/scenarios"]
//!
//! [device]
//! hostname = "panorama.lab.example"
//! api_key = "..."
//! skip_verify_certificate = true
//!
//! [endpoints]
//! ethernet_layer3_subinterface = "Network/EthernetSubinterfaces"
//! ```

use anyhow::{Context, Result, bail};
use panoskit::{Client, MemoryBackend, RestBackend, RestConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::paths;

pub const ENV_HOSTNAME: &str = "PANOS_HOSTNAME";
pub const ENV_API_KEY: &str = "PANOS_API_KEY";
pub const ENV_PROTOCOL: &str = "PANOS_PROTOCOL";
pub const ENV_PORT: &str = "PANOS_PORT";
pub const ENV_API_VERSION: &str = "PANOS_API_VERSION";
pub const ENV_SKIP_VERIFY_CERTIFICATE: &str = "PANOS_SKIP_VERIFY_CERTIFICATE";
pub const ENV_TIMEOUT: &str = "PANOS_TIMEOUT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<RestConfig>,
    /// Per-call timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Default number of parallel cases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    /// Directories searched for scenario files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenario_dirs: Vec<String>,
    /// REST endpoint overrides keyed by object kind
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,
}

impl Config {
    /// Load `config.toml` and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = paths::config_file()?;
        Self::load_from(&path)?.with_env(|key| std::env::var(key).ok())
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Apply `PANOS_*` overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let overrides = [
            ENV_HOSTNAME,
            ENV_API_KEY,
            ENV_PROTOCOL,
            ENV_PORT,
            ENV_API_VERSION,
            ENV_SKIP_VERIFY_CERTIFICATE,
        ];
        for key in overrides {
            let Some(value) = lookup(key) else { continue };
            log::debug!("Using {key} from environment");
            let device = self
                .device
                .get_or_insert_with(|| RestConfig::new(String::new(), String::new()));
            match key {
                ENV_HOSTNAME => device.hostname = value,
                ENV_API_KEY => device.api_key = value,
                ENV_PROTOCOL => device.protocol = value,
                ENV_PORT => {
                    device.port = Some(
                        value
                            .parse()
                            .with_context(|| format!("{key}={value} is not a valid port"))?,
                    );
                }
                ENV_API_VERSION => device.api_version = value,
                _ => device.skip_verify_certificate = parse_bool(key, &value)?,
            }
        }
        if let Some(value) = lookup(ENV_TIMEOUT) {
            self.timeout = Some(
                value
                    .parse()
                    .with_context(|| format!("{ENV_TIMEOUT}={value} is not a number of seconds"))?,
            );
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Human-readable description of where calls go.
    pub fn target(&self, offline: bool) -> String {
        match (&self.device, offline) {
            (Some(device), false) => device.base_url(),
            _ => "in-memory store".to_string(),
        }
    }

    /// Build a client: the in-memory store when `offline`, otherwise the
    /// REST backend with every registered kind's endpoint.
    pub fn client(&self, offline: bool) -> Result<Client> {
        if offline {
            log::info!("Using the in-memory store");
            return Ok(Client::new(Arc::new(MemoryBackend::new())));
        }
        let Some(device) = &self.device else {
            bail!(
                "no device configured: set {ENV_HOSTNAME} and {ENV_API_KEY}, add a [device] table to {}, or pass --offline",
                paths::CONFIG_FILE
            );
        };

        let mut backend = RestBackend::new(device)
            .context("Invalid device settings")?
            .with_endpoints(objects::kinds::endpoints());
        for (kind, endpoint) in &self.endpoints {
            if objects::kinds::get(kind).is_none() {
                bail!("endpoint override for unknown kind '{kind}'");
            }
            log::debug!("Endpoint override: {kind} -> {endpoint}");
            backend = backend.with_endpoint(kind, endpoint);
        }
        log::info!("Using device at {}", backend.base_url());

        let client = Client::new(Arc::new(backend));
        Ok(match self.timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => bail!("{key}={value} is not a boolean"),
    }
}

// ============================================================================
// Tests
// ============================================================================
