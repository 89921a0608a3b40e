//! Configuration for fpgactl.
//!
//! Resolution order: command line flags → config file → defaults.
//!
//! Config file location: `--config <FILE>` or `$FPGACTL_CONFIG`. Without one, the defaults are
//! used as-is.

use anyhow::Context;
use fpgareg::verify::{
    VerifyConfig,
    DEFAULT_ADDRESSES,
    DEFAULT_ITERATIONS,
};
use serde::Deserialize;
use udpreg::frame::MAX_ADDRESS;
use std::{
    net::{
        IpAddr,
        Ipv4Addr,
        SocketAddr,
    },
    path::Path,
    time::Duration,
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub verify: VerifySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// IP address of the FPGA
    pub host: IpAddr,
    /// UDP port the FPGA listens for register frames on
    pub port: u16,
    /// How long to wait for each reply, in milliseconds. Must be nonzero.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VerifySettings {
    pub iterations: usize,
    /// Omit for a fresh OS-seeded run every time
    pub seed: Option<u64>,
    /// Each worker owns its own session and a disjoint slice of the address range
    pub workers: usize,
    pub address_min: u32,
    pub address_max: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 128)),
            port: 1234,
            timeout_ms: 500,
        }
    }
}

impl Default for VerifySettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: None,
            workers: 1,
            address_min: *DEFAULT_ADDRESSES.start(),
            address_max: *DEFAULT_ADDRESSES.end(),
        }
    }
}

impl Config {
    /// Load from `path` if given, otherwise use the defaults
    /// # Errors
    /// Returns an error if the file can't be read or parsed
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse a TOML document, filling anything missing with defaults
    /// # Errors
    /// Returns an error on malformed TOML or invalid values
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the rest of the program relies on
    /// # Errors
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.device.timeout_ms > 0, "timeout_ms must be nonzero");
        anyhow::ensure!(self.verify.workers > 0, "workers must be at least 1");
        anyhow::ensure!(
            self.verify.address_min <= self.verify.address_max,
            "address_min ({}) is above address_max ({})",
            self.verify.address_min,
            self.verify.address_max
        );
        // Wider addresses are truncated on the wire and would alias across workers
        anyhow::ensure!(
            self.verify.address_max <= MAX_ADDRESS,
            "address_max ({:#x}) doesn't fit in 30 bits (max {MAX_ADDRESS:#x})",
            self.verify.address_max
        );
        Ok(())
    }

    #[must_use]
    pub fn target(&self) -> SocketAddr {
        SocketAddr::new(self.device.host, self.device.port)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.device.timeout_ms)
    }

    #[must_use]
    pub fn verify_config(&self) -> VerifyConfig {
        VerifyConfig {
            iterations: self.verify.iterations,
            addresses: self.verify.address_min..=self.verify.address_max,
            seed: self.verify.seed,
        }
    }
}
