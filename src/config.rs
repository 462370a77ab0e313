//! Node configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Physical link technology behind a handler.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Wired UART bridge on a local tty device.
    #[default]
    Serial,
    /// UART bridge exposed over TCP (ser2net style).
    Tcp,
    /// Wireless radio module attached over a local tty device.
    Radio,
}

impl LinkKind {
    /// Lower-case label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Tcp => "tcp",
            Self::Radio => "radio",
        }
    }
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_max_line_bytes() -> usize {
    crate::transport::DEFAULT_MAX_LINE_BYTES
}

fn default_poll_interval_ms() -> u64 {
    50
}

/// Parameters handed to [`Transport::open`](crate::transport::Transport::open).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LinkConfig {
    /// Link technology.
    #[serde(default)]
    pub kind: LinkKind,
    /// Device path for `serial` and `radio` links (e.g. `/dev/ttyUSB0`).
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// `host:port` for `tcp` links.
    #[serde(default)]
    pub address: Option<String>,
    /// Line rate for tty devices.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Longest accepted inbound line, terminator excluded.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            kind: LinkKind::default(),
            path: None,
            address: None,
            baud_rate: default_baud_rate(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

impl LinkConfig {
    /// Validate link parameters for the selected [`LinkKind`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a required endpoint is missing or a
    /// limit is zero.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            LinkKind::Serial | LinkKind::Radio if self.path.is_none() => {
                return Err(AppError::Config(format!(
                    "{} link requires `path`",
                    self.kind.as_str()
                )));
            }
            LinkKind::Tcp if self.address.as_deref().map_or(true, str::is_empty) => {
                return Err(AppError::Config("tcp link requires `address`".into()));
            }
            _ => {}
        }

        if self.baud_rate == 0 {
            return Err(AppError::Config("baud_rate must be greater than zero".into()));
        }
        if self.max_line_bytes == 0 {
            return Err(AppError::Config(
                "max_line_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Node configuration parsed from a TOML file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct NodeConfig {
    /// Identifier this node uses as `src` and answers to as `dst`.
    pub node_id: String,
    /// Interval between receive polls in the node loop.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Link the handler opens on `begin`.
    pub link: LinkConfig,
}

impl NodeConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate node-level settings and the nested link.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(AppError::Config("node_id must not be empty".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        self.link.validate()
    }
}
