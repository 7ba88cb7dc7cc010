//! Server configuration.
//!
//! Stored as TOML, by default at `~/.config/bigfs/server.toml`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bigfs_protocol::constants::DEFAULT_PORT;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Directory exposed to clients.
    #[serde(default = "default_shared_dir")]
    pub shared_dir: PathBuf,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// WebSocket port (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_shared_dir() -> PathBuf {
    PathBuf::from("/tmp/bigfs")
}

fn default_bind_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            shared_dir: default_shared_dir(),
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Loads settings from `path`, writing defaults there if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let settings = Self::default();
            settings.save_to(path)?;
            Ok(settings)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Applies `BIGFS_SHARED_DIR` and `BIGFS_PORT` from `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(dir) = lookup("BIGFS_SHARED_DIR") {
            self.shared_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup("BIGFS_PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("invalid BIGFS_PORT {port:?}"))?;
        }
        Ok(())
    }
}

/// Picks the config file: explicit argument, then `BIGFS_CONFIG`, then the
/// per-user default.
pub fn config_path(arg: Option<String>) -> PathBuf {
    if let Some(p) = arg.or_else(|| std::env::var("BIGFS_CONFIG").ok()) {
        return PathBuf::from(p);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home)
        .join(".config")
        .join("bigfs")
        .join("server.toml")
}
