//! Daemon configuration: a small TOML file, fully overridable from the
//! command line.  A missing file is not an error — every field has a
//! default.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// IP address to bind to; the default accepts from all interfaces.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    389
}

/// Default location: `$XDG_CONFIG_HOME/bivvi/config.toml`.
pub fn default_config_path() -> PathBuf {
    let mut base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = std::env::var_os("HOME").unwrap_or_default();
            PathBuf::from(home).join(".config")
        });
    base.push("bivvi");
    base.push("config.toml");
    base
}

/// Load `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::warn!(
            "config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parse config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_everywhere() {
        let config = Config::default();
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.port, 389);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = toml::from_str("[listen]\nport = 3389\n").unwrap();
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.port, 3389);
    }

    #[test]
    fn empty_config_parses() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.listen.port, 389);
    }
}
