//! Startup orchestration.
//!
//! # Responsibilities
//! - Locate and load the configuration file
//! - Apply command-line overrides
//!
//! # Design Decisions
//! - Fail fast: an explicit config path that cannot be loaded is fatal
//! - The default path is optional; without it built-in defaults apply

use std::path::{Path, PathBuf};

use crate::config::{load_config, validation::validate_config, ConfigError, ProxyConfig};

/// Config file looked up when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "alias-proxy.toml";

/// The configuration to start with, and the file it came from (if any).
#[derive(Debug)]
pub struct StartupConfig {
    pub config: ProxyConfig,
    pub source: Option<PathBuf>,
}

/// Load the startup configuration.
///
/// `explicit` is the path given on the command line. `bind` overrides the
/// listener address.
pub fn load_startup_config(
    explicit: Option<&Path>,
    bind: Option<&str>,
) -> Result<StartupConfig, ConfigError> {
    let (mut config, source) = match explicit {
        Some(path) => (load_config(path)?, Some(path.to_path_buf())),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                (load_config(default)?, Some(default.to_path_buf()))
            } else {
                (ProxyConfig::default(), None)
            }
        }
    };

    if let Some(addr) = bind {
        config.listener.bind_address = addr.to_string();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    Ok(StartupConfig { config, source })
}
