//! `tartarus.toml` handling.
//!
//! Every key is optional. Precedence, highest first: command-line flags,
//! environment variables, the config file, built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use wallet_keystore::KdfParams;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "tartarus.toml";
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_KEYSTORE: &str = "keystore.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub rpc_url: String,
    pub keystore: PathBuf,
    pub kdf: KdfConfig,
}

/// Argon2id costs for newly created wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            keystore: PathBuf::from(DEFAULT_KEYSTORE),
            kdf: KdfConfig::default(),
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        let params = KdfParams::default();
        Self {
            m_cost: params.m_cost,
            t_cost: params.t_cost,
            p_cost: params.p_cost,
        }
    }
}

impl From<KdfConfig> for KdfParams {
    fn from(config: KdfConfig) -> Self {
        KdfParams {
            m_cost: config.m_cost,
            t_cost: config.t_cost,
            p_cost: config.p_cost,
        }
    }
}

impl Config {
    /// Loads `path` if given, which must then exist. Without a path the
    /// default file is used when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load_from_file(default)
                } else {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies values given on the command line or through the environment.
    pub fn with_overrides(mut self, rpc_url: Option<String>, keystore: Option<PathBuf>) -> Self {
        if let Some(url) = rpc_url {
            self.rpc_url = url;
        }
        if let Some(path) = keystore {
            self.keystore = path;
        }
        self
    }
}
