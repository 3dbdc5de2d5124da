//! Configuration for xcat-web

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Upper bound on a single dispatcher exchange
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Reject dispatcher replies larger than this many bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reply_bytes: Option<usize>,

    /// How commands reach xcatd
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum DispatcherConfig {
    /// Direct connection to the xcatd listener
    Socket {
        #[serde(default = "default_xcatd_host")]
        host: String,
        #[serde(default = "default_xcatd_port")]
        port: u16,
    },

    /// Local client program speaking the XML protocol over stdio
    Process {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            timeout_secs: default_timeout_secs(),
            max_reply_bytes: None,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig::Socket {
            host: default_xcatd_host(),
            port: default_xcatd_port(),
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Load config from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Write config to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than zero".into()));
        }
        if self.max_reply_bytes == Some(0) {
            return Err(Error::Config("max_reply_bytes must be greater than zero".into()));
        }
        if let DispatcherConfig::Process { program, .. } = &self.dispatcher {
            if program.as_os_str().is_empty() {
                return Err(Error::Config("dispatcher program must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Default config path: ~/.xcat-web/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".xcat-web").join("config.toml"))
    }
}

// Default value functions

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_xcatd_host() -> String {
    "localhost".to_string()
}

fn default_xcatd_port() -> u16 {
    3001
}
