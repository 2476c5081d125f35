use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VclError};
use crate::model::Image;
use crate::retry::RetryPolicy;

pub const DEFAULT_ENDPOINT: &str = "https://vcl.ncsu.edu/scheduling/index.php?mode=xmlrpccall";
pub const CONFIG_ENV: &str = "VCL_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub username: Option<String>,
    /// Address reported to the service as the connecting client.
    pub caller_address: Option<String>,
    pub request: RequestDefaults,
    pub polling: PollingConfig,
    pub ssh: SshConfig,
    pub remote_desktop: RemoteDesktopConfig,
    /// Cached image catalog, refreshed by `vcl images --refresh`.
    pub images: Vec<Image>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            username: None,
            caller_address: None,
            request: RequestDefaults::default(),
            polling: PollingConfig::default(),
            ssh: SshConfig::default(),
            remote_desktop: RemoteDesktopConfig::default(),
            images: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub length_minutes: u32,
    pub inactivity_timeout: bool,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            length_minutes: 480,
            inactivity_timeout: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub max_checks: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            max_checks: 240,
        }
    }
}

impl PollingConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.interval_secs), self.max_checks)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub program: String,
    pub port: u16,
    pub retry_delay_secs: u64,
    pub max_attempts: u32,
    pub probe_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            port: 22,
            retry_delay_secs: 2,
            max_attempts: 5,
            probe_timeout_secs: 5,
        }
    }
}

impl SshConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.retry_delay_secs), self.max_attempts)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteDesktopConfig {
    pub viewer: String,
    pub profile_dir: Option<PathBuf>,
}

impl Default for RemoteDesktopConfig {
    fn default() -> Self {
        Self {
            viewer: "remmina".to_string(),
            profile_dir: None,
        }
    }
}

impl RemoteDesktopConfig {
    pub fn resolved_profile_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.profile_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("vcl").join("profiles"))
            .ok_or_else(|| VclError::Config("could not determine a data directory".to_string()))
    }
}

impl Config {
    /// `$VCL_CONFIG`, or `config.toml` under the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|d| d.join("vcl").join("config.toml"))
            .ok_or_else(|| VclError::Config("could not determine a config directory".to_string()))
    }

    /// Missing files load as defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&raw).map_err(|e| VclError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self).map_err(|e| VclError::Config(e.to_string()))?;
        fs::write(path, raw)?;
        debug!(path = %path.display(), "saved config");
        Ok(())
    }
}
