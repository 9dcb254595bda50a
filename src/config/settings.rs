use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const ENV_API_EMAIL: &str = "CLOUDFLARE_API_EMAIL";
pub const ENV_API_KEY: &str = "CLOUDFLARE_API_KEY";
pub const ENV_ZONE_ID: &str = "CLOUDFLARE_API_ZONEID";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
    #[serde(default)]
    pub ip: IpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Treat a zone with no records as a valid, empty result instead of an error.
    #[serde(default)]
    pub allow_empty_zone: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpConfig {
    #[serde(default = "default_echo_url")]
    pub echo_url: String,
}

fn default_interval() -> u64 {
    120 // 2 minutes
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_api_base() -> String {
    crate::dns::CLOUDFLARE_API_BASE.to_string()
}

fn default_echo_url() -> String {
    crate::ip::DEFAULT_ECHO_URL.to_string()
}

impl Settings {
    /// Load settings from `path`, or from the default location when `path` is `None`.
    ///
    /// An explicitly given file must exist. The default file is optional and
    /// built-in defaults are used when it is absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::load_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.daemon.interval_seconds == 0 {
            return Err(Error::config("daemon.interval_seconds must be > 0"));
        }
        if self.daemon.request_timeout_seconds == 0 {
            return Err(Error::config("daemon.request_timeout_seconds must be > 0"));
        }
        if self.cloudflare.api_base.is_empty() {
            return Err(Error::config("cloudflare.api_base cannot be empty"));
        }
        if self.ip.echo_url.is_empty() {
            return Err(Error::config("ip.echo_url cannot be empty"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.daemon.interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.daemon.request_timeout_seconds)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn config_dir() -> PathBuf {
        #[cfg(unix)]
        {
            PathBuf::from("/etc/dyndns")
        }
        #[cfg(windows)]
        {
            PathBuf::from(r"C:\ProgramData\dyndns")
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            allow_empty_zone: false,
        }
    }
}

impl Default for IpConfig {
    fn default() -> Self {
        Self {
            echo_url: default_echo_url(),
        }
    }
}

/// Cloudflare account credentials and the zone they manage.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub api_key: String,
    pub zone_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_key", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from an arbitrary variable lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let email = read(ENV_API_EMAIL);
        let api_key = read(ENV_API_KEY);
        let zone_id = read(ENV_ZONE_ID);

        match (email, api_key, zone_id) {
            (Some(email), Some(api_key), Some(zone_id)) => Ok(Self {
                email,
                api_key,
                zone_id,
            }),
            (email, api_key, zone_id) => {
                let missing: Vec<&str> = [
                    (ENV_API_EMAIL, email.is_none()),
                    (ENV_API_KEY, api_key.is_none()),
                    (ENV_ZONE_ID, zone_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();

                Err(Error::config(format!(
                    "required environment variables not set: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}
