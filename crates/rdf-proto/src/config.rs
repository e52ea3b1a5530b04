use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::platform;
use crate::error::RdfError;

/// Backend connection disabled entirely.
pub const MODE_DISABLED: i32 = -1;
/// Transmissions only.
pub const MODE_RDF_ONLY: i32 = 0;
const MODE_MAX: i32 = 2;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// tracing filter used when `RUST_LOG` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_address")]
    pub address: String,
    /// -1 disabled, 0 RDF only, 1 and 2 RDF plus channel sync
    #[serde(default = "default_mode")]
    pub mode: i32,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default = "default_version_path")]
    pub version_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_presence_port")]
    pub presence_port: u16,
    #[serde(default = "default_frequency_port")]
    pub frequency_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Draw settings, one table per surface.
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
    #[serde(default = "default_styles_file")]
    pub styles_file: PathBuf,
}

/// A ground-to-air channel seeded into the in-memory host at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    /// MHz
    pub frequency: f64,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub atis: bool,
    #[serde(default)]
    pub rx: bool,
    #[serde(default)]
    pub tx: bool,
}

impl BackendConfig {
    pub fn is_disabled(&self) -> bool {
        self.mode == MODE_DISABLED
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.address, self.ws_path)
    }

    pub fn version_url(&self) -> String {
        format!("http://{}{}", self.address, self.version_path)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: default_backend_address(),
            mode: default_mode(),
            ws_path: default_ws_path(),
            version_path: default_version_path(),
            timeout_secs: default_timeout_secs(),
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bind_address: default_bind_address(),
            presence_port: default_presence_port(),
            frequency_port: default_frequency_port(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            settings_file: default_settings_file(),
            styles_file: default_styles_file(),
        }
    }
}

fn default_backend_address() -> String {
    platform::DEFAULT_BACKEND_ADDRESS.to_string()
}

fn default_mode() -> i32 {
    1
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_version_path() -> String {
    "/*".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_presence_port() -> u16 {
    49081
}

fn default_frequency_port() -> u16 {
    49082
}

fn default_port() -> u16 {
    49090
}

fn default_settings_file() -> PathBuf {
    platform::config_dir().join("settings.toml")
}

fn default_styles_file() -> PathBuf {
    platform::config_dir().join("RDFStyles.json")
}

impl Config {
    /// Read `path`, writing the defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        for fault in config.sanitize() {
            warn!("{}", fault);
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Reset out-of-range fields to their defaults, reporting each one.
    pub fn sanitize(&mut self) -> Vec<RdfError> {
        let mut faults = Vec::new();
        if !(MODE_DISABLED..=MODE_MAX).contains(&self.backend.mode) {
            faults.push(RdfError::config("backend.mode", format!("{} is outside -1..=2", self.backend.mode)));
            self.backend.mode = default_mode();
        }
        if self.backend.heartbeat_secs == 0 {
            faults.push(RdfError::config("backend.heartbeat_secs", "must be positive"));
            self.backend.heartbeat_secs = default_heartbeat_secs();
        }
        if self.backend.timeout_secs == 0 {
            faults.push(RdfError::config("backend.timeout_secs", "must be positive"));
            self.backend.timeout_secs = default_timeout_secs();
        }
        faults
    }
}
