use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of dispatcher threads when the config does not say otherwise.
/// One dispatcher means downloads run strictly one after another.
pub const DEFAULT_DISPATCHERS: usize = 1;

/// Timeouts and client options for the bundled HTTP transfer (optional `[transfer]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Seconds allowed for the TCP/TLS connect phase.
    pub connect_timeout_secs: u64,
    /// Bytes per second below which a transfer counts as stalled.
    pub low_speed_limit: u32,
    /// Seconds a transfer may stay below `low_speed_limit` before it is aborted.
    pub low_speed_time_secs: u64,
    /// Hard wall-clock cap for one transfer.
    pub timeout_secs: u64,
    /// Optional User-Agent header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            timeout_secs: 3600,
            user_agent: None,
        }
    }
}

/// Global configuration loaded from `~/.config/sdm/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdmConfig {
    /// Size of the dispatcher pool (clamped to at least 1).
    #[serde(default = "default_dispatchers")]
    pub dispatchers: usize,
    /// Directory downloads land in; None = current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    #[serde(default)]
    pub transfer: TransferConfig,
}

fn default_dispatchers() -> usize {
    DEFAULT_DISPATCHERS
}

impl Default for SdmConfig {
    fn default() -> Self {
        Self {
            dispatchers: DEFAULT_DISPATCHERS,
            download_dir: None,
            transfer: TransferConfig::default(),
        }
    }
}

impl SdmConfig {
    /// Pool size actually used: a zero in the file still yields one dispatcher.
    pub fn pool_size(&self) -> usize {
        self.dispatchers.max(1)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("sdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<SdmConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: SdmConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
