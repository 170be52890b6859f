use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::system::procfs::DEFAULT_PROC_ROOT;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Process singled out for the detail section.
    pub pid: u32,
    pub proc_root: PathBuf,
    pub sort_processes: bool,
    /// Overrides the runtime clock tick query.
    pub clock_ticks_per_second: Option<u64>,
    /// Exit non-zero when any section fails.
    pub strict_exit: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            pid: 1,
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            sort_processes: true,
            clock_ticks_per_second: None,
            strict_exit: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub shell: String,
    /// Per-command wall-clock limit; 0 waits forever.
    pub timeout_secs: u64,
    pub connections: String,
    pub firewall: String,
    pub gpu: String,
    pub disks: String,
    pub temperature: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            shell: "sh".to_string(),
            timeout_secs: 30,
            connections: "ss -tunap".to_string(),
            firewall: "iptables -L -v -n".to_string(),
            gpu: "lspci | grep -i vga".to_string(),
            disks: "lsblk".to_string(),
            temperature: "sensors | grep 'Core'".to_string(),
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hostprobe").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded config");
                config
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "invalid config, using defaults");
                Config::default()
            }
        },
        Err(err) => {
            debug!(path = %path.display(), %err, "config unreadable, using defaults");
            Config::default()
        }
    }
}
