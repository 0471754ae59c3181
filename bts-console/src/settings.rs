//! Console settings

use std::path::{Path, PathBuf};

use anyhow::Context;
use bts_scan::ScanConfig;

/// Get the XDG config directory for btsscan
/// Uses $XDG_CONFIG_HOME/btsscan on Linux/macOS, falls back to ~/.config/btsscan
fn config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config);
        if path.is_absolute() {
            return Some(path.join("btsscan"));
        }
    }

    dirs::home_dir().map(|h| h.join(".config").join("btsscan"))
}

/// Default settings file path
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Load settings
///
/// An explicit path must exist and parse. Without one, the default file is
/// used if present, and defaults otherwise.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<ScanConfig> {
    match explicit {
        Some(path) => read(path),
        None => match settings_path() {
            Some(path) if path.is_file() => read(&path),
            _ => Ok(ScanConfig::default()),
        },
    }
}

fn read(path: &Path) -> anyhow::Result<ScanConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Invalid settings in {}", path.display()))?;
    tracing::debug!("Loaded settings from {}", path.display());
    Ok(config)
}
