//! Scan settings and where they come from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::provision::types::*;

/// Default delay handed to the capture tool, and the countdown length.
pub const DEFAULT_SCAN_SECONDS: u32 = 10;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// User-tunable scan behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanSettings {
    /// Seconds the capture tool waits before opening; also the countdown length.
    pub qr_code_scan_seconds: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            qr_code_scan_seconds: DEFAULT_SCAN_SECONDS,
        }
    }
}

impl ScanSettings {
    pub fn from_json(json: &str) -> Result<Self, ProvisionError> {
        serde_json::from_str(json).map_err(|e| {
            ProvisionError::new(ProvisionErrorKind::ConfigError, "Settings are not valid JSON")
                .with_detail(e.to_string())
        })
    }

    pub fn to_json(&self) -> Result<String, ProvisionError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ProvisionError::new(ProvisionErrorKind::ConfigError, format!("JSON serialise: {}", e))
        })
    }
}

/// Supplies the current scan settings to the provisioning service.
pub trait SettingsProvider: Send + Sync {
    fn scan_settings(&self) -> ScanSettings;
}

impl SettingsProvider for ScanSettings {
    fn scan_settings(&self) -> ScanSettings {
        self.clone()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  JSON file
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings loaded from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonSettingsFile {
    path: PathBuf,
    settings: ScanSettings,
}

impl JsonSettingsFile {
    /// Load `path`. A missing file yields the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ProvisionError> {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(json) => ScanSettings::from_json(&json)
                .map_err(|e| e.with_detail(format!("{}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                ScanSettings::default()
            }
            Err(e) => {
                return Err(ProvisionError::new(
                    ProvisionErrorKind::ConfigError,
                    format!("Cannot read settings: {}", e),
                )
                .with_detail(format!("{}", path.display())))
            }
        };
        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Replace the settings and write them back, creating parent directories.
    pub fn save(&mut self, settings: ScanSettings) -> Result<(), ProvisionError> {
        let json = settings.to_json()?;
        let io_err = |e: std::io::Error| {
            ProvisionError::new(
                ProvisionErrorKind::ConfigError,
                format!("Cannot write settings: {}", e),
            )
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&self.path, json).map_err(io_err)?;
        self.settings = settings;
        log::info!("Settings saved to {}", self.path.display());
        Ok(())
    }
}

impl SettingsProvider for JsonSettingsFile {
    fn scan_settings(&self) -> ScanSettings {
        self.settings.clone()
    }
}
