//! War-wide configuration persisted as `war.json` in the data directory

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::util::fs::atomic_write;
use crate::zone::settings::{SettingError, ZoneDefaults};

pub const WAR_CONFIG_FILE: &str = "war.json";
pub const DEFAULT_MASK_BLOCK: &str = "minecraft:obsidian";

#[derive(Debug, thiserror::Error)]
pub enum WarConfigError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarSettings {
    pub max_zones: u32,
    /// Largest zone volume in blocks
    pub max_zone_size: u64,
}

impl Default for WarSettings {
    fn default() -> Self {
        Self {
            max_zones: 20,
            max_zone_size: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarSetting {
    MaxZones,
    MaxZoneSize,
}

impl WarSetting {
    pub const ALL: [WarSetting; 2] = [WarSetting::MaxZones, WarSetting::MaxZoneSize];

    pub fn key(self) -> &'static str {
        match self {
            WarSetting::MaxZones => "maxzones",
            WarSetting::MaxZoneSize => "maxzonesize",
        }
    }

    pub fn get(self, settings: &WarSettings) -> u64 {
        match self {
            WarSetting::MaxZones => u64::from(settings.max_zones),
            WarSetting::MaxZoneSize => settings.max_zone_size,
        }
    }

    /// Parse and apply `raw`; values must be positive
    pub fn apply(self, settings: &mut WarSettings, raw: &str) -> Result<(), SettingError> {
        let invalid = || SettingError::InvalidValue {
            setting: self.key(),
            value: raw.to_string(),
        };
        let value = raw.parse::<u64>().ok().filter(|v| *v >= 1).ok_or_else(invalid)?;
        match self {
            WarSetting::MaxZones => settings.max_zones = u32::try_from(value).map_err(|_| invalid())?,
            WarSetting::MaxZoneSize => settings.max_zone_size = value,
        }
        Ok(())
    }
}

impl fmt::Display for WarSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for WarSetting {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WarSetting::ALL
            .into_iter()
            .find(|setting| setting.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| SettingError::Unknown(s.to_string()))
    }
}

fn default_mask_block() -> String {
    DEFAULT_MASK_BLOCK.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarConfig {
    #[serde(default)]
    pub settings: WarSettings,
    #[serde(default)]
    pub zone_defaults: ZoneDefaults,
    /// Registered zones, loaded at startup
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default = "default_mask_block")]
    pub mask_block: String,
    #[serde(skip)]
    path: PathBuf,
}

impl WarConfig {
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(WAR_CONFIG_FILE)
    }

    /// Read `war.json`; a missing file yields the defaults
    pub fn load(data_dir: &Path) -> Result<Self, WarConfigError> {
        let path = Self::path_in(data_dir);
        let mut config = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<WarConfig>(&bytes).map_err(|source| WarConfigError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No war config found, using defaults");
                WarConfig::default()
            }
            Err(source) => return Err(WarConfigError::Io { path, source }),
        };
        config.path = path;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), WarConfigError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| WarConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        atomic_write(&self.path, &json).map_err(|source| WarConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn register_zone(&mut self, name: &str) {
        if !self.zones.iter().any(|z| z == name) {
            self.zones.push(name.to_string());
        }
    }

    pub fn unregister_zone(&mut self, name: &str) -> bool {
        let before = self.zones.len();
        self.zones.retain(|z| z != name);
        before != self.zones.len()
    }
}

impl Default for WarConfig {
    fn default() -> Self {
        Self {
            settings: WarSettings::default(),
            zone_defaults: ZoneDefaults::new(),
            zones: Vec::new(),
            mask_block: default_mask_block(),
            path: PathBuf::from(WAR_CONFIG_FILE),
        }
    }
}
