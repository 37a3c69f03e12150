//! Per-zone tunables
//!
//! A value is looked up in the zone's own store first, then in the war-wide
//! zone defaults, then falls back to the built-in default.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneSetting {
    MaxPlayers,
    Editing,
    MaxRounds,
    MaxPoints,
}

impl ZoneSetting {
    pub const ALL: [ZoneSetting; 4] = [
        ZoneSetting::MaxPlayers,
        ZoneSetting::Editing,
        ZoneSetting::MaxRounds,
        ZoneSetting::MaxPoints,
    ];

    /// Storage and command key
    pub fn key(self) -> &'static str {
        match self {
            ZoneSetting::MaxPlayers => "maxplayers",
            ZoneSetting::Editing => "editing",
            ZoneSetting::MaxRounds => "maxrounds",
            ZoneSetting::MaxPoints => "maxpoints",
        }
    }

    pub fn default_value(self) -> SettingValue {
        match self {
            ZoneSetting::MaxPlayers => SettingValue::Int(10),
            ZoneSetting::Editing => SettingValue::Bool(false),
            ZoneSetting::MaxRounds => SettingValue::Int(5),
            ZoneSetting::MaxPoints => SettingValue::Int(10),
        }
    }

    /// Parse a raw value for this setting; limits must be at least 1
    pub fn parse_value(self, raw: &str) -> Result<SettingValue, SettingError> {
        match self.default_value() {
            SettingValue::Bool(_) => match raw.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" => Ok(SettingValue::Bool(true)),
                "false" | "off" | "no" => Ok(SettingValue::Bool(false)),
                _ => Err(SettingError::InvalidValue {
                    setting: self.key(),
                    value: raw.to_string(),
                }),
            },
            SettingValue::Int(_) => match raw.parse::<i64>() {
                Ok(n) if n >= 1 => Ok(SettingValue::Int(n)),
                _ => Err(SettingError::InvalidValue {
                    setting: self.key(),
                    value: raw.to_string(),
                }),
            },
        }
    }
}

impl fmt::Display for ZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ZoneSetting {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ZoneSetting::ALL
            .into_iter()
            .find(|setting| setting.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| SettingError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
}

impl SettingValue {
    pub fn as_int(self) -> Option<i64> {
        match self {
            SettingValue::Int(n) => Some(n),
            SettingValue::Bool(_) => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(b),
            SettingValue::Int(_) => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingError {
    #[error("Unknown setting {0}.")]
    Unknown(String),

    #[error("Invalid value {value} for {setting}.")]
    InvalidValue { setting: &'static str, value: String },
}

/// War-wide fallback values for zone settings
pub type ZoneDefaults = BTreeMap<ZoneSetting, SettingValue>;

/// Resolve one setting from a zone override and the war defaults
pub fn resolve(setting: ZoneSetting, zone_value: Option<&str>, defaults: &ZoneDefaults) -> SettingValue {
    zone_value
        .and_then(|raw| setting.parse_value(raw).ok())
        .or_else(|| defaults.get(&setting).copied())
        .unwrap_or_else(|| setting.default_value())
}

/// Settings of one zone, fully resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneSettings {
    pub max_players: usize,
    pub max_rounds: u32,
    pub max_points: u32,
    pub editing: bool,
}

impl ZoneSettings {
    pub fn from_lookup(lookup: impl Fn(ZoneSetting) -> SettingValue) -> Self {
        let int = |setting: ZoneSetting| {
            lookup(setting)
                .as_int()
                .or_else(|| setting.default_value().as_int())
                .unwrap_or(1)
                .max(1)
        };
        Self {
            max_players: usize::try_from(int(ZoneSetting::MaxPlayers)).unwrap_or(usize::MAX),
            max_rounds: u32::try_from(int(ZoneSetting::MaxRounds)).unwrap_or(u32::MAX),
            max_points: u32::try_from(int(ZoneSetting::MaxPoints)).unwrap_or(u32::MAX),
            editing: lookup(ZoneSetting::Editing).as_bool().unwrap_or(false),
        }
    }
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self::from_lookup(ZoneSetting::default_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_defaults() {
        let settings = ZoneSettings::default();
        assert_eq!(settings.max_players, 10);
        assert_eq!(settings.max_rounds, 5);
        assert_eq!(settings.max_points, 10);
        assert!(!settings.editing);
    }

    #[test]
    fn zone_value_beats_war_default_beats_built_in() {
        let mut defaults = ZoneDefaults::new();
        defaults.insert(ZoneSetting::MaxPoints, SettingValue::Int(3));

        assert_eq!(resolve(ZoneSetting::MaxPoints, Some("7"), &defaults), SettingValue::Int(7));
        assert_eq!(resolve(ZoneSetting::MaxPoints, None, &defaults), SettingValue::Int(3));
        assert_eq!(resolve(ZoneSetting::MaxRounds, None, &defaults), SettingValue::Int(5));
        // garbage stored values fall through
        assert_eq!(resolve(ZoneSetting::MaxPoints, Some("lots"), &defaults), SettingValue::Int(3));
    }

    #[test]
    fn parse_is_case_insensitive_and_checked() {
        assert_eq!("MaxPlayers".parse::<ZoneSetting>(), Ok(ZoneSetting::MaxPlayers));
        assert!("speed".parse::<ZoneSetting>().is_err());

        assert_eq!(ZoneSetting::Editing.parse_value("TRUE"), Ok(SettingValue::Bool(true)));
        assert!(ZoneSetting::Editing.parse_value("7").is_err());
        assert!(ZoneSetting::MaxRounds.parse_value("0").is_err());
        assert!(ZoneSetting::MaxRounds.parse_value("x").is_err());
    }
}
