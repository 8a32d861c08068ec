//! Persisted settings: an opaque key/value map owned by the host.
//!
//! The host loads the map before a session and saves it afterwards. The
//! engine reads and writes two keys: the guard config as JSON and the ripple
//! preferences as `name,enabled,rpm;` records keyed by weapon name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_RIPPLE_RPM;

/// Key holding the JSON guard config.
pub const GUARD_CONFIG_KEY: &str = "guard_config";

/// Key holding the ripple preference records.
pub const RIPPLE_KEY: &str = "ripple";

/// Opaque host-side key/value store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSettings(pub BTreeMap<String, String>);

impl PersistedSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }
}

/// Ripple preference for one weapon definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RippleOption {
    pub enabled: bool,
    /// Requested ripple rate for missiles and bombs (rpm).
    pub rpm: f64,
}

impl Default for RippleOption {
    fn default() -> Self {
        Self {
            enabled: false,
            rpm: DEFAULT_RIPPLE_RPM,
        }
    }
}

/// Malformed ripple preference record.
#[derive(Debug, Error, PartialEq)]
pub enum RippleParseError {
    #[error("ripple record `{0}` does not have three fields")]
    FieldCount(String),
    #[error("ripple record `{record}` has an invalid enabled flag")]
    Flag { record: String },
    #[error("ripple record `{record}` has an invalid rate")]
    Rate { record: String },
}

/// Ripple preferences keyed by weapon definition name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RipplePreferences(pub BTreeMap<String, RippleOption>);

impl RipplePreferences {
    /// Parse `name,enabled,rpm;` records. Empty records are skipped.
    pub fn parse(data: &str) -> Result<Self, RippleParseError> {
        let mut prefs = BTreeMap::new();
        for record in data.split(';').map(str::trim).filter(|r| !r.is_empty()) {
            let fields: Vec<&str> = record.split(',').map(str::trim).collect();
            let [name, enabled, rpm] = fields.as_slice() else {
                return Err(RippleParseError::FieldCount(record.to_string()));
            };
            let enabled = parse_flag(enabled).ok_or_else(|| RippleParseError::Flag {
                record: record.to_string(),
            })?;
            let rpm = rpm
                .parse::<f64>()
                .ok()
                .filter(|r| r.is_finite() && *r > 0.0)
                .ok_or_else(|| RippleParseError::Rate {
                    record: record.to_string(),
                })?;
            prefs.insert(name.to_string(), RippleOption { enabled, rpm });
        }
        Ok(Self(prefs))
    }

    /// Serialize back into the record format.
    pub fn to_record_string(&self) -> String {
        self.0
            .iter()
            .map(|(name, opt)| format!("{name},{},{};", opt.enabled, opt.rpm))
            .collect()
    }

    /// Preference for a weapon, inserting `seed` when none is stored.
    pub fn entry(&mut self, name: &str, seed: RippleOption) -> RippleOption {
        *self.0.entry(name.to_string()).or_insert(seed)
    }

    pub fn set(&mut self, name: &str, option: RippleOption) {
        self.0.insert(name.to_string(), option);
    }

    pub fn get(&self, name: &str) -> Option<RippleOption> {
        self.0.get(name).copied()
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
