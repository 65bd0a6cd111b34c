use crate::error::ConfigError;
use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;

const BUILTIN: &str = include_str!("../../data/airports.json");

/// Maps the noisy place names the marketplaces use to one label per airport
#[derive(Debug, Clone, Default)]
pub struct AirportMap {
    entries: HashMap<String, String>,
}

impl AirportMap {
    /// The table shipped with the crate
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN).map_err(|reason| ConfigError::AirportMap {
            path: "<builtin>".to_string(),
            reason,
        })
    }

    /// Built-in table with the entries from `path` layered on top
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut map = Self::builtin()?;
        let overrides = std::fs::read_to_string(path)
            .context("Failed to read airport map")
            .and_then(|raw| Self::from_json(&raw))
            .map_err(|reason| ConfigError::AirportMap {
                path: path.display().to_string(),
                reason,
            })?;
        map.extend(overrides);
        Ok(map)
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let entries: HashMap<String, String> =
            serde_json::from_str(raw).context("Airport map must be a JSON object of strings")?;
        Ok(Self { entries })
    }

    pub fn extend(&mut self, other: AirportMap) {
        self.entries.extend(other.entries);
    }

    /// Canonical label for `name`, or the trimmed name itself when unmapped
    pub fn canonical(&self, name: &str) -> String {
        let trimmed = name.trim();
        self.entries
            .get(trimmed)
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
