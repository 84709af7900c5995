use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::log_warn;

const ENABLE_LOGS: bool = true;

/// Tunables for the ingestion pipeline.
///
/// Every field has a default so a partial (or missing) settings file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestSettings {
    /// Vertical distance (layout units) under which tokens share a visual line.
    pub line_y_tolerance: f32,
    /// Minimum distinct weekday labels for a row to count as the header.
    pub min_day_columns: usize,
    /// Weekday (1 = Mon) given to classes whose column cannot be inferred.
    pub default_day_of_week: u8,
    /// Run the clash-avoiding weekday resolver when layout gave no varied days.
    pub resolve_weekdays: bool,
    /// Non-empty lines searched below a holiday title for its date.
    pub holiday_lookahead_lines: usize,
    pub title_max_chars: usize,
    pub notes_max_chars: usize,
    /// Cap on the derived suffix used to namespace colliding class variants.
    pub variant_suffix_max: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            line_y_tolerance: 2.0,
            min_day_columns: 3,
            default_day_of_week: 1,
            resolve_weekdays: true,
            holiday_lookahead_lines: 3,
            title_max_chars: 180,
            notes_max_chars: 1000,
            variant_suffix_max: 64,
        }
    }
}

impl IngestSettings {
    fn sanitized(mut self) -> Self {
        if !(1..=7).contains(&self.default_day_of_week) {
            self.default_day_of_week = 1;
        }
        if !(self.line_y_tolerance > 0.0) {
            self.line_y_tolerance = 2.0;
        }
        self.min_day_columns = self.min_day_columns.max(1);
        self
    }
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<IngestSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<IngestSettings>(&contents) {
                Ok(settings) => settings.sanitized(),
                Err(err) => {
                    log_warn!(
                        "Ignoring malformed settings file {}: {err}",
                        path.display()
                    );
                    IngestSettings::default()
                }
            }
        } else {
            IngestSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Store that never touches disk.
    pub fn in_memory(settings: IngestSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(settings.sanitized()),
        }
    }

    pub fn current(&self) -> IngestSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: IngestSettings) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))?;
        *guard = settings.sanitized();
        self.persist(&guard)
    }

    fn persist(&self, data: &IngestSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "defaultDayOfWeek": 3 }"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        let settings = store.current();
        assert_eq!(settings.default_day_of_week, 3);
        assert_eq!(settings.line_y_tolerance, 2.0);
        assert!(settings.resolve_weekdays);
    }

    #[test]
    fn out_of_range_day_falls_back_to_monday() {
        let store = SettingsStore::in_memory(IngestSettings {
            default_day_of_week: 9,
            ..IngestSettings::default()
        });
        assert_eq!(store.current().default_day_of_week, 1);
    }

    #[test]
    fn update_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut next = store.current();
        next.resolve_weekdays = false;
        store.update(next).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert!(!reloaded.current().resolve_weekdays);
    }
}
