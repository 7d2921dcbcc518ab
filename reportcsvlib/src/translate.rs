//! Display names for columns.
//!
//! Exports can use raw machine names (`nb_visits`) or human-readable labels
//! looked up in a translation dictionary. The renderer only talks to the
//! [`Translator`] trait; [`RawNames`] and [`Dictionary`] are the two
//! implementations shipped here.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ReportCsvError;
use crate::Result;

/// Dictionary key of the "Goal %s" phrase.
pub const GOAL_LABEL_KEY: &str = "Goals_GoalX";

/// Dictionary key of the word prefixed to metadata columns.
pub const METADATA_LABEL_KEY: &str = "General_Metadata";

/// Dictionary key of the word used in download file names.
pub const EXPORT_LABEL_KEY: &str = "General_Export";

/// Name-translation lookup used when column names are translated.
pub trait Translator {
    /// Display name of a column, or the name itself when unknown.
    fn column_name(&self, name: &str) -> String;

    /// Label of one goal inside a `goals` column (e.g. "Goal 3").
    fn goal_label(&self, goal_key: &str) -> String;

    /// Word prefixed to metadata columns (e.g. "Metadata").
    fn metadata_label(&self) -> String;

    /// Word used to name exported files (e.g. "Export").
    fn export_label(&self) -> String {
        "Export".to_string()
    }
}

/// Identity translation with English phrases.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawNames;

impl Translator for RawNames {
    fn column_name(&self, name: &str) -> String {
        name.to_string()
    }

    fn goal_label(&self, goal_key: &str) -> String {
        format!("Goal {}", goal_key)
    }

    fn metadata_label(&self) -> String {
        "Metadata".to_string()
    }
}

/// Key → display string table, typically loaded from a JSON object.
///
/// Unknown keys fall back to [`RawNames`].
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: HashMap<String, String>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add one translation
    pub fn with(mut self, key: impl Into<String>, display: impl Into<String>) -> Self {
        self.entries.insert(key.into(), display.into());
        self
    }

    /// Load a flat JSON object of `key: display` pairs.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReportCsvError::PathNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ReportCsvError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|source| ReportCsvError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded translations");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl Translator for Dictionary {
    fn column_name(&self, name: &str) -> String {
        self.lookup(name)
            .map(str::to_string)
            .unwrap_or_else(|| RawNames.column_name(name))
    }

    fn goal_label(&self, goal_key: &str) -> String {
        match self.lookup(GOAL_LABEL_KEY) {
            Some(phrase) if phrase.contains("%s") => phrase.replacen("%s", goal_key, 1),
            Some(phrase) => format!("{} {}", phrase, goal_key),
            None => RawNames.goal_label(goal_key),
        }
    }

    fn metadata_label(&self) -> String {
        self.lookup(METADATA_LABEL_KEY)
            .map(str::to_string)
            .unwrap_or_else(|| RawNames.metadata_label())
    }

    fn export_label(&self) -> String {
        self.lookup(EXPORT_LABEL_KEY)
            .map(str::to_string)
            .unwrap_or_else(|| RawNames.export_label())
    }
}
