//! Export options.
//!
//! All knobs that shape the delimited output live in [`CsvOptions`]. Options
//! are set before a render and never change during one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::ReportCsvError;
use crate::Result;

/// Line terminator written between records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

impl FromStr for LineEnding {
    type Err = ReportCsvError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lf" | "\n" | "unix" => Ok(LineEnding::Lf),
            "crlf" | "\r\n" | "windows" => Ok(LineEnding::CrLf),
            _ => Err(ReportCsvError::InvalidOption(format!(
                "unknown line ending: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEnding::Lf => f.write_str("lf"),
            LineEnding::CrLf => f.write_str("crlf"),
        }
    }
}

/// How a collection builds its header from its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderMode {
    /// Use the header of the first non-empty child; later children's rows
    /// are written as they are.
    #[default]
    FirstWins,
    /// Union of all children's headers in first-seen order; rows are padded
    /// so every field lines up under its own column.
    Union,
}

impl FromStr for HeaderMode {
    type Err = ReportCsvError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-wins" | "first" => Ok(HeaderMode::FirstWins),
            "union" => Ok(HeaderMode::Union),
            _ => Err(ReportCsvError::InvalidOption(format!(
                "unknown header mode: {}",
                s
            ))),
        }
    }
}

/// Options for rendering a report as delimited text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter
    pub separator: String,
    /// Record terminator
    pub line_ending: LineEnding,
    /// Export row metadata as extra columns
    pub export_metadata: bool,
    /// Export the sub-table reference as an `idsubdatatable` column
    pub export_subtable_id: bool,
    /// Use display names instead of raw column names
    pub translate_column_names: bool,
    /// Emit UTF-16LE with a byte-order mark instead of UTF-8
    pub convert_to_unicode: bool,
    /// Header strategy for collections
    pub header_mode: HeaderMode,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            line_ending: LineEnding::Lf,
            export_metadata: true,
            export_subtable_id: true,
            translate_column_names: false,
            convert_to_unicode: true,
            header_mode: HeaderMode::FirstWins,
        }
    }
}

impl CsvOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the field delimiter
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Builder: set the record terminator
    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Builder: toggle metadata columns
    pub fn export_metadata(mut self, export: bool) -> Self {
        self.export_metadata = export;
        self
    }

    /// Builder: toggle the `idsubdatatable` column
    pub fn export_subtable_id(mut self, export: bool) -> Self {
        self.export_subtable_id = export;
        self
    }

    /// Builder: toggle display names
    pub fn translate_column_names(mut self, translate: bool) -> Self {
        self.translate_column_names = translate;
        self
    }

    /// Builder: toggle UTF-16LE output
    pub fn convert_to_unicode(mut self, convert: bool) -> Self {
        self.convert_to_unicode = convert;
        self
    }

    /// Builder: set the collection header strategy
    pub fn header_mode(mut self, mode: HeaderMode) -> Self {
        self.header_mode = mode;
        self
    }

    /// Reject separators that cannot round-trip through a CSV reader.
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(ReportCsvError::InvalidOption(
                "separator must not be empty".to_string(),
            ));
        }
        if self.separator.contains(['"', '\n', '\r']) {
            return Err(ReportCsvError::InvalidOption(format!(
                "separator {:?} must not contain quotes or line breaks",
                self.separator
            )));
        }
        Ok(())
    }

    /// Load options from a JSON document; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReportCsvError::PathNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ReportCsvError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let options: CsvOptions =
            serde_json::from_str(&text).map_err(|source| ReportCsvError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let options = CsvOptions::default();
        assert_eq!(options.separator, ",");
        assert_eq!(options.line_ending, LineEnding::Lf);
        assert!(options.export_metadata);
        assert!(options.export_subtable_id);
        assert!(!options.translate_column_names);
        assert!(options.convert_to_unicode);
        assert_eq!(options.header_mode, HeaderMode::FirstWins);
    }

    #[test]
    fn test_builder() {
        let options = CsvOptions::new()
            .separator(";")
            .line_ending(LineEnding::CrLf)
            .export_metadata(false)
            .convert_to_unicode(false)
            .header_mode(HeaderMode::Union);
        assert_eq!(options.separator, ";");
        assert_eq!(options.line_ending.as_str(), "\r\n");
        assert!(!options.export_metadata);
        assert!(!options.convert_to_unicode);
        assert_eq!(options.header_mode, HeaderMode::Union);
    }

    #[test]
    fn test_validate() {
        assert!(CsvOptions::new().validate().is_ok());
        assert!(CsvOptions::new().separator("\t").validate().is_ok());
        assert!(CsvOptions::new().separator("").validate().is_err());
        assert!(CsvOptions::new().separator("\"").validate().is_err());
        assert!(CsvOptions::new().separator("\n").validate().is_err());
    }

    #[test]
    fn test_line_ending_from_str() {
        assert_eq!(LineEnding::from_str("lf").unwrap(), LineEnding::Lf);
        assert_eq!(LineEnding::from_str("CRLF").unwrap(), LineEnding::CrLf);
        assert_eq!(LineEnding::from_str("\r\n").unwrap(), LineEnding::CrLf);
        assert!(LineEnding::from_str("cr").is_err());
    }

    #[test]
    fn test_header_mode_from_str() {
        assert_eq!(HeaderMode::from_str("first-wins").unwrap(), HeaderMode::FirstWins);
        assert_eq!(HeaderMode::from_str("union").unwrap(), HeaderMode::Union);
        assert!(HeaderMode::from_str("merge").is_err());
    }

    #[test]
    fn test_from_json_file_partial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(
            &path,
            r#"{"separator": ";", "line_ending": "crlf", "header_mode": "union"}"#,
        )
        .unwrap();

        let options = CsvOptions::from_json_file(&path).unwrap();
        assert_eq!(options.separator, ";");
        assert_eq!(options.line_ending, LineEnding::CrLf);
        assert_eq!(options.header_mode, HeaderMode::Union);
        assert!(options.export_metadata);
    }

    #[test]
    fn test_from_json_file_rejects_bad_separator() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"separator": ""}"#).unwrap();
        assert!(matches!(
            CsvOptions::from_json_file(&path),
            Err(ReportCsvError::InvalidOption(_))
        ));
    }
}
