//! High-level export API.
//!
//! Entry points for turning a report payload, or a JSON document holding
//! one, into the bytes of a downloadable CSV file.

use std::fs;
use std::path::Path;

use serde_json::error::Category;

use crate::error::ReportCsvError;
use crate::model::ReportPayload;
use crate::options::CsvOptions;
use crate::render::HierarchicalRenderer;
use crate::translate::Translator;
use crate::Result;

/// Content type announced for exported files.
pub const CONTENT_TYPE: &str = "application/vnd.ms-excel";

/// Render a payload with the given options.
pub fn export(payload: &ReportPayload, options: &CsvOptions, translator: &dyn Translator) -> Vec<u8> {
    HierarchicalRenderer::new(options, translator).render(payload)
}

/// Parse a JSON report document. `origin` only labels errors.
///
/// Malformed JSON is [`ReportCsvError::InvalidJson`]; well-formed JSON of
/// the wrong shape is [`ReportCsvError::NotAReport`].
pub fn parse_report(text: &str, origin: &Path) -> Result<ReportPayload> {
    serde_json::from_str(text).map_err(|source| {
        let path = origin.to_path_buf();
        match source.classify() {
            Category::Data => ReportCsvError::NotAReport { path, source },
            _ => ReportCsvError::InvalidJson { path, source },
        }
    })
}

/// Read and parse a JSON report document.
pub fn load_report(path: impl AsRef<Path>) -> Result<ReportPayload> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ReportCsvError::PathNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| ReportCsvError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_report(&text, path)
}

/// Load a JSON report and render it.
///
/// # Example
///
/// ```rust,ignore
/// use reportcsvlib::{export_file, CsvOptions, RawNames};
///
/// let bytes = export_file("visits.json", &CsvOptions::new().convert_to_unicode(false), &RawNames)?;
/// ```
pub fn export_file(
    path: impl AsRef<Path>,
    options: &CsvOptions,
    translator: &dyn Translator,
) -> Result<Vec<u8>> {
    options.validate()?;
    let payload = load_report(path)?;
    Ok(export(&payload, options, translator))
}

/// File name offered for download, e.g. `Export _ Visits Summary _ March 2024.csv`.
pub fn suggested_file_name(
    translator: &dyn Translator,
    report_name: &str,
    period: Option<&str>,
) -> String {
    let export_word = translator.export_label();
    match period {
        Some(period) if !period.is_empty() => {
            format!("{} _ {} _ {}.csv", export_word, report_name, period)
        }
        _ => format!("{}.csv", export_word),
    }
}
