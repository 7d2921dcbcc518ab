//! # reportcsvlib
//!
//! Flattens hierarchical analytics reports into delimited text that
//! spreadsheets can open.
//!
//! ## Overview
//!
//! A report is a tree: leaf [`Table`]s of rows, optionally grouped into
//! labeled [`TableCollection`]s (one table per date, per segment, ...).
//! Rows do not share a fixed schema. A row may carry its own columns,
//! per-goal metrics nested two levels deep, metadata and a reference to a
//! sub-table. Export turns all of that into one rectangular CSV:
//!
//! - **Column discovery**: the header is the union of all columns seen, in
//!   first-seen order; missing cells are written empty
//! - **Nested expansion**: `goals = {"idgoal=1": {"nb_conversions": 5}}`
//!   becomes a `goals_idgoal=1_nb_conversions` column
//! - **Metadata**: exported as `metadata_*` columns
//! - **Collections**: each child's lines are prefixed with its label, and the
//!   collection's key name heads the label column
//! - **Formatting**: quoting, HTML-entity decoding, locale-independent numbers
//! - **Encoding**: optional UTF-16LE with byte-order mark for spreadsheet import
//!
//! Pipeline: [`HierarchicalRenderer`] → [`ColumnFlattener`] →
//! [`ValueFormatter`] → [`DelimitedWriter`].
//!
//! ## Example
//!
//! ```rust
//! use reportcsvlib::{export, CsvOptions, RawNames, ReportPayload, Row, Table, TableCollection};
//!
//! let day = |visits: i64| Table::new().row(Row::new().column("nb_visits", visits));
//! let report = TableCollection::new("date")
//!     .entry("2020-01-01", day(10))
//!     .entry("2020-01-02", day(20));
//!
//! let options = CsvOptions::new().convert_to_unicode(false);
//! let bytes = export(&ReportPayload::from(report), &options, &RawNames);
//! assert_eq!(
//!     String::from_utf8(bytes).unwrap(),
//!     "date,nb_visits\n2020-01-01,10\n2020-01-02,20"
//! );
//! ```

pub mod entities;
pub mod error;
pub mod export;
pub mod flatten;
pub mod format;
pub mod model;
pub mod options;
pub mod render;
pub mod translate;
pub mod writer;

pub use entities::{decode_entities, HtmlEntities, Unsanitizer};
pub use error::ReportCsvError;
pub use export::{export, export_file, load_report, parse_report, suggested_file_name, CONTENT_TYPE};
pub use flatten::{ColumnFlattener, FlatTable, Record};
pub use format::{looks_numeric, ValueFormatter};
pub use model::{ColumnKey, DataNode, ReportPayload, Row, Scalar, Table, TableCollection, Value};
pub use options::{CsvOptions, HeaderMode, LineEnding};
pub use render::{HierarchicalRenderer, NO_DATA_MESSAGE};
pub use translate::{Dictionary, RawNames, Translator};
pub use writer::{to_utf16le, Block, DelimitedWriter};

/// Result type for reportcsvlib operations
pub type Result<T> = std::result::Result<T, ReportCsvError>;
