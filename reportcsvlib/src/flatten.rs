//! Column discovery and row flattening for a single table.
//!
//! Rows of one table do not share a fixed schema: each row may carry its own
//! columns, nested per-goal metrics and metadata. [`ColumnFlattener`] walks
//! every row, expands nested values into synthetic columns, collects the
//! union of all column names (in first-seen order) and pads each record so
//! every record holds every column.

use linked_hash_map::LinkedHashMap;

use crate::model::{ColumnKey, Row, Scalar, Table, Value};
use crate::options::CsvOptions;
use crate::translate::Translator;

/// Metadata entry that is internal bookkeeping and never exported.
pub const INTERNAL_SUBTABLE_METADATA: &str = "idsubdatatable_in_db";

/// Column holding the row's sub-table id.
pub const SUBTABLE_ID_COLUMN: &str = "idsubdatatable";

/// Prefix of metadata columns when names are not translated.
pub const METADATA_PREFIX: &str = "metadata_";

/// Column whose nested keys are goal ids.
pub const GOALS_COLUMN: &str = "goals";

/// One flattened row: column → raw value.
pub type Record = LinkedHashMap<ColumnKey, Scalar>;

/// A table reduced to a fixed column list and one complete record per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTable {
    /// Discovered columns in first-seen order
    pub columns: Vec<ColumnKey>,
    /// One record per input row, each holding every column
    pub records: Vec<Record>,
}

impl FlatTable {
    /// True when there is nothing printable: no rows, or no named column.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.records.is_empty()
    }

    /// Values of a record in column order.
    pub fn values<'r>(&'r self, record: &'r Record) -> impl Iterator<Item = &'r Scalar> + 'r {
        self.columns.iter().filter_map(move |column| record.get(column))
    }
}

/// Turns a [`Table`] into a [`FlatTable`].
pub struct ColumnFlattener<'a> {
    options: &'a CsvOptions,
    translator: &'a dyn Translator,
}

impl<'a> ColumnFlattener<'a> {
    pub fn new(options: &'a CsvOptions, translator: &'a dyn Translator) -> Self {
        Self {
            options,
            translator,
        }
    }

    /// Discover the table's columns and build one padded record per row.
    pub fn flatten(&self, table: &Table) -> FlatTable {
        let mut columns: LinkedHashMap<ColumnKey, ()> = LinkedHashMap::new();
        let mut records = Vec::with_capacity(table.rows.len());

        for row in &table.rows {
            let record = self.flatten_row(row);
            for column in record.keys() {
                if !columns.contains_key(column) {
                    columns.insert(column.clone(), ());
                }
            }
            records.push(record);
        }

        let columns: Vec<ColumnKey> = columns.into_iter().map(|(column, _)| column).collect();

        // A lone positional column has no name worth printing.
        if let [only] = columns.as_slice() {
            if only.is_index() {
                tracing::trace!("single unnamed column, nothing to export");
                return FlatTable::default();
            }
        }

        for record in &mut records {
            for column in &columns {
                if !record.contains_key(column) {
                    record.insert(column.clone(), Scalar::empty());
                }
            }
        }

        FlatTable { columns, records }
    }

    fn flatten_row(&self, row: &Row) -> Record {
        let mut record = Record::new();

        for (key, value) in &row.columns {
            match value {
                Value::Scalar(scalar) => {
                    record.insert(key.clone(), scalar.clone());
                }
                Value::FlatMap(entries) => {
                    tracing::debug!(
                        column = %key,
                        entries = entries.len(),
                        "skipping one-level nested value"
                    );
                }
                Value::NestedMap(groups) => {
                    let name = key.to_string();
                    for (group, subs) in groups {
                        for (sub_key, sub_value) in subs {
                            let column = self.synthetic_name(&name, group, sub_key);
                            record.insert(ColumnKey::Name(column), sub_value.clone());
                        }
                    }
                }
            }
        }

        if self.options.export_metadata {
            for (name, value) in &row.metadata {
                if name == INTERNAL_SUBTABLE_METADATA {
                    continue;
                }
                let column = ColumnKey::Name(self.metadata_name(name));
                insert_last_wins(&mut record, column, value.clone());
            }
        }

        if self.options.export_subtable_id {
            if let Some(id) = row.subtable_id {
                let column = ColumnKey::from(SUBTABLE_ID_COLUMN);
                insert_last_wins(&mut record, column, Scalar::Int(id));
            }
        }

        record
    }

    /// Name of the column produced by `name[group][sub_key]`.
    fn synthetic_name(&self, name: &str, group: &str, sub_key: &str) -> String {
        if self.options.translate_column_names {
            let group_label = if name == GOALS_COLUMN {
                self.translator.goal_label(group)
            } else {
                format!("{} {}", name, group)
            };
            format!("{} ({})", self.translator.column_name(sub_key), group_label)
        } else {
            format!("{}_{}_{}", name, group, sub_key)
        }
    }

    fn metadata_name(&self, name: &str) -> String {
        if self.options.translate_column_names {
            format!("{}: {}", self.translator.metadata_label(), name)
        } else {
            format!("{}{}", METADATA_PREFIX, name)
        }
    }
}

/// Insert a non-data column; an existing column of that name is replaced.
fn insert_last_wins(record: &mut Record, column: ColumnKey, value: Scalar) {
    match record.get_mut(&column) {
        Some(slot) => {
            tracing::warn!(
                column = %column,
                previous = ?slot,
                "column name collision, keeping the later value"
            );
            *slot = value;
        }
        None => {
            record.insert(column, value);
        }
    }
}
