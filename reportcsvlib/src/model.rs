//! In-memory report tree: scalars, rows, tables and labeled collections.
//!
//! The tree is produced by whatever runs the report query and handed to the
//! renderer as read-only input. Everything here is plain data with serde
//! support so reports can be read from JSON documents.
//!
//! JSON shapes:
//!
//! - Table: `{"rows": [ ... ]}`
//! - Row: `{"columns": {...}, "metadata": {...}, "subtable_id": 12}`
//! - Collection: `{"key_name": "date", "entries": {"2020-01-01": <table or collection>}}`
//! - Upstream failure: `{"error": "message"}`
//!
//! Object key order is preserved, so columns come out in document order.

use std::fmt;

use linked_hash_map::LinkedHashMap;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single cell value.
///
/// `Bool(false)` is the "absent" marker some reports use instead of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl Scalar {
    /// The empty-string value used to pad missing columns.
    pub fn empty() -> Self {
        Scalar::Str(String::new())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

/// Inner map of a two-level nested value, e.g. `{"nb_conversions": 5, "revenue": 10}`.
pub type SubColumns = LinkedHashMap<String, Scalar>;

/// The value held by one column slot of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A plain cell
    Scalar(Scalar),
    /// `name -> {key: scalar}`; carries no expandable structure
    FlatMap(LinkedHashMap<String, Scalar>),
    /// `name -> {key -> {sub_key: scalar}}`, e.g. per-goal metrics
    NestedMap(LinkedHashMap<String, SubColumns>),
}

impl Value {
    /// Build a nested value from `(key, [(sub_key, value)])` pairs.
    pub fn nested<K, S, V, I, J>(entries: I) -> Self
    where
        K: Into<String>,
        S: Into<String>,
        V: Into<Scalar>,
        I: IntoIterator<Item = (K, J)>,
        J: IntoIterator<Item = (S, V)>,
    {
        Value::NestedMap(
            entries
                .into_iter()
                .map(|(key, subs)| {
                    let subs = subs
                        .into_iter()
                        .map(|(sub_key, value)| (sub_key.into(), value.into()))
                        .collect();
                    (key.into(), subs)
                })
                .collect(),
        )
    }

    /// Build a one-level map value.
    pub fn flat<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Scalar>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::FlatMap(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Scalar(value.into())
                }
            }
        )*
    };
}

value_from_scalar!(Scalar, bool, i32, i64, u32, f64, &str, String);

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(scalar) => scalar.serialize(serializer),
            Value::FlatMap(map) => map.serialize(serializer),
            Value::NestedMap(map) => map.serialize(serializer),
        }
    }
}

/// Shape of a column value as it appears in a JSON document.
///
/// Arrays are positional maps (`[a, b]` reads as `{"0": a, "1": b}`).
/// Anything deeper than two levels is accepted here and dropped later.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Scalar(Scalar),
    Map(LinkedHashMap<String, RawEntry>),
    List(Vec<RawEntry>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Scalar(Scalar),
    Map(LinkedHashMap<String, RawLeaf>),
    List(Vec<RawLeaf>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLeaf {
    Scalar(Scalar),
    TooDeep(IgnoredAny),
}

fn positional<T>(items: Vec<T>) -> impl Iterator<Item = (String, T)> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| (index.to_string(), item))
}

fn sub_columns(key: &str, leaves: impl Iterator<Item = (String, RawLeaf)>) -> SubColumns {
    leaves
        .filter_map(|(sub_key, leaf)| match leaf {
            RawLeaf::Scalar(scalar) => Some((sub_key, scalar)),
            RawLeaf::TooDeep(_) => {
                tracing::debug!(
                    key = %key,
                    sub_key = %sub_key,
                    "dropping value nested too deep for a cell"
                );
                None
            }
        })
        .collect()
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<(String, RawEntry)> = match RawValue::deserialize(deserializer)? {
            RawValue::Scalar(scalar) => return Ok(Value::Scalar(scalar)),
            RawValue::Map(map) => map.into_iter().collect(),
            RawValue::List(list) => positional(list).collect(),
        };

        if entries.iter().all(|(_, entry)| matches!(entry, RawEntry::Scalar(_))) {
            let flat = entries
                .into_iter()
                .filter_map(|(key, entry)| match entry {
                    RawEntry::Scalar(scalar) => Some((key, scalar)),
                    _ => None,
                })
                .collect();
            return Ok(Value::FlatMap(flat));
        }

        let mut nested = LinkedHashMap::new();
        for (key, entry) in entries {
            let subs = match entry {
                RawEntry::Map(map) => sub_columns(&key, map.into_iter()),
                RawEntry::List(list) => sub_columns(&key, positional(list)),
                RawEntry::Scalar(_) => {
                    tracing::debug!(key = %key, "dropping scalar entry inside nested column value");
                    continue;
                }
            };
            nested.insert(key, subs);
        }
        Ok(Value::NestedMap(nested))
    }
}

/// Metadata keeps scalar entries; structured ones have no cell to go into.
fn scalar_metadata<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<LinkedHashMap<String, Scalar>, D::Error> {
    let raw = LinkedHashMap::<String, RawLeaf>::deserialize(deserializer)?;
    Ok(sub_columns("metadata", raw.into_iter()))
}

/// Key of a primary column.
///
/// Rows built from positional arrays carry index keys instead of names; a
/// table whose only column is an index has no printable header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnKey {
    Name(String),
    Index(u64),
}

impl ColumnKey {
    /// Interpret a document key: canonical non-negative integers become
    /// indexes, everything else is a name.
    pub fn parse(key: &str) -> Self {
        let canonical = !key.is_empty()
            && key.bytes().all(|b| b.is_ascii_digit())
            && (key == "0" || !key.starts_with('0'));
        match key.parse::<u64>() {
            Ok(index) if canonical => ColumnKey::Index(index),
            _ => ColumnKey::Name(key.to_string()),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, ColumnKey::Index(_))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Name(name) => f.write_str(name),
            ColumnKey::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for ColumnKey {
    fn from(name: &str) -> Self {
        ColumnKey::Name(name.to_string())
    }
}

impl From<String> for ColumnKey {
    fn from(name: String) -> Self {
        ColumnKey::Name(name)
    }
}

impl From<u64> for ColumnKey {
    fn from(index: u64) -> Self {
        ColumnKey::Index(index)
    }
}

impl Serialize for ColumnKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColumnKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(ColumnKey::parse(&key))
    }
}

/// One report row: primary columns, metadata and an optional child-table reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Primary columns in declaration order
    #[serde(default)]
    pub columns: LinkedHashMap<ColumnKey, Value>,
    /// Row metadata (urls, logos, segment definitions...)
    #[serde(
        default,
        deserialize_with = "scalar_metadata",
        skip_serializing_if = "LinkedHashMap::is_empty"
    )]
    pub metadata: LinkedHashMap<String, Scalar>,
    /// Id of the sub-table holding this row's breakdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtable_id: Option<i64>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a primary column
    pub fn column(mut self, key: impl Into<ColumnKey>, value: impl Into<Value>) -> Self {
        self.columns.insert(key.into(), value.into());
        self
    }

    /// Builder: add a metadata entry
    pub fn metadata(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Builder: attach a sub-table reference
    pub fn subtable(mut self, id: i64) -> Self {
        self.subtable_id = Some(id);
        self
    }
}

/// A rectangular report: an ordered list of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Row>,
    /// Single-metric report; a lone cell is written in the short form
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simple: bool,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty single-metric table.
    pub fn new_simple() -> Self {
        Self {
            rows: Vec::new(),
            simple: true,
        }
    }

    /// Builder: append a row
    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The lone scalar of a single-metric table holding one row and one column.
    pub fn simple_value(&self) -> Option<&Scalar> {
        if !self.simple {
            return None;
        }
        match self.rows.as_slice() {
            [row] if row.columns.len() == 1 => row.columns.values().next()?.as_scalar(),
            _ => None,
        }
    }
}

/// Tables (or nested collections) keyed by a label such as a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCollection {
    /// Header of the synthetic label column, e.g. `date`
    pub key_name: String,
    /// Children in iteration order
    pub entries: LinkedHashMap<String, DataNode>,
}

impl TableCollection {
    pub fn new(key_name: impl Into<String>) -> Self {
        Self {
            key_name: key_name.into(),
            entries: LinkedHashMap::new(),
        }
    }

    /// Builder: append a labeled child
    pub fn entry(mut self, label: impl Into<String>, node: impl Into<DataNode>) -> Self {
        self.entries.insert(label.into(), node.into());
        self
    }
}

/// Either a leaf table or a collection of further nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataNode {
    Collection(TableCollection),
    Table(Table),
}

impl From<Table> for DataNode {
    fn from(table: Table) -> Self {
        DataNode::Table(table)
    }
}

impl From<TableCollection> for DataNode {
    fn from(collection: TableCollection) -> Self {
        DataNode::Collection(collection)
    }
}

/// What the report builder hands over: data, or the reason it has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportPayload {
    Failure { error: String },
    Data(DataNode),
}

impl ReportPayload {
    pub fn failure(message: impl Into<String>) -> Self {
        ReportPayload::Failure {
            error: message.into(),
        }
    }
}

impl From<DataNode> for ReportPayload {
    fn from(node: DataNode) -> Self {
        ReportPayload::Data(node)
    }
}

impl From<Table> for ReportPayload {
    fn from(table: Table) -> Self {
        ReportPayload::Data(table.into())
    }
}

impl From<TableCollection> for ReportPayload {
    fn from(collection: TableCollection) -> Self {
        ReportPayload::Data(collection.into())
    }
}
