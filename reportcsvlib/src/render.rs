//! Rendering of a whole report tree to delimited text.
//!
//! Leaf tables go through the [`ColumnFlattener`] and [`ValueFormatter`].
//! Collections render each child, prefix every child line with the child's
//! label and put the collection's key name in front of the header:
//!
//! ```text
//! date,nb_visits
//! 2020-01-01,10
//! 2020-01-02,20
//! ```
//!
//! Children that render to nothing contribute no lines. If nothing at all
//! is rendered the output is the [`NO_DATA_MESSAGE`] sentinel.

use std::collections::HashMap;

use crate::entities::{HtmlEntities, Unsanitizer};
use crate::flatten::ColumnFlattener;
use crate::format::ValueFormatter;
use crate::model::{DataNode, ReportPayload, Table, TableCollection};
use crate::options::{CsvOptions, HeaderMode};
use crate::translate::Translator;
use crate::writer::{encode, Block, DelimitedWriter};

/// Output used when a report holds no data.
pub const NO_DATA_MESSAGE: &str = "No data available";

/// Header of the one-cell short form.
pub const SIMPLE_VALUE_HEADER: &str = "value";

/// Prefix of the line written when the report builder failed.
pub const ERROR_PREFIX: &str = "Error: ";

/// Renders report trees with a fixed set of options.
pub struct HierarchicalRenderer<'a> {
    options: &'a CsvOptions,
    translator: &'a dyn Translator,
    unsanitizer: &'a dyn Unsanitizer,
}

impl<'a> HierarchicalRenderer<'a> {
    pub fn new(options: &'a CsvOptions, translator: &'a dyn Translator) -> Self {
        Self {
            options,
            translator,
            unsanitizer: &HtmlEntities,
        }
    }

    /// Builder: replace the entity decoder
    pub fn with_unsanitizer(mut self, unsanitizer: &'a dyn Unsanitizer) -> Self {
        self.unsanitizer = unsanitizer;
        self
    }

    /// Render a payload to its final bytes.
    ///
    /// Tabular output is re-encoded as UTF-16LE when `convert_to_unicode` is
    /// set. The no-data sentinel and error lines are always plain UTF-8.
    pub fn render(&self, payload: &ReportPayload) -> Vec<u8> {
        match payload {
            ReportPayload::Failure { error } => self.render_failure(error).into_bytes(),
            ReportPayload::Data(node) => match self.render_block(node) {
                Some(block) => {
                    let text = DelimitedWriter::from_options(self.options).write(&block);
                    encode(&text, self.options.convert_to_unicode)
                }
                None => NO_DATA_MESSAGE.as_bytes().to_vec(),
            },
        }
    }

    /// Render a tree to text, before any transcoding.
    pub fn render_text(&self, node: &DataNode) -> String {
        match self.render_block(node) {
            Some(block) => DelimitedWriter::from_options(self.options).write(&block),
            None => NO_DATA_MESSAGE.to_string(),
        }
    }

    /// The single error line for a failed report.
    pub fn render_failure(&self, message: &str) -> String {
        format!("{}{}", ERROR_PREFIX, self.unsanitizer.unsanitize(message))
    }

    /// The header fields the tree would be written with, if it has data.
    pub fn header(&self, node: &DataNode) -> Option<Vec<String>> {
        self.render_block(node).map(|block| block.header)
    }

    /// Render a node to a header and formatted lines; `None` when empty.
    pub fn render_block(&self, node: &DataNode) -> Option<Block> {
        match node {
            DataNode::Table(table) => self.render_table(table),
            DataNode::Collection(collection) => self.render_collection(collection),
        }
    }

    fn formatter(&self) -> ValueFormatter<'_> {
        ValueFormatter::new(&self.options.separator, self.unsanitizer)
    }

    fn display_name(&self, name: &str) -> String {
        if self.options.translate_column_names {
            self.translator.column_name(name)
        } else {
            name.to_string()
        }
    }

    fn render_table(&self, table: &Table) -> Option<Block> {
        let formatter = self.formatter();

        if let Some(value) = table.simple_value() {
            return Some(Block {
                header: vec![SIMPLE_VALUE_HEADER.to_string()],
                lines: vec![vec![formatter.format(value)]],
            });
        }

        let flat = ColumnFlattener::new(self.options, self.translator).flatten(table);
        if flat.is_empty() {
            return None;
        }

        let header = flat
            .columns
            .iter()
            .map(|column| formatter.quote(&self.display_name(&column.to_string())))
            .collect();
        let lines = flat
            .records
            .iter()
            .map(|record| flat.values(record).map(|v| formatter.format(v)).collect())
            .collect();

        tracing::trace!(
            columns = flat.columns.len(),
            rows = flat.records.len(),
            "rendered table"
        );
        Some(Block { header, lines })
    }

    fn render_collection(&self, collection: &TableCollection) -> Option<Block> {
        let formatter = self.formatter();

        let mut children = Vec::with_capacity(collection.entries.len());
        for (label, child) in &collection.entries {
            match self.render_block(child) {
                Some(block) if !block.lines.is_empty() => {
                    children.push((formatter.quote(label), block));
                }
                _ => tracing::trace!(label = %label, "empty entry, no lines written"),
            }
        }

        let (header, lines) = match self.options.header_mode {
            HeaderMode::FirstWins => first_wins(children)?,
            HeaderMode::Union => union(children)?,
        };

        let key_name = formatter.quote(&self.display_name(&collection.key_name));
        let mut full_header = Vec::with_capacity(header.len() + 1);
        full_header.push(key_name);
        full_header.extend(header);

        Some(Block {
            header: full_header,
            lines,
        })
    }
}

type LabeledBlocks = Vec<(String, Block)>;

fn prefixed(label: &str, line: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(line.len() + 1);
    out.push(label.to_string());
    out.extend(line);
    out
}

/// Keep the first child's header; every child's lines are written as-is.
fn first_wins(children: LabeledBlocks) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let mut header: Option<Vec<String>> = None;
    let mut lines = Vec::new();

    for (label, block) in children {
        match &header {
            None => header = Some(block.header),
            Some(captured) if *captured != block.header => {
                tracing::debug!(
                    label = %label,
                    expected = captured.len(),
                    found = block.header.len(),
                    "entry header differs from the first entry's header"
                );
            }
            Some(_) => {}
        }
        lines.extend(block.lines.into_iter().map(|line| prefixed(&label, line)));
    }

    header.map(|header| (header, lines))
}

/// Merge every child's header and re-align each line under it.
fn union(children: LabeledBlocks) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    if children.is_empty() {
        return None;
    }

    let mut header: Vec<String> = Vec::new();
    for (_, block) in &children {
        for name in &block.header {
            if !header.contains(name) {
                header.push(name.clone());
            }
        }
    }

    let mut lines = Vec::new();
    for (label, block) in children {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (index, name) in block.header.iter().enumerate() {
            positions.entry(name.as_str()).or_insert(index);
        }
        for line in &block.lines {
            let aligned = header
                .iter()
                .map(|name| {
                    positions
                        .get(name.as_str())
                        .and_then(|&index| line.get(index))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();
            lines.push(prefixed(&label, aligned));
        }
    }

    Some((header, lines))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Row, Value};
    use crate::translate::{Dictionary, RawNames};

    fn plain() -> CsvOptions {
        CsvOptions::default().convert_to_unicode(false)
    }

    fn text(node: impl Into<DataNode>, options: &CsvOptions) -> String {
        HierarchicalRenderer::new(options, &RawNames).render_text(&node.into())
    }

    fn visits(count: i64) -> Table {
        Table::new().row(Row::new().column("label", "all").column("nb_visits", count))
    }

    #[test]
    fn test_leaf_table() {
        let table = Table::new()
            .row(Row::new().column("label", "home").column("nb_visits", 10))
            .row(Row::new().column("label", "about").column("nb_visits", 3));
        assert_eq!(
            text(table, &plain()),
            "label,nb_visits\nhome,10\nabout,3"
        );
    }

    #[test]
    fn test_simple_table_short_form() {
        let table = Table::new_simple().row(Row::new().column("nb_visits", 12.5));
        assert_eq!(text(table, &plain()), "value\n12.5");
    }

    #[test]
    fn test_regular_single_cell_table_keeps_its_header() {
        let table = Table::new().row(Row::new().column("nb_visits", 12));
        assert_eq!(text(table, &plain()), "nb_visits\n12");
    }

    #[test]
    fn test_simple_table_with_nested_value_is_flattened() {
        let table = Table::new_simple().row(
            Row::new().column("goals", Value::nested([("idgoal=1", [("nb_conversions", 5)])])),
        );
        assert_eq!(text(table, &plain()), "goals_idgoal=1_nb_conversions\n5");
    }

    #[test]
    fn test_collection_prefixing() {
        let single = |n: i64| Table::new().row(Row::new().column("nb_visits", n));
        let collection = TableCollection::new("date")
            .entry("2020-01-01", single(10))
            .entry("2020-01-02", single(20));
        assert_eq!(
            text(collection, &plain()),
            "date,nb_visits\n2020-01-01,10\n2020-01-02,20"
        );
    }

    #[test]
    fn test_collection_of_simple_tables() {
        let simple = |n: i64| Table::new_simple().row(Row::new().column("nb_visits", n));
        let collection = TableCollection::new("date")
            .entry("2020-01-01", simple(10))
            .entry("2020-01-02", simple(20));
        assert_eq!(
            text(collection, &plain()),
            "date,value\n2020-01-01,10\n2020-01-02,20"
        );
    }

    #[test]
    fn test_empty_child_suppressed() {
        let collection = TableCollection::new("date")
            .entry("2020-01-01", visits(10))
            .entry("2020-01-02", Table::new())
            .entry("2020-01-03", visits(30));
        assert_eq!(
            text(collection, &plain()),
            "date,label,nb_visits\n2020-01-01,all,10\n2020-01-03,all,30"
        );
    }

    #[test]
    fn test_header_taken_from_first_non_empty_child() {
        let collection = TableCollection::new("date")
            .entry("2020-01-01", Table::new())
            .entry("2020-01-02", visits(5));
        assert_eq!(
            text(collection, &plain()),
            "date,label,nb_visits\n2020-01-02,all,5"
        );
    }

    #[test]
    fn test_nested_collections() {
        let inner = |n: i64| {
            TableCollection::new("segment")
                .entry("mobile", visits(n))
                .entry("desktop", visits(n + 1))
        };
        let outer = TableCollection::new("date")
            .entry("2020-01-01", inner(1))
            .entry("2020-01-02", inner(3));
        assert_eq!(
            text(outer, &plain()),
            "date,segment,label,nb_visits\n\
             2020-01-01,mobile,all,1\n\
             2020-01-01,desktop,all,2\n\
             2020-01-02,mobile,all,3\n\
             2020-01-02,desktop,all,4"
        );
    }

    #[test]
    fn test_first_wins_keeps_heterogeneous_rows_unaligned() {
        let collection = TableCollection::new("date")
            .entry("d1", Table::new().row(Row::new().column("a", 1).column("b", 2)))
            .entry("d2", Table::new().row(Row::new().column("b", 3).column("c", 4)));
        assert_eq!(text(collection, &plain()), "date,a,b\nd1,1,2\nd2,3,4");
    }

    #[test]
    fn test_union_header_mode_aligns_rows() {
        let options = plain().header_mode(HeaderMode::Union);
        let collection = TableCollection::new("date")
            .entry("d1", Table::new().row(Row::new().column("a", 1).column("b", 2)))
            .entry("d2", Table::new().row(Row::new().column("b", 3).column("c", 4)));
        assert_eq!(
            text(collection, &options),
            "date,a,b,c\nd1,1,2,\nd2,,3,4"
        );
    }

    #[test]
    fn test_no_data_sentinel() {
        assert_eq!(text(Table::new(), &plain()), NO_DATA_MESSAGE);

        let all_empty = TableCollection::new("date")
            .entry("2020-01-01", Table::new())
            .entry("2020-01-02", Table::new());
        assert_eq!(text(all_empty, &plain()), NO_DATA_MESSAGE);
        assert_eq!(text(TableCollection::new("date"), &plain()), NO_DATA_MESSAGE);
    }

    #[test]
    fn test_render_bytes_transcoded() {
        let options = CsvOptions::default();
        let payload = ReportPayload::from(Table::new_simple().row(Row::new().column("x", 1)));
        let bytes = HierarchicalRenderer::new(&options, &RawNames).render(&payload);
        let expected: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain("value\n1".encode_utf16().flat_map(|u| u.to_le_bytes()))
            .collect();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_no_data_not_transcoded() {
        let options = CsvOptions::default();
        let bytes =
            HierarchicalRenderer::new(&options, &RawNames).render(&ReportPayload::from(Table::new()));
        assert_eq!(bytes, NO_DATA_MESSAGE.as_bytes());
    }

    #[test]
    fn test_failure_line() {
        let options = CsvOptions::default();
        let renderer = HierarchicalRenderer::new(&options, &RawNames);
        let bytes = renderer.render(&ReportPayload::failure("Site &quot;7&quot; not found"));
        assert_eq!(bytes, b"Error: Site \"7\" not found".to_vec());
    }

    #[test]
    fn test_translated_headers_and_key_name() {
        let dict = Dictionary::new()
            .with("nb_visits", "Visits")
            .with("label", "Label")
            .with("date", "Date");
        let options = plain().translate_column_names(true);
        let collection = TableCollection::new("date").entry("2020-01-01", visits(4));
        let rendered = HierarchicalRenderer::new(&options, &dict).render_text(&collection.into());
        assert_eq!(rendered, "Date,Label,Visits\n2020-01-01,all,4");
    }

    #[test]
    fn test_separator_in_label_and_header_is_quoted() {
        let options = plain().translate_column_names(true);
        let dict = Dictionary::new().with("nb_visits", "Visits, unique");
        let collection = TableCollection::new("period").entry("2020-01-01,2020-01-07", visits(4));
        let rendered = HierarchicalRenderer::new(&options, &dict).render_text(&collection.into());
        assert_eq!(
            rendered,
            "period,label,\"Visits, unique\"\n\"2020-01-01,2020-01-07\",all,4"
        );
    }

    #[test]
    fn test_custom_separator_and_line_ending() {
        let options = plain()
            .separator(";")
            .line_ending(crate::options::LineEnding::CrLf);
        let table = Table::new()
            .row(Row::new().column("label", "a;b").column("ratio", 0.5))
            .row(Row::new().column("label", "c").column("ratio", "1,5"));
        assert_eq!(
            text(table, &options),
            "label;ratio\r\n\"a;b\";0.5\r\nc;1,5"
        );
    }

    #[test]
    fn test_header_accessor() {
        let options = plain();
        let renderer = HierarchicalRenderer::new(&options, &RawNames);
        let collection: DataNode = TableCollection::new("date").entry("d", visits(1)).into();
        assert_eq!(
            renderer.header(&collection),
            Some(vec!["date".to_string(), "label".to_string(), "nb_visits".to_string()])
        );
        assert_eq!(renderer.header(&Table::new().into()), None);
    }

    #[test]
    fn test_custom_unsanitizer() {
        struct Upper;
        impl Unsanitizer for Upper {
            fn unsanitize(&self, text: &str) -> String {
                text.to_uppercase()
            }
        }
        let options = plain();
        let renderer = HierarchicalRenderer::new(&options, &RawNames).with_unsanitizer(&Upper);
        let table = Table::new()
            .row(Row::new().column("label", "home").column("n", 1))
            .row(Row::new().column("label", "about").column("n", 2));
        assert_eq!(renderer.render_text(&table.into()), "label,n\nHOME,1\nABOUT,2");
    }

    fn parse(text: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes())
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_quoted_fields_round_trip_through_csv_reader() {
        let tricky = [
            "plain",
            "comma, inside",
            "\"quoted\"",
            "both \"a\",b",
            "multi\nline",
            "Tom &amp; Jerry",
        ];
        let mut table = Table::new();
        for value in tricky {
            table = table.row(Row::new().column("label", value).column("n", 1));
        }

        let parsed = parse(&text(table, &plain()));
        let labels: Vec<&str> = parsed[1..].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "plain",
                "comma, inside",
                "\"quoted\"",
                "both \"a\",b",
                "multi\nline",
                "Tom & Jerry"
            ]
        );
    }

    #[test]
    fn test_comma_labels_round_trip_through_csv_reader() {
        let table = Table::new()
            .row(Row::new().column("label", "1,000").column("n", 1))
            .row(Row::new().column("label", "12,5").column("n", 2))
            .row(Row::new().column("label", "S&atilde;o Paulo").column("n", 3));

        let rendered = text(table, &plain());
        assert_eq!(rendered, "label,n\n\"1,000\",1\n\"12,5\",2\nS\u{e3}o Paulo,3");

        let parsed = parse(&rendered);
        let labels: Vec<&str> = parsed[1..].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(labels, vec!["1,000", "12,5", "S\u{e3}o Paulo"]);
        assert!(parsed.iter().all(|record| record.len() == 2));
    }

    #[test]
    fn test_header_and_lines_have_same_width() {
        let table = Table::new()
            .row(
                Row::new()
                    .column("label", "a,b")
                    .column("goals", Value::nested([("1", [("nb_conversions", 1), ("revenue", 2)])]))
                    .metadata("url", "http://x/?a=1,2")
                    .subtable(4),
            )
            .row(Row::new().column("label", "c").column("nb_visits", 7));
        let collection = TableCollection::new("date")
            .entry("2020-01-01", table.clone())
            .entry("2020-01-02", table);

        let parsed = parse(&text(collection, &plain()));
        let width = parsed[0].len();
        assert_eq!(width, 7);
        assert!(parsed.iter().all(|record| record.len() == width));
        assert_eq!(parsed.len(), 5);
    }
}
