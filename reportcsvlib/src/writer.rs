//! Assembly of formatted fields into the final delimited text.

use crate::options::CsvOptions;

/// UTF-16LE byte-order mark.
pub const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// A header line plus data lines, all fields already formatted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub header: Vec<String>,
    pub lines: Vec<Vec<String>>,
}

impl Block {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            lines: Vec::new(),
        }
    }
}

/// Joins fields with the separator and lines with the line ending.
pub struct DelimitedWriter<'a> {
    separator: &'a str,
    line_ending: &'a str,
}

impl<'a> DelimitedWriter<'a> {
    pub fn new(separator: &'a str, line_ending: &'a str) -> Self {
        Self {
            separator,
            line_ending,
        }
    }

    pub fn from_options(options: &'a CsvOptions) -> Self {
        Self::new(&options.separator, options.line_ending.as_str())
    }

    /// Write the header and every line, without a trailing line ending.
    pub fn write(&self, block: &Block) -> String {
        let mut out = String::new();
        self.push_line(&mut out, &block.header);
        for line in &block.lines {
            self.push_line(&mut out, line);
        }
        if out.ends_with(self.line_ending) {
            out.truncate(out.len() - self.line_ending.len());
        }
        out
    }

    fn push_line(&self, out: &mut String, fields: &[String]) {
        out.push_str(&fields.join(self.separator));
        out.push_str(self.line_ending);
    }
}

/// Re-encode UTF-8 text as UTF-16LE preceded by its byte-order mark.
///
/// Spreadsheet importers that assume a legacy code page still detect this
/// encoding correctly, so non-Latin text survives the import.
pub fn to_utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(UTF16LE_BOM.len() + text.len() * 2);
    out.extend_from_slice(&UTF16LE_BOM);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Final byte encoding of rendered text.
pub fn encode(text: &str, convert_to_unicode: bool) -> Vec<u8> {
    if convert_to_unicode {
        to_utf16le(text)
    } else {
        text.as_bytes().to_vec()
    }
}
