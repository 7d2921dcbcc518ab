//! Rendering of single cell values to delimited-text fields.

use crate::entities::Unsanitizer;
use crate::model::Scalar;

/// Formats cells and header names for one separator.
pub struct ValueFormatter<'a> {
    separator: &'a str,
    unsanitizer: &'a dyn Unsanitizer,
}

impl<'a> ValueFormatter<'a> {
    pub fn new(separator: &'a str, unsanitizer: &'a dyn Unsanitizer) -> Self {
        Self {
            separator,
            unsanitizer,
        }
    }

    /// Render a cell value as a ready-to-write field.
    ///
    /// - `false` becomes `0`, `true` becomes `1`, null becomes empty
    /// - non-numeric text is entity-decoded
    /// - numbers always use `.` as decimal separator; text such as `1,000`
    ///   is not a number and is written as text
    /// - fields holding the separator, a quote or a line break are quoted
    pub fn format(&self, value: &Scalar) -> String {
        let text = match value {
            Scalar::Bool(false) => "0".to_string(),
            Scalar::Bool(true) => "1".to_string(),
            Scalar::Null => String::new(),
            Scalar::Int(number) => number.to_string(),
            Scalar::Float(number) => number.to_string(),
            Scalar::Str(text) if looks_numeric(text) => text.clone(),
            Scalar::Str(text) => self.unsanitizer.unsanitize(text),
        };
        self.quote(&text)
    }

    /// Quote a field if it would otherwise split or break the record.
    pub fn quote(&self, text: &str) -> String {
        let needs_quotes = text.contains('"')
            || text.contains(self.separator)
            || text.contains(['\n', '\r']);
        if needs_quotes {
            format!("\"{}\"", text.replace('"', "\"\""))
        } else {
            text.to_string()
        }
    }
}

/// Whether `text` reads as a plain numeric literal (`12`, `-1.5`, `.5`,
/// `1e3`, surrounding whitespace allowed). Comma decimals (`12,5`) are text.
pub fn looks_numeric(text: &str) -> bool {
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace());
    is_numeric_literal(trimmed)
}

fn strip_sign(text: &str) -> &str {
    text.strip_prefix(['+', '-']).unwrap_or(text)
}

fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn is_numeric_literal(text: &str) -> bool {
    let body = strip_sign(text);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
        None => (body, None),
    };

    let mantissa_ok = match mantissa.split_once('.') {
        Some((int, frac)) => {
            (int.is_empty() || all_digits(int))
                && (frac.is_empty() || all_digits(frac))
                && !(int.is_empty() && frac.is_empty())
        }
        None => all_digits(mantissa),
    };
    let exponent_ok = exponent.map_or(true, |exp| all_digits(strip_sign(exp)));

    mantissa_ok && exponent_ok
}
