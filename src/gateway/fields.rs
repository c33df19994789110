//! Dotted/indexed paths into JSON responses.
//!
//! The exchange nests the fields we care about (`assets[0].walletBalance`,
//! `executedQty`, ...). A [`FieldPath`] names such a field; extraction failure
//! is how a syntactically-valid but incomplete response gets classified as a
//! retryable gateway failure.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::GatewayError;

/// One step into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

/// A parsed dotted/indexed path, e.g. `assets[0].walletBalance`.
#[derive(Debug, Clone)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a path like `assets[0].walletBalance`.
    ///
    /// Panics only on an empty path; malformed index brackets are treated as
    /// plain keys, matching how a missing field is reported at extraction time.
    pub fn new(path: &str) -> Self {
        let mut segments = Vec::new();

        for part in path.split('.') {
            // "assets[0]" -> Key("assets"), Index(0)
            let mut rest = part;
            while let Some(open) = rest.find('[') {
                let key = &rest[..open];
                if !key.is_empty() {
                    segments.push(Segment::Key(key.to_string()));
                }
                match rest[open + 1..].find(']') {
                    Some(close) => {
                        let idx_str = &rest[open + 1..open + 1 + close];
                        match idx_str.parse::<usize>() {
                            Ok(idx) => segments.push(Segment::Index(idx)),
                            Err(_) => segments.push(Segment::Key(idx_str.to_string())),
                        }
                        rest = &rest[open + 1 + close + 1..];
                    }
                    None => {
                        segments.push(Segment::Key(rest[open..].to_string()));
                        rest = "";
                    }
                }
            }
            if !rest.is_empty() {
                segments.push(Segment::Key(rest.to_string()));
            }
        }

        Self {
            raw: path.to_string(),
            segments,
        }
    }

    /// The original path string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolve the path against a JSON value.
    pub fn extract<'a>(&self, value: &'a Value) -> Result<&'a Value, GatewayError> {
        let mut current = value;
        for segment in &self.segments {
            let next = match segment {
                Segment::Key(key) => current.get(key.as_str()),
                Segment::Index(idx) => current.get(*idx),
            };
            current = next.ok_or_else(|| GatewayError::MissingField {
                path: self.raw.clone(),
            })?;
        }
        Ok(current)
    }

    /// Resolve the path and parse the leaf as a decimal.
    ///
    /// The exchange serializes most numbers as strings; both string and
    /// numeric leaves are accepted.
    pub fn extract_decimal(&self, value: &Value) -> Result<Decimal, GatewayError> {
        let leaf = self.extract(value)?;
        decimal_from_value(leaf).ok_or_else(|| GatewayError::Parse(format!(
            "field `{}` is not a decimal: {leaf}",
            self.raw
        )))
    }
}

/// Parse a JSON leaf as a decimal, accepting string or number encodings.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    if let Some(s) = value.as_str() {
        return s.parse().ok();
    }
    if let Some(n) = value.as_f64() {
        return Decimal::try_from(n).ok();
    }
    None
}
