//! Query-string encoding for outbound API calls.
//!
//! Values are percent-encoded with everything outside the RFC 3986
//! unreserved set escaped; keys are static wire identifiers and are emitted
//! as-is. Parameters live in a [`BTreeMap`], so the same content always
//! encodes to the same string.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped in query values: all but `A-Z a-z 0-9 - . _ ~`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A scalar value that can appear in a query string.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl QueryValue {
    /// `true` for values that carry nothing worth sending: empty text and
    /// NaN floats.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            QueryValue::Text(s) => s.is_empty(),
            QueryValue::Float(f) => f.is_nan(),
            QueryValue::Int(_) | QueryValue::Bool(_) => false,
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Text(s) => f.write_str(s),
            QueryValue::Int(i) => write!(f, "{i}"),
            QueryValue::Float(v) => write!(f, "{v}"),
            QueryValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

/// Wire name → value mapping for one request.
pub type QueryParams = BTreeMap<String, QueryValue>;

/// Renders `params` as `?k1=v1&k2=v2`, or an empty string when nothing
/// survives the empty-value filter.
#[must_use]
pub fn encode_query(params: &QueryParams) -> String {
    let pairs: Vec<String> = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| {
            format!(
                "{key}={}",
                utf8_percent_encode(&value.to_string(), QUERY_VALUE)
            )
        })
        .collect();

    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

/// Percent-encodes a single URL component such as a path segment.
#[must_use]
pub fn escape_component(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_VALUE).to_string()
}

/// Splits a query string (with or without the leading `?`) back into
/// decoded key/value pairs, in the order they appear.
#[must_use]
pub fn decode_query(query: &str) -> Vec<(String, String)> {
    query
        .strip_prefix('?')
        .unwrap_or(query)
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                percent_decode_str(key).decode_utf8_lossy().into_owned(),
                percent_decode_str(value).decode_utf8_lossy().into_owned(),
            )
        })
        .collect()
}
