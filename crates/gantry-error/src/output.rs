// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire-level shape of an error response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// HeaderEntry
// ---------------------------------------------------------------------------

/// Value of a single response header declared by an error output.
///
/// List values are applied as repeated headers; integer values are
/// formatted decimally (e.g. `Retry-After: 30`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderEntry {
    /// A single header value.
    One(String),
    /// A multi-value header, applied as repeated header lines.
    Many(Vec<String>),
    /// A numeric header value.
    Int(i64),
}

impl From<&str> for HeaderEntry {
    fn from(value: &str) -> Self {
        Self::One(value.to_owned())
    }
}

impl From<String> for HeaderEntry {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for HeaderEntry {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

impl From<i64> for HeaderEntry {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

// ---------------------------------------------------------------------------
// ErrorOutput
// ---------------------------------------------------------------------------

/// The wire-level representation of an error response.
///
/// Produced fresh for every mapped error. Output transformers consume an
/// `ErrorOutput` by value and return a replacement, so a finished output is
/// never mutated in place. Only [`payload`](Self::payload) is serialized as
/// the response body; `status_code` and `headers` drive the HTTP envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorOutput {
    /// HTTP status code of the response.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Response headers to apply, keyed by header name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, HeaderEntry>,
    /// JSON body of the response.
    pub payload: serde_json::Map<String, Value>,
}

impl ErrorOutput {
    /// Create an output with the given status, no headers, and an empty
    /// payload.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            payload: serde_json::Map::new(),
        }
    }

    /// Return a copy of this output with `key` set in the payload.
    pub fn with_payload_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Return a copy of this output with the header set.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderEntry>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
