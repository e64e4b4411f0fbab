#![forbid(unsafe_code)]

//! Lexer configuration properties.
//!
//! Hosts hand lexers a flat string map such as `fold.compact=1`. Values are
//! read as integers the way editor property files are: the leading decimal
//! digits count, anything else reads as zero, and an absent key yields the
//! caller's default.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Error for malformed property input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyError {
    pub message: String,
    /// 1-based line of `key=value` input, or 0 for JSON input.
    pub line: usize,
}

impl std::fmt::Display for PropertyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "invalid properties: {}", self.message)
        } else {
            write!(f, "invalid property at line {}: {}", self.line, self.message)
        }
    }
}

impl std::error::Error for PropertyError {}

/// String-keyed configuration map read by lexers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse `key=value` lines. Blank lines and lines starting with `#` are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-comment line without `=` or with an empty
    /// key.
    pub fn parse_lines(input: &str) -> Result<Self, PropertyError> {
        let mut props = Self::new();
        for (idx, raw) in input.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(PropertyError {
                    message: format!("expected key=value, found {line:?}"),
                    line: idx + 1,
                });
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(PropertyError {
                    message: "empty key".to_string(),
                    line: idx + 1,
                });
            }
            props.set(key, value.trim());
        }
        Ok(props)
    }

    /// Parse a JSON object of string values.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is not a JSON object of strings.
    pub fn from_json(input: &str) -> Result<Self, PropertyError> {
        serde_json::from_str(input).map_err(|err| PropertyError {
            message: err.to_string(),
            line: 0,
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Integer value of `key`, or `default` when it is unset or empty.
    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        match self.get(key) {
            Some(value) if !value.is_empty() => leading_int(value),
            _ => default,
        }
    }

    /// `get_int(key, default as i32) != 0`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_int(key, i32::from(default)) != 0
    }
}

fn leading_int(value: &str) -> i32 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let mut n: i32 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        n = n.saturating_mul(10).saturating_add(i32::from(b - b'0'));
    }
    if negative { -n } else { n }
}
