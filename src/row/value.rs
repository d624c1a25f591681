//! Stored column values and identity coercion
//!
//! SQLite may hand back a key column as text, as a byte sequence or as an
//! integer depending on column affinity. The graph layer needs a single
//! string identity, so every value read from the store is first lifted into
//! `SqlValue` and then coerced.

use rusqlite::types::ValueRef;
use serde::Serialize;
use thiserror::Error;

/// A single value as stored in a table cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Storage class name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            // SQLite does not enforce encoding on TEXT; keep the raw bytes
            // when they are not valid UTF-8.
            ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Self::Text(s.to_string()),
                Err(_) => Self::Blob(bytes.to_vec()),
            },
            ValueRef::Blob(bytes) => Self::Blob(bytes.to_vec()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{:?}", s),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Why a row could not be given an identity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdentityError {
    #[error("column {column} holds {value} ({type_name}), which cannot be used as an identity")]
    UnsupportedIdentityType {
        column: String,
        value: String,
        type_name: &'static str,
    },

    #[error("identity column {0} missing from row")]
    MissingColumn(String),

    #[error("identity column {0} is empty")]
    EmptyIdentity(String),

    #[error("edge source {column} holds {value:?}, which contains the edge id delimiter")]
    DelimiterInSource { column: String, value: String },
}

/// Coerce a stored value into its canonical string identity.
///
/// Text is returned unchanged, blobs are decoded as UTF-8 and integers are
/// rendered in decimal. Everything else is rejected.
pub fn coerce_identity(column: &str, value: &SqlValue) -> Result<String, IdentityError> {
    match value {
        SqlValue::Text(s) => Ok(s.clone()),
        SqlValue::Blob(bytes) => String::from_utf8(bytes.clone()).map_err(|_| {
            IdentityError::UnsupportedIdentityType {
                column: column.to_string(),
                value: value.to_string(),
                type_name: "blob (invalid utf-8)",
            }
        }),
        SqlValue::Integer(i) => Ok(i.to_string()),
        other => Err(IdentityError::UnsupportedIdentityType {
            column: column.to_string(),
            value: other.to_string(),
            type_name: other.type_name(),
        }),
    }
}
