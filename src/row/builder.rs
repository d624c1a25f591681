//! Row construction from raw column maps

use super::value::{coerce_identity, IdentityError, SqlValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// Separator between the two endpoint values of an edge identity.
pub const EDGE_ID_DELIMITER: char = ':';

/// A row as seen by the graph host.
///
/// `id` is derived from `fields` by the owning adapter's identity rule, so
/// two rows with equal identity columns always carry equal ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub id: String,
    pub fields: BTreeMap<String, SqlValue>,
}

/// How a row's identity is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRule {
    /// A single primary-key column (vertex collections).
    PrimaryKey(String),
    /// An ordered pair of endpoint columns (edge collections).
    Endpoints { source: String, dest: String },
}

/// Builds canonical rows under one identity rule.
#[derive(Debug, Clone)]
pub struct RowBuilder {
    rule: IdentityRule,
}

impl RowBuilder {
    pub fn vertex(primary_key: impl Into<String>) -> Self {
        Self {
            rule: IdentityRule::PrimaryKey(primary_key.into()),
        }
    }

    pub fn edge(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            rule: IdentityRule::Endpoints {
                source: source.into(),
                dest: dest.into(),
            },
        }
    }

    pub fn rule(&self) -> &IdentityRule {
        &self.rule
    }

    /// Build a row from a full column map.
    ///
    /// Vertex rows keep every column. Edge rows are reduced to their two
    /// endpoint columns, holding the coerced endpoint text.
    pub fn build(&self, fields: BTreeMap<String, SqlValue>) -> Result<Row, IdentityError> {
        match &self.rule {
            IdentityRule::PrimaryKey(column) => {
                let value = fields
                    .get(column)
                    .ok_or_else(|| IdentityError::MissingColumn(column.clone()))?;
                let id = coerce_identity(column, value)?;
                if id.is_empty() {
                    return Err(IdentityError::EmptyIdentity(column.clone()));
                }
                Ok(Row { id, fields })
            }
            IdentityRule::Endpoints { source, dest } => {
                let src = Self::endpoint(&fields, source)?;
                let dst = Self::endpoint(&fields, dest)?;
                // The id splits at the first delimiter, so such a row could
                // be listed but never fetched back
                if src.contains(EDGE_ID_DELIMITER) {
                    return Err(IdentityError::DelimiterInSource {
                        column: source.clone(),
                        value: src,
                    });
                }
                let id = format!("{}{}{}", src, EDGE_ID_DELIMITER, dst);

                let mut projected = BTreeMap::new();
                projected.insert(source.clone(), SqlValue::Text(src));
                projected.insert(dest.clone(), SqlValue::Text(dst));
                Ok(Row { id, fields: projected })
            }
        }
    }

    fn endpoint(
        fields: &BTreeMap<String, SqlValue>,
        column: &str,
    ) -> Result<String, IdentityError> {
        let value = fields
            .get(column)
            .ok_or_else(|| IdentityError::MissingColumn(column.to_string()))?;
        coerce_identity(column, value)
    }
}

/// Split an edge identity into its source and destination parts.
///
/// Only the first delimiter separates the parts, so a destination value may
/// itself contain the delimiter.
pub fn split_edge_id(id: &str) -> Option<(&str, &str)> {
    id.split_once(EDGE_ID_DELIMITER)
}
