//! Catalog model: tables, columns and foreign-key links

use crate::storage::StorageError;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that abort introspection.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("catalog query failed ({scope}): {source}")]
    CatalogQuery {
        scope: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SchemaError {
    pub(crate) fn catalog(scope: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::CatalogQuery {
            scope: scope.into(),
            source,
        }
    }
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// One column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    /// Declared SQL type, possibly empty. Informational only.
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// 1-based position within the primary key, 0 when not part of it.
    pub pk_position: u32,
}

/// A table or view with its ordered columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    /// Set only when exactly one column forms the primary key.
    pub primary_key: Option<String>,
    /// False for views and `WITHOUT ROWID` tables
    pub has_rowid: bool,
}

impl Table {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// A foreign key as declared, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyCandidate {
    pub source_table: String,
    pub source_columns: Vec<String>,
    pub target_table: String,
    /// `None` where the declaration omits the column list and so refers to
    /// the target's primary key.
    pub target_columns: Vec<Option<String>>,
}

/// A validated single-column foreign key pointing at a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyLink {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

/// Result of a full introspection pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    pub tables: BTreeMap<String, Table>,
    pub links: Vec<ForeignKeyLink>,
}

impl Schema {
    /// Accepted links declared on `table`, in declaration order.
    pub fn links_from(&self, table: &str) -> Vec<&ForeignKeyLink> {
        self.links.iter().filter(|l| l.source_table == table).collect()
    }
}
