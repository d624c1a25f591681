//! Vertex collections: one table keyed by its primary key

use super::cancel::CancellationToken;
use super::stream::{lookup, spawn_scan, RowStream, ScanQuery};
use super::traits::{AdapterError, CollectionKind, TableAdapter};
use crate::row::{Row, RowBuilder};
use crate::storage::{coerced_match, quote_ident, SqliteStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Exposes one table as a vertex collection.
///
/// Row identity is the coerced value of the primary-key column. Every
/// declared column is surfaced as a field.
#[derive(Debug)]
pub struct VertexAdapter {
    store: Arc<SqliteStore>,
    table: String,
    primary_key: String,
    fields: Vec<String>,
    field_links: BTreeMap<String, String>,
    builder: RowBuilder,
}

impl VertexAdapter {
    pub fn new(
        store: Arc<SqliteStore>,
        table: impl Into<String>,
        primary_key: impl Into<String>,
        fields: Vec<String>,
        field_links: BTreeMap<String, String>,
    ) -> Self {
        let primary_key = primary_key.into();
        Self {
            store,
            table: table.into(),
            builder: RowBuilder::vertex(primary_key.clone()),
            primary_key,
            fields,
            field_links,
        }
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}

#[async_trait]
impl TableAdapter for VertexAdapter {
    fn name(&self) -> &str {
        &self.table
    }

    fn kind(&self) -> CollectionKind {
        CollectionKind::Vertex
    }

    fn fields(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn field_links(&self) -> BTreeMap<String, String> {
        self.field_links.clone()
    }

    async fn fetch_row(&self, id: &str) -> Result<Row, AdapterError> {
        let table = quote_ident(&self.table);
        let exact = ScanQuery::new(
            format!(
                "SELECT * FROM {} WHERE {} = ?1",
                table,
                quote_ident(&self.primary_key)
            ),
            vec![id.to_string()],
        );
        let coerced = ScanQuery::new(
            format!(
                "SELECT * FROM {} WHERE {}",
                table,
                coerced_match(&self.primary_key, 1)
            ),
            vec![id.to_string()],
        );
        tracing::debug!(collection = %self.table, id, "fetch row");

        lookup(
            self.store.clone(),
            vec![exact, coerced],
            self.builder.clone(),
            id.to_string(),
        )
        .await?
        .ok_or_else(|| AdapterError::RowNotFound {
            collection: self.table.clone(),
            id: id.to_string(),
        })
    }

    fn fetch_rows(&self, cancel: CancellationToken) -> RowStream {
        let query = ScanQuery::new(format!("SELECT * FROM {}", quote_ident(&self.table)), vec![]);
        spawn_scan(
            self.store.clone(),
            self.table.clone(),
            query,
            self.builder.clone(),
            cancel,
        )
    }

    fn fetch_match_rows(&self, cancel: CancellationToken, field: &str, value: &str) -> RowStream {
        if !self.fields.iter().any(|f| f == field) {
            tracing::warn!(collection = %self.table, field, "match on unknown field");
            return RowStream::empty(cancel);
        }
        let query = ScanQuery::new(
            format!(
                "SELECT * FROM {} WHERE {} = ?1",
                quote_ident(&self.table),
                quote_ident(field)
            ),
            vec![value.to_string()],
        );
        spawn_scan(
            self.store.clone(),
            self.table.clone(),
            query,
            self.builder.clone(),
            cancel,
        )
    }
}
