//! Edge collections: table rows linking two vertex collections

use super::cancel::CancellationToken;
use super::stream::{lookup, spawn_scan, RowStream, ScanQuery};
use super::traits::{AdapterError, CollectionKind, TableAdapter};
use crate::row::{split_edge_id, Row, RowBuilder};
use crate::storage::{coerced_match, quote_ident, SqliteStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// SQLite's implicit row key, used as the source of edges drawn from tables
/// without a primary key.
pub const ROWID_COLUMN: &str = "rowid";

/// One side of an edge: a column and the collection it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub column: String,
    pub collection: String,
}

impl Endpoint {
    pub fn new(column: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            collection: collection.into(),
        }
    }

    /// The implicit row key of `table`.
    pub fn rowid(table: impl Into<String>) -> Self {
        Self::new(ROWID_COLUMN, table)
    }
}

/// Exposes one table as an edge collection between two vertex collections.
///
/// Identity is `<source>:<dest>` built from the two endpoint columns, and
/// only those two columns are surfaced as fields. Filters may still name any
/// column of the underlying table; rows are reduced to their endpoints after
/// filtering.
#[derive(Debug)]
pub struct EdgeAdapter {
    store: Arc<SqliteStore>,
    name: String,
    table: String,
    source: Endpoint,
    dest: Endpoint,
    table_columns: Vec<String>,
    /// Result columns of every query: `*`, plus the rowid when an endpoint
    /// uses it
    projection: String,
    builder: RowBuilder,
}

impl EdgeAdapter {
    pub fn new(
        store: Arc<SqliteStore>,
        name: impl Into<String>,
        table: impl Into<String>,
        source: Endpoint,
        dest: Endpoint,
        table_columns: Vec<String>,
    ) -> Self {
        let declared = |column: &str| table_columns.iter().any(|c| c.eq_ignore_ascii_case(column));
        let uses_rowid = [&source, &dest]
            .iter()
            .any(|e| e.column == ROWID_COLUMN && !declared(ROWID_COLUMN));
        let projection = if uses_rowid {
            format!("rowid AS {}, *", quote_ident(ROWID_COLUMN))
        } else {
            "*".to_string()
        };

        Self {
            store,
            name: name.into(),
            table: table.into(),
            builder: RowBuilder::edge(source.column.clone(), dest.column.clone()),
            source,
            dest,
            table_columns,
            projection,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn source(&self) -> &Endpoint {
        &self.source
    }

    pub fn dest(&self) -> &Endpoint {
        &self.dest
    }

    fn select(&self, predicate: Option<String>) -> String {
        let base = format!("SELECT {} FROM {}", self.projection, quote_ident(&self.table));
        match predicate {
            Some(p) => format!("{} WHERE {}", base, p),
            None => base,
        }
    }

    fn is_filterable(&self, field: &str) -> bool {
        self.table_columns.iter().any(|c| c == field)
            || [&self.source, &self.dest].iter().any(|e| e.column == field)
    }

    fn scan(&self, query: ScanQuery, cancel: CancellationToken) -> RowStream {
        spawn_scan(
            self.store.clone(),
            self.name.clone(),
            query,
            self.builder.clone(),
            cancel,
        )
    }
}

#[async_trait]
impl TableAdapter for EdgeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> CollectionKind {
        CollectionKind::Edge
    }

    fn fields(&self) -> Vec<String> {
        vec![self.source.column.clone(), self.dest.column.clone()]
    }

    fn field_links(&self) -> BTreeMap<String, String> {
        let mut links = BTreeMap::new();
        links.insert(self.source.column.clone(), self.source.collection.clone());
        links.insert(self.dest.column.clone(), self.dest.collection.clone());
        links
    }

    async fn fetch_row(&self, id: &str) -> Result<Row, AdapterError> {
        let (src, dst) =
            split_edge_id(id).ok_or_else(|| AdapterError::MalformedEdgeId(id.to_string()))?;
        let source = quote_ident(&self.source.column);
        let dest = quote_ident(&self.dest.column);
        let params = vec![src.to_string(), dst.to_string()];

        let exact = ScanQuery::new(
            self.select(Some(format!("{} = ?1 AND {} = ?2", source, dest))),
            params.clone(),
        );
        let coerced = ScanQuery::new(
            self.select(Some(format!(
                "({} = ?1 OR {}) AND ({} = ?2 OR {})",
                source,
                coerced_match(&self.source.column, 1),
                dest,
                coerced_match(&self.dest.column, 2)
            ))),
            params,
        );
        tracing::debug!(collection = %self.name, id, "fetch edge");

        lookup(
            self.store.clone(),
            vec![exact, coerced],
            self.builder.clone(),
            id.to_string(),
        )
        .await?
        .ok_or_else(|| AdapterError::RowNotFound {
            collection: self.name.clone(),
            id: id.to_string(),
        })
    }

    fn fetch_rows(&self, cancel: CancellationToken) -> RowStream {
        let query = ScanQuery::new(self.select(None), vec![]);
        self.scan(query, cancel)
    }

    fn fetch_match_rows(&self, cancel: CancellationToken, field: &str, value: &str) -> RowStream {
        if !self.is_filterable(field) {
            tracing::warn!(collection = %self.name, field, "match on unknown field");
            return RowStream::empty(cancel);
        }
        let query = ScanQuery::new(
            self.select(Some(format!("{} = ?1", quote_ident(field)))),
            vec![value.to_string()],
        );
        self.scan(query, cancel)
    }
}
