//! SchemaIntrospector: derives the adapter set from the live catalog
//!
//! Introspection is eager: every table is visited once at startup so that a
//! schema the adapters cannot serve is discovered before any request
//! arrives. Catalog failures abort the pass; schema anomalies (no primary
//! key, foreign keys that do not target a primary key) only shrink the
//! adapter set and are logged.

use super::types::{
    Column, ForeignKeyCandidate, ForeignKeyLink, Schema, SchemaError, SchemaResult, Table,
};
use crate::adapter::{
    edge_collection_name, AdapterRegistry, EdgeAdapter, Endpoint, VertexAdapter,
};
use crate::storage::SqliteStore;
use std::collections::BTreeMap;
use std::sync::Arc;

const LIST_TABLES_SQL: &str = r#"
    SELECT name FROM sqlite_master
    WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
    ORDER BY name
"#;

const TABLE_INFO_SQL: &str = r#"
    SELECT cid, name, type, "notnull", dflt_value, pk
    FROM pragma_table_info(?1)
    ORDER BY cid
"#;

const FOREIGN_KEY_LIST_SQL: &str = r#"
    SELECT id, seq, "table", "from", "to"
    FROM pragma_foreign_key_list(?1)
    ORDER BY id, seq
"#;

const TABLE_KIND_SQL: &str = r#"
    SELECT type, wr FROM pragma_table_list(?1) WHERE schema = 'main'
"#;

/// (constraint id, target table, source column, target column)
type ForeignKeyRow = (i64, String, String, Option<String>);

/// Reads the catalog of a store and builds its adapters.
pub struct SchemaIntrospector {
    store: Arc<SqliteStore>,
}

impl SchemaIntrospector {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// All user tables and views, ordered by name.
    pub fn list_tables(&self) -> SchemaResult<Vec<String>> {
        self.store.with_connection(|conn| -> SchemaResult<Vec<String>> {
            let mut stmt = conn
                .prepare(LIST_TABLES_SQL)
                .map_err(|e| SchemaError::catalog("sqlite_master", e))?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
                .map_err(|e| SchemaError::catalog("sqlite_master", e))?;
            Ok(names)
        })
    }

    /// Ordered columns of `table` and its single-column primary key, if any.
    pub fn describe_columns(&self, table: &str) -> SchemaResult<Table> {
        let scope = format!("columns of {}", table);
        let columns = self.store.with_connection(|conn| -> SchemaResult<Vec<Column>> {
            let mut stmt = conn
                .prepare(TABLE_INFO_SQL)
                .map_err(|e| SchemaError::catalog(scope.as_str(), e))?;
            let columns = stmt
                .query_map([table], |row| {
                    Ok(Column {
                        name: row.get(1)?,
                        declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        not_null: row.get::<_, i64>(3)? != 0,
                        default_value: row.get(4)?,
                        pk_position: row.get(5)?,
                    })
                })
                .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
                .map_err(|e| SchemaError::catalog(scope.as_str(), e))?;
            Ok(columns)
        })?;

        let has_rowid = self.store.with_connection(|conn| -> SchemaResult<bool> {
            let (kind, without_rowid) = conn
                .query_row(TABLE_KIND_SQL, [table], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
                })
                .map_err(|e| SchemaError::catalog(scope.as_str(), e))?;
            Ok(kind == "table" && !without_rowid)
        })?;

        let keyed: Vec<&Column> = columns.iter().filter(|c| c.pk_position > 0).collect();
        let primary_key = match keyed.as_slice() {
            [only] => Some(only.name.clone()),
            [] => {
                tracing::info!(table, "no primary key, not a vertex collection");
                None
            }
            _ => {
                tracing::info!(
                    table,
                    columns = keyed.len(),
                    "composite primary key, not a vertex collection"
                );
                None
            }
        };

        Ok(Table {
            name: table.to_string(),
            columns,
            primary_key,
            has_rowid,
        })
    }

    /// Foreign keys declared on `table`, unvalidated.
    pub fn describe_foreign_keys(&self, table: &str) -> SchemaResult<Vec<ForeignKeyCandidate>> {
        let scope = format!("foreign keys of {}", table);
        let rows = self.store.with_connection(|conn| -> SchemaResult<Vec<ForeignKeyRow>> {
            let mut stmt = conn
                .prepare(FOREIGN_KEY_LIST_SQL)
                .map_err(|e| SchemaError::catalog(scope.as_str(), e))?;
            let rows = stmt
                .query_map([table], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                })
                .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
                .map_err(|e| SchemaError::catalog(scope.as_str(), e))?;
            Ok(rows)
        })?;

        // One candidate per constraint id; composite keys span several rows
        let mut grouped: BTreeMap<i64, ForeignKeyCandidate> = BTreeMap::new();
        for (id, target_table, from, to) in rows {
            let candidate = grouped.entry(id).or_insert_with(|| ForeignKeyCandidate {
                source_table: table.to_string(),
                source_columns: Vec::new(),
                target_table,
                target_columns: Vec::new(),
            });
            candidate.source_columns.push(from);
            candidate.target_columns.push(to);
        }
        Ok(grouped.into_values().collect())
    }

    /// Full introspection pass: every table, its columns and accepted links.
    pub fn inspect(&self) -> SchemaResult<Schema> {
        let names = self.list_tables()?;
        tracing::info!(tables = names.len(), "scanning catalog");

        let mut tables = BTreeMap::new();
        for name in &names {
            tracing::debug!(table = %name, "describing table");
            tables.insert(name.clone(), self.describe_columns(name)?);
        }

        let mut links = Vec::new();
        for name in &names {
            let candidates = self.describe_foreign_keys(name)?;
            let mut accepted = accept_foreign_keys(&tables, candidates);
            // Declaration order of the source columns
            if let Some(table) = tables.get(name) {
                accepted.sort_by_key(|link| {
                    table
                        .columns
                        .iter()
                        .position(|c| c.name == link.source_column)
                        .unwrap_or(usize::MAX)
                });
            }
            links.extend(accepted);
        }

        Ok(Schema { tables, links })
    }

    /// Introspect and build the complete registry.
    ///
    /// Either every adapter is built or an error is returned; a partial
    /// registry is never produced.
    pub fn build_adapters(&self) -> SchemaResult<AdapterRegistry> {
        let schema = self.inspect()?;
        let registry = build_registry(&self.store, &schema);
        tracing::info!(
            collections = registry.len(),
            links = schema.links.len(),
            "adapter registry built"
        );
        Ok(registry)
    }
}

/// Keep the candidates that are single-column keys onto a primary key.
///
/// Table names are matched case-insensitively, as SQLite does.
pub fn accept_foreign_keys(
    tables: &BTreeMap<String, Table>,
    candidates: Vec<ForeignKeyCandidate>,
) -> Vec<ForeignKeyLink> {
    let mut accepted = Vec::new();

    for candidate in candidates {
        let source = &candidate.source_table;
        let (from, to) = match (
            candidate.source_columns.as_slice(),
            candidate.target_columns.as_slice(),
        ) {
            ([from], [to]) => (from, to),
            _ => {
                tracing::info!(
                    table = %source,
                    columns = ?candidate.source_columns,
                    "composite foreign key ignored"
                );
                continue;
            }
        };

        let Some(target) = find_table(tables, &candidate.target_table) else {
            tracing::info!(
                table = %source,
                column = %from,
                target_table = %candidate.target_table,
                "foreign key target table not found"
            );
            continue;
        };

        let Some(pk) = &target.primary_key else {
            tracing::info!(
                table = %source,
                column = %from,
                target_table = %target.name,
                "foreign key target has no primary key"
            );
            continue;
        };

        // A missing column list refers to the target's primary key
        let target_column = to.as_deref().unwrap_or(pk);
        if !target_column.eq_ignore_ascii_case(pk) {
            tracing::info!(
                table = %source,
                column = %from,
                target_table = %target.name,
                target_column,
                primary_key = %pk,
                "foreign key does not reference primary key"
            );
            continue;
        }

        accepted.push(ForeignKeyLink {
            source_table: source.clone(),
            source_column: from.clone(),
            target_table: target.name.clone(),
            target_column: pk.clone(),
        });
    }

    accepted
}

fn find_table<'a>(tables: &'a BTreeMap<String, Table>, name: &str) -> Option<&'a Table> {
    tables
        .get(name)
        .or_else(|| tables.values().find(|t| t.name.eq_ignore_ascii_case(name)))
}

/// Turn an introspected schema into adapters.
///
/// Every keyed table becomes a vertex collection. A keyed table's links run
/// from its own key to the referenced vertex; a link declared on the key
/// column itself only shows up as a vertex field link. A table without a key
/// but with exactly two links is a join table: each link column becomes the
/// source of one collection with the other link column as its destination.
/// Any other unkeyed table sources its edges at the rowid.
pub fn build_registry(store: &Arc<SqliteStore>, schema: &Schema) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();

    for table in schema.tables.values() {
        let links = schema.links_from(&table.name);

        match &table.primary_key {
            Some(pk) => {
                let field_links = links
                    .iter()
                    .map(|l| (l.source_column.clone(), l.target_table.clone()))
                    .collect();
                tracing::info!(table = %table.name, primary_key = %pk, "vertex collection");
                registry.register(Arc::new(VertexAdapter::new(
                    store.clone(),
                    table.name.clone(),
                    pk.clone(),
                    table.column_names(),
                    field_links,
                )));

                for link in &links {
                    if link.source_column.eq_ignore_ascii_case(pk) {
                        tracing::info!(
                            table = %table.name,
                            column = %link.source_column,
                            target_table = %link.target_table,
                            "foreign key on the primary key, kept as a field link only"
                        );
                        continue;
                    }
                    register_edge(
                        &mut registry,
                        store,
                        table,
                        &link.source_column,
                        Endpoint::new(pk.clone(), table.name.clone()),
                        Endpoint::new(link.source_column.clone(), link.target_table.clone()),
                    );
                }
            }
            None if links.len() == 2 => {
                for (this, other) in [(links[0], links[1]), (links[1], links[0])] {
                    register_edge(
                        &mut registry,
                        store,
                        table,
                        &this.source_column,
                        Endpoint::new(this.source_column.clone(), this.target_table.clone()),
                        Endpoint::new(other.source_column.clone(), other.target_table.clone()),
                    );
                }
            }
            None if table.has_rowid => {
                for link in &links {
                    register_edge(
                        &mut registry,
                        store,
                        table,
                        &link.source_column,
                        Endpoint::rowid(table.name.clone()),
                        Endpoint::new(link.source_column.clone(), link.target_table.clone()),
                    );
                }
            }
            None => {
                if !links.is_empty() {
                    tracing::info!(
                        table = %table.name,
                        links = links.len(),
                        "no primary key and no rowid, links form no edges"
                    );
                }
            }
        }
    }

    registry
}

fn register_edge(
    registry: &mut AdapterRegistry,
    store: &Arc<SqliteStore>,
    table: &Table,
    key_column: &str,
    source: Endpoint,
    dest: Endpoint,
) {
    let name = edge_collection_name(&table.name, key_column);
    tracing::info!(
        collection = %name,
        source = %source.collection,
        dest = %dest.collection,
        "edge collection"
    );
    registry.register(Arc::new(EdgeAdapter::new(
        store.clone(),
        name,
        table.name.clone(),
        source,
        dest,
        table.column_names(),
    )));
}
