//! tablegraph: a relational schema served as a property graph
//!
//! At startup the SQLite catalog is introspected once. Every table with a
//! single-column primary key becomes a vertex collection, and every foreign
//! key that points at a primary key becomes an edge collection. Each
//! collection answers single-table requests only: lookup by id, full scan
//! and equality-filtered scan.
//!
//! # Core Concepts
//!
//! - **Vertex collection**: rows keyed by the table's primary key
//! - **Edge collection**: rows keyed by `<source>:<dest>`, named
//!   `table:column` after the foreign key that produced it
//! - **Registry**: collection name → adapter, handed to the transport
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablegraph::{OpenStore, SchemaIntrospector, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::open("graph.db").unwrap());
//! let registry = SchemaIntrospector::new(store).build_adapters().unwrap();
//! for name in registry.names() {
//!     println!("{}", name);
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod mcp;
pub mod row;
pub mod schema;
pub mod storage;

pub use adapter::{
    AdapterError, AdapterRegistry, CancellationToken, CollectionKind, EdgeAdapter, Endpoint,
    RowStream, TableAdapter, VertexAdapter, ROW_CHANNEL_CAPACITY,
};
pub use config::{Config, ConfigError};
pub use row::{IdentityError, Row, RowBuilder, SqlValue};
pub use schema::{ForeignKeyLink, Schema, SchemaError, SchemaIntrospector, Table};
pub use storage::{OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
