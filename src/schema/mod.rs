//! Schema-to-graph translation
//!
//! Reads the SQLite catalog and decides which tables become vertex
//! collections and which foreign keys become edge collections.

mod introspect;
mod types;

pub use introspect::{accept_foreign_keys, build_registry, SchemaIntrospector};
pub use types::{
    Column, ForeignKeyCandidate, ForeignKeyLink, Schema, SchemaError, SchemaResult, Table,
};
