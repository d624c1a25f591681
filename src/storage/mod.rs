//! Storage access for tablegraph
//!
//! A single read-only `SqliteStore` is opened at startup and shared by all
//! adapters. Nothing here knows about graphs; it only hands out connections
//! and turns result rows into `SqlValue` maps.

mod sqlite;
mod traits;

pub use sqlite::{coerced_match, quote_ident, read_fields, SqliteStore};
pub use traits::{OpenStore, StorageError, StorageResult};
