//! TableAdapter trait: the contract every collection implements
//!
//! Vertex and edge collections expose the same row-access surface, so the
//! transport layer can serve either through `Arc<dyn TableAdapter>`.

use super::cancel::CancellationToken;
use super::stream::RowStream;
use crate::row::{IdentityError, Row};
use crate::storage::StorageError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Errors returned to the caller of a single adapter request.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("row not found in {collection}: {id}")]
    RowNotFound { collection: String, id: String },

    #[error("malformed edge id {0:?}: expected <source>:<dest>")]
    MalformedEdgeId(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("adapter error: {0}")]
    Internal(String),
}

/// Whether a collection presents rows as vertices or as edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Vertex,
    Edge,
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex => f.pad("vertex"),
            Self::Edge => f.pad("edge"),
        }
    }
}

/// The row-access contract shared by vertex and edge collections.
///
/// Implementations carry no per-request state; every call is independent
/// and may run concurrently with any other call. The scanning methods spawn
/// a blocking producer and must be called from within a Tokio runtime.
#[async_trait]
pub trait TableAdapter: Send + Sync {
    /// Logical collection name (registry key)
    fn name(&self) -> &str;

    fn kind(&self) -> CollectionKind;

    /// Request timeout. `None` means unlimited.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Ordered field names exposed to the host
    fn fields(&self) -> Vec<String>;

    /// Fields that reference another collection, mapped to that collection
    fn field_links(&self) -> BTreeMap<String, String>;

    /// Point lookup by row identity.
    async fn fetch_row(&self, id: &str) -> Result<Row, AdapterError>;

    /// Full scan. Each call starts a fresh scan from the beginning.
    fn fetch_rows(&self, cancel: CancellationToken) -> RowStream;

    /// Scan restricted to rows where `field = value`.
    fn fetch_match_rows(&self, cancel: CancellationToken, field: &str, value: &str) -> RowStream;
}
