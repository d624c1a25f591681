//! Graph-facing adapters over relational tables
//!
//! Each table with a primary key becomes a vertex collection; each accepted
//! foreign key becomes an edge collection. All adapters share one read-only
//! store and answer single-table requests only.

mod cancel;
mod edge;
mod registry;
mod stream;
mod traits;
mod vertex;

pub use cancel::CancellationToken;
pub use edge::{EdgeAdapter, Endpoint, ROWID_COLUMN};
pub use registry::{edge_collection_name, AdapterRegistry};
pub use stream::{RowStream, ROW_CHANNEL_CAPACITY};
pub use traits::{AdapterError, CollectionKind, TableAdapter};
pub use vertex::VertexAdapter;
