//! Row model: stored values, identity coercion and row construction

mod builder;
mod value;

pub use builder::{split_edge_id, IdentityRule, Row, RowBuilder, EDGE_ID_DELIMITER};
pub use value::{coerce_identity, IdentityError, SqlValue};
