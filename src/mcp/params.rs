//! MCP tool parameter structs with schemars-derived JSON schemas.

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CollectionParams {
    #[schemars(description = "Collection name: a table name, or table:column for edges")]
    pub collection: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FetchRowParams {
    #[schemars(description = "Collection name: a table name, or table:column for edges")]
    pub collection: String,
    #[schemars(description = "Row id: the primary key for vertices, source:dest for edges")]
    pub id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FetchRowsParams {
    #[schemars(description = "Collection name: a table name, or table:column for edges")]
    pub collection: String,
    #[schemars(description = "Maximum number of rows to return (default 100)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FetchMatchRowsParams {
    #[schemars(description = "Collection name: a table name, or table:column for edges")]
    pub collection: String,
    #[schemars(description = "Column to compare; any column of the underlying table")]
    pub field: String,
    #[schemars(description = "Value the column must equal")]
    pub value: String,
    #[schemars(description = "Maximum number of rows to return (default 100)")]
    pub limit: Option<usize>,
}
