//! MCP server for tablegraph: publishes the adapter registry over the
//! Model Context Protocol on stdio.
//!
//! Tools mirror the adapter contract: list_collections, get_fields,
//! get_field_links, fetch_row, fetch_rows, fetch_match_rows.

pub mod params;

use params::*;
use crate::adapter::{AdapterError, AdapterRegistry, CancellationToken, RowStream, TableAdapter};
use crate::row::Row;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Rows returned by a scan tool when the caller gives no limit.
pub const DEFAULT_ROW_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ok_json(value: &impl Serialize) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => err_text(format!("serialization failed: {}", e)),
    }
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

/// Run a request under the adapter's timeout, if it declares one.
async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, AdapterError>>,
) -> Result<T, AdapterError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| AdapterError::Internal(format!("timed out after {:?}", limit)))?,
        None => fut.await,
    }
}

#[derive(Serialize)]
struct RowPage {
    collection: String,
    rows: Vec<Row>,
    /// True when the limit cut the scan short
    truncated: bool,
}

/// Drain up to `limit` rows; one extra row is read to tell whether the scan
/// was cut short.
async fn page(collection: &str, stream: RowStream, limit: usize) -> RowPage {
    let mut rows = stream.take(limit.saturating_add(1)).await;
    let truncated = rows.len() > limit;
    rows.truncate(limit);
    RowPage {
        collection: collection.to_string(),
        rows,
        truncated,
    }
}

// ---------------------------------------------------------------------------
// TableGraphMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TableGraphMcpServer {
    registry: Arc<AdapterRegistry>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TableGraphMcpServer {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            tool_router: Self::tool_router(),
        }
    }

    fn adapter(&self, collection: &str) -> Result<Arc<dyn TableAdapter>, String> {
        self.registry
            .get(collection)
            .ok_or_else(|| format!("collection not found: {}", collection))
    }

    #[tool(description = "List every vertex and edge collection")]
    fn list_collections(&self) -> Result<CallToolResult, McpError> {
        let collections: Vec<serde_json::Value> = self
            .registry
            .iter()
            .map(|(name, adapter)| {
                serde_json::json!({
                    "name": name,
                    "kind": adapter.kind(),
                })
            })
            .collect();
        ok_json(&collections)
    }

    #[tool(description = "Ordered field names of a collection")]
    fn get_fields(
        &self,
        Parameters(p): Parameters<CollectionParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.adapter(&p.collection) {
            Ok(adapter) => ok_json(&adapter.fields()),
            Err(msg) => err_text(msg),
        }
    }

    #[tool(description = "Fields of a collection that reference another collection")]
    fn get_field_links(
        &self,
        Parameters(p): Parameters<CollectionParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.adapter(&p.collection) {
            Ok(adapter) => ok_json(&adapter.field_links()),
            Err(msg) => err_text(msg),
        }
    }

    #[tool(description = "Fetch one row by id")]
    async fn fetch_row(
        &self,
        Parameters(p): Parameters<FetchRowParams>,
    ) -> Result<CallToolResult, McpError> {
        let adapter = match self.adapter(&p.collection) {
            Ok(a) => a,
            Err(msg) => return err_text(msg),
        };
        match with_timeout(adapter.timeout(), adapter.fetch_row(&p.id)).await {
            Ok(row) => ok_json(&row),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Scan a collection, returning up to `limit` rows")]
    async fn fetch_rows(
        &self,
        Parameters(p): Parameters<FetchRowsParams>,
    ) -> Result<CallToolResult, McpError> {
        let adapter = match self.adapter(&p.collection) {
            Ok(a) => a,
            Err(msg) => return err_text(msg),
        };
        let stream = adapter.fetch_rows(CancellationToken::new());
        let limit = p.limit.unwrap_or(DEFAULT_ROW_LIMIT);
        ok_json(&page(&p.collection, stream, limit).await)
    }

    #[tool(description = "Scan a collection for rows where `field` equals `value`")]
    async fn fetch_match_rows(
        &self,
        Parameters(p): Parameters<FetchMatchRowsParams>,
    ) -> Result<CallToolResult, McpError> {
        let adapter = match self.adapter(&p.collection) {
            Ok(a) => a,
            Err(msg) => return err_text(msg),
        };
        let stream = adapter.fetch_match_rows(CancellationToken::new(), &p.field, &p.value);
        let limit = p.limit.unwrap_or(DEFAULT_ROW_LIMIT);
        ok_json(&page(&p.collection, stream, limit).await)
    }
}

#[tool_handler]
impl ServerHandler for TableGraphMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "tablegraph MCP server: a SQLite schema served as vertex and edge collections"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run_mcp_server(registry: AdapterRegistry) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to create tokio runtime");
            return 1;
        }
    };

    rt.block_on(async {
        let collections = registry.len();
        let server = TableGraphMcpServer::new(Arc::new(registry));

        tracing::info!(collections, "tablegraph mcp server starting on stdio");

        let service = match server.serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to start MCP server");
                return 1;
            }
        };

        if let Err(e) = service.waiting().await {
            tracing::error!(error = %e, "MCP server error");
            return 1;
        }

        0
    })
}
