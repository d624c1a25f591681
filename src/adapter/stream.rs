//! Row streaming and point lookups against the shared store
//!
//! A scan runs on a blocking task that owns a pooled connection and pushes
//! finished rows into a bounded channel. The bound gives backpressure: the
//! producer parks once `ROW_CHANNEL_CAPACITY` rows are waiting, so a slow
//! consumer never causes the whole table to be buffered.

use super::cancel::CancellationToken;
use super::traits::AdapterError;
use crate::row::{Row, RowBuilder};
use crate::storage::{read_fields, SqliteStore};
use rusqlite::params_from_iter;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Rows buffered between a scan producer and its consumer.
pub const ROW_CHANNEL_CAPACITY: usize = 10;

/// A prepared single-table query.
#[derive(Debug, Clone)]
pub(crate) struct ScanQuery {
    pub sql: String,
    pub params: Vec<String>,
}

impl ScanQuery {
    pub fn new(sql: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Outcome of one scan, logged when the producer finishes.
#[derive(Debug, Default)]
struct ScanSummary {
    delivered: usize,
    skipped: usize,
    cancelled: bool,
    consumer_gone: bool,
}

/// What became of one row handed to the channel.
enum Delivery {
    Sent,
    Cancelled,
    ConsumerGone,
}

/// Push one row, parking on a full channel until either a slot frees up or
/// the token fires. Runs on a blocking-pool thread.
fn deliver(
    runtime: &Handle,
    tx: &mpsc::Sender<Row>,
    token: &CancellationToken,
    row: Row,
) -> Delivery {
    match tx.try_send(row) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Closed(_)) => Delivery::ConsumerGone,
        Err(TrySendError::Full(row)) => runtime.block_on(async {
            tokio::select! {
                biased;
                _ = token.cancelled() => Delivery::Cancelled,
                sent = tx.send(row) => match sent {
                    Ok(()) => Delivery::Sent,
                    Err(_) => Delivery::ConsumerGone,
                },
            }
        }),
    }
}

/// A lazy, cancellable sequence of rows.
///
/// Ends when the scan is exhausted, when the scan fails (rows already
/// delivered stand, the failure is logged) or once the token is cancelled.
/// Dropping the stream stops the producer at its next row.
#[derive(Debug)]
pub struct RowStream {
    rx: mpsc::Receiver<Row>,
    cancel: CancellationToken,
}

impl RowStream {
    /// A stream that yields nothing.
    pub fn empty(cancel: CancellationToken) -> Self {
        let (_tx, rx) = mpsc::channel(1);
        Self { rx, cancel }
    }

    /// Next row, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Row> {
        if self.cancel.is_cancelled() {
            // Closing wakes a producer parked on a full channel
            self.rx.close();
            return None;
        }
        self.rx.recv().await
    }

    /// The token controlling this stream.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drain the stream into a vector.
    pub async fn collect(mut self) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row);
        }
        rows
    }

    /// Drain at most `limit` rows, then cancel the scan.
    pub async fn take(mut self, limit: usize) -> Vec<Row> {
        let mut rows = Vec::new();
        while rows.len() < limit {
            match self.next().await {
                Some(row) => rows.push(row),
                None => return rows,
            }
        }
        self.cancel.cancel();
        rows
    }
}

/// Start a background scan.
///
/// Rows that cannot be given an identity are skipped and logged; they never
/// end the stream.
pub(crate) fn spawn_scan(
    store: Arc<SqliteStore>,
    collection: String,
    query: ScanQuery,
    builder: RowBuilder,
    cancel: CancellationToken,
) -> RowStream {
    let (tx, rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
    let token = cancel.clone();
    let runtime = Handle::current();

    tokio::task::spawn_blocking(move || {
        let result = store.with_connection(|conn| -> Result<ScanSummary, AdapterError> {
            let mut stmt = conn.prepare(&query.sql)?;
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
            let mut summary = ScanSummary::default();

            loop {
                if token.is_cancelled() {
                    summary.cancelled = true;
                    break;
                }
                let Some(raw) = rows.next()? else {
                    break;
                };
                let fields = read_fields(raw, &names)?;
                match builder.build(fields) {
                    Ok(row) => match deliver(&runtime, &tx, &token, row) {
                        Delivery::Sent => summary.delivered += 1,
                        Delivery::Cancelled => {
                            summary.cancelled = true;
                            break;
                        }
                        Delivery::ConsumerGone => {
                            summary.consumer_gone = true;
                            break;
                        }
                    },
                    Err(e) => {
                        tracing::warn!(collection = %collection, error = %e, "skipping row");
                        summary.skipped += 1;
                    }
                }
            }
            Ok(summary)
        });

        match result {
            Ok(summary) => tracing::debug!(
                collection = %collection,
                delivered = summary.delivered,
                skipped = summary.skipped,
                cancelled = summary.cancelled,
                consumer_gone = summary.consumer_gone,
                "scan finished"
            ),
            Err(e) => tracing::warn!(collection = %collection, error = %e, "scan failed"),
        }
    });

    RowStream { rx, cancel }
}

/// Point lookup of the row whose identity is `id`.
///
/// Queries run in order; later ones are slower fallbacks for the same
/// lookup. A candidate row counts only when its computed identity equals
/// `id`. When candidates matched but none could be given an identity, that
/// identity error is returned instead of "not found".
pub(crate) async fn lookup(
    store: Arc<SqliteStore>,
    queries: Vec<ScanQuery>,
    builder: RowBuilder,
    id: String,
) -> Result<Option<Row>, AdapterError> {
    tokio::task::spawn_blocking(move || {
        store.with_connection(|conn| -> Result<Option<Row>, AdapterError> {
            let mut unusable = None;
            for query in &queries {
                let mut stmt = conn.prepare(&query.sql)?;
                let names: Vec<String> =
                    stmt.column_names().into_iter().map(String::from).collect();
                let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
                while let Some(raw) = rows.next()? {
                    match builder.build(read_fields(raw, &names)?) {
                        Ok(row) if row.id == id => return Ok(Some(row)),
                        Ok(_) => {}
                        Err(e) => {
                            unusable.get_or_insert(e);
                        }
                    }
                }
            }
            match unusable {
                Some(e) => Err(e.into()),
                None => Ok(None),
            }
        })
    })
    .await
    .map_err(|e| AdapterError::Internal(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::OpenStore;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn numbers_store(dir: &TempDir, count: i64) -> Arc<SqliteStore> {
        let path = dir.path().join("numbers.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE n (id INTEGER PRIMARY KEY, label TEXT);")
            .unwrap();
        for i in 1..=count {
            conn.execute("INSERT INTO n VALUES (?1, ?2)", rusqlite::params![i, format!("n{}", i)])
                .unwrap();
        }
        drop(conn);
        Arc::new(SqliteStore::open(&path).unwrap())
    }

    fn scan_all(store: Arc<SqliteStore>, cancel: CancellationToken) -> RowStream {
        spawn_scan(
            store,
            "n".into(),
            ScanQuery::new("SELECT * FROM n ORDER BY id", vec![]),
            RowBuilder::vertex("id"),
            cancel,
        )
    }

    #[tokio::test]
    async fn scan_delivers_every_row() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 25);
        let rows = scan_all(store, CancellationToken::new()).collect().await;
        assert_eq!(rows.len(), 25);
        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[24].id, "25");
    }

    #[tokio::test]
    async fn cancelled_stream_yields_nothing_more() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 100);
        let cancel = CancellationToken::new();
        let mut stream = scan_all(store, cancel.clone());

        assert!(stream.next().await.is_some());
        cancel.cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn take_cancels_after_limit() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 50);
        let cancel = CancellationToken::new();
        let rows = scan_all(store, cancel.clone()).take(3).await;
        assert_eq!(rows.len(), 3);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn failing_query_ends_stream_without_rows() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 5);
        let stream = spawn_scan(
            store,
            "missing".into(),
            ScanQuery::new("SELECT * FROM missing", vec![]),
            RowBuilder::vertex("id"),
            CancellationToken::new(),
        );
        assert!(stream.collect().await.is_empty());
    }

    #[tokio::test]
    async fn empty_stream_ends_immediately() {
        let mut stream = RowStream::empty(CancellationToken::new());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn lookup_returns_none_when_nothing_matches() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 3);
        let found = lookup(
            store,
            vec![ScanQuery::new("SELECT * FROM n WHERE id = ?1", vec!["999".into()])],
            RowBuilder::vertex("id"),
            "999".into(),
        )
        .await
        .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn producer_stops_when_stream_is_dropped() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 200);
        let mut stream = scan_all(store.clone(), CancellationToken::new());
        assert!(stream.next().await.is_some());
        drop(stream);

        // The producer hands its connection back once it notices
        for _ in 0..200 {
            if store.idle_connections() == 1 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("scan producer never released its connection");
    }

    #[tokio::test]
    async fn lookup_skips_candidates_with_another_identity() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 3);
        // '02' matches the integer key 2 under column affinity, but the
        // row's identity is "2"
        let found = lookup(
            store,
            vec![ScanQuery::new("SELECT * FROM n WHERE id = ?1", vec!["02".into()])],
            RowBuilder::vertex("id"),
            "02".into(),
        )
        .await
        .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn lookup_falls_back_to_later_queries() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 3);
        let found = lookup(
            store,
            vec![
                ScanQuery::new("SELECT * FROM n WHERE label = ?1", vec!["zz".into()]),
                ScanQuery::new("SELECT * FROM n WHERE id = ?1", vec!["2".into()]),
            ],
            RowBuilder::vertex("id"),
            "2".into(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(found.id, "2");
    }

    #[tokio::test]
    async fn cancel_releases_a_parked_producer_without_polling() {
        let dir = TempDir::new().unwrap();
        let store = numbers_store(&dir, 500);
        let cancel = CancellationToken::new();
        let mut stream = scan_all(store.clone(), cancel.clone());
        assert!(stream.next().await.is_some());

        // Let the producer fill the channel and park
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(store.idle_connections(), 0);

        cancel.cancel();
        for _ in 0..200 {
            if store.idle_connections() == 1 {
                drop(stream);
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("cancelled producer kept its connection");
    }
}
