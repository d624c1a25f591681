//! Shared fixtures for tablegraph integration tests
//!
//! Each fixture writes a fresh SQLite file into its own temp directory, then
//! reopens it through the read-only store the adapters use.

#![allow(dead_code)]

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;
use tablegraph::{AdapterRegistry, OpenStore, SchemaIntrospector, SqliteStore};
use tempfile::TempDir;

/// People and a join table of friendships. A NULL-keyed friendship row and
/// an unkeyed log table ride along to exercise the skip paths.
pub const SOCIAL_SCHEMA: &str = r#"
    CREATE TABLE person (id TEXT PRIMARY KEY, name TEXT);
    CREATE TABLE friend (
        src TEXT REFERENCES person(id),
        dst TEXT REFERENCES person(id)
    );
    CREATE TABLE log (line TEXT);

    INSERT INTO person VALUES ('alice', 'Alice'), ('bob', 'Bob'), ('carol', 'Carol');
    INSERT INTO friend VALUES ('alice', 'bob'), ('bob', 'carol'), ('carol', NULL);
    INSERT INTO log VALUES ('started');
"#;

pub struct Fixture {
    // Held so the directory outlives the store
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    pub fn new(sql: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(sql).unwrap();
        drop(conn);
        Self { _dir: dir, path }
    }

    pub fn social() -> Self {
        Self::new(SOCIAL_SCHEMA)
    }

    /// A keyed table with `rows` integer-keyed rows.
    pub fn numbered(rows: usize) -> Self {
        let fixture = Self::new("CREATE TABLE item (id INTEGER PRIMARY KEY, label TEXT);");
        let mut conn = Connection::open(&fixture.path).unwrap();
        let tx = conn.transaction().unwrap();
        for i in 0..rows {
            tx.execute(
                "INSERT INTO item (id, label) VALUES (?1, ?2)",
                rusqlite::params![i as i64, format!("item-{}", i)],
            )
            .unwrap();
        }
        tx.commit().unwrap();
        fixture
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        Arc::new(SqliteStore::open(&self.path).unwrap())
    }

    pub fn registry(&self) -> AdapterRegistry {
        SchemaIntrospector::new(self.store())
            .build_adapters()
            .unwrap()
    }
}
