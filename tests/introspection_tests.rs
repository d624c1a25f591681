//! Catalog introspection and the collections it produces

mod common;

use common::Fixture;
use std::collections::BTreeMap;
use tablegraph::{
    AdapterError, CollectionKind, OpenStore, SchemaError, SchemaIntrospector, SqlValue,
    SqliteStore,
};

fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

#[test]
fn social_schema_yields_person_and_both_friend_directions() {
    let fixture = Fixture::social();
    let registry = fixture.registry();

    assert_eq!(registry.names(), vec!["friend:dst", "friend:src", "person"]);
    assert_eq!(registry.names_of(CollectionKind::Vertex), vec!["person"]);
    assert_eq!(
        registry.names_of(CollectionKind::Edge),
        vec!["friend:dst", "friend:src"]
    );
}

#[test]
fn table_without_primary_key_is_not_a_vertex() {
    let fixture = Fixture::social();
    let registry = fixture.registry();
    assert!(!registry.contains("log"));
    assert!(!registry.contains("friend"));
}

#[tokio::test]
async fn vertex_row_carries_every_column() {
    let fixture = Fixture::social();
    let registry = fixture.registry();
    let person = registry.get("person").unwrap();

    assert_eq!(person.fields(), vec!["id", "name"]);
    assert!(person.field_links().is_empty());

    let row = person.fetch_row("alice").await.unwrap();
    assert_eq!(row.id, "alice");
    assert_eq!(row.fields.len(), 2);
    assert_eq!(row.fields["id"], text("alice"));
    assert_eq!(row.fields["name"], text("Alice"));
}

#[tokio::test]
async fn edge_row_is_projected_to_its_endpoints() {
    let fixture = Fixture::social();
    let registry = fixture.registry();
    let forward = registry.get("friend:src").unwrap();

    assert_eq!(forward.fields(), vec!["src", "dst"]);
    let links: BTreeMap<String, String> = forward.field_links();
    assert_eq!(links["src"], "person");
    assert_eq!(links["dst"], "person");

    let row = forward.fetch_row("alice:bob").await.unwrap();
    assert_eq!(row.id, "alice:bob");
    assert_eq!(row.fields.len(), 2);
    assert_eq!(row.fields["src"], text("alice"));
    assert_eq!(row.fields["dst"], text("bob"));
}

#[tokio::test]
async fn reverse_edge_collection_swaps_endpoints() {
    let fixture = Fixture::social();
    let registry = fixture.registry();
    let reverse = registry.get("friend:dst").unwrap();

    assert_eq!(reverse.fields(), vec!["dst", "src"]);
    let row = reverse.fetch_row("bob:alice").await.unwrap();
    assert_eq!(row.id, "bob:alice");

    let err = reverse.fetch_row("alice:bob").await.unwrap_err();
    assert!(matches!(err, AdapterError::RowNotFound { .. }));
}

#[tokio::test]
async fn edge_id_without_separator_is_malformed() {
    let fixture = Fixture::social();
    let registry = fixture.registry();
    let err = registry
        .get("friend:src")
        .unwrap()
        .fetch_row("alicebob")
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::MalformedEdgeId(id) if id == "alicebob"));
}

#[tokio::test]
async fn keyed_table_links_run_from_its_own_key() {
    let fixture = Fixture::new(
        r#"
        CREATE TABLE city (id INTEGER PRIMARY KEY, name TEXT);
        CREATE TABLE resident (
            id TEXT PRIMARY KEY,
            name TEXT,
            city_id INTEGER REFERENCES city(id)
        );
        INSERT INTO city VALUES (1, 'Lisbon'), (2, 'Porto');
        INSERT INTO resident VALUES ('r1', 'Ana', 1), ('r2', 'Rui', 2), ('r3', 'Eva', NULL);
        "#,
    );
    let registry = fixture.registry();

    assert_eq!(registry.names(), vec!["city", "resident", "resident:city_id"]);

    let resident = registry.get("resident").unwrap();
    assert_eq!(resident.field_links()["city_id"], "city");

    let lives_in = registry.get("resident:city_id").unwrap();
    assert_eq!(lives_in.fields(), vec!["id", "city_id"]);
    assert_eq!(lives_in.field_links()["id"], "resident");
    assert_eq!(lives_in.field_links()["city_id"], "city");

    let row = lives_in.fetch_row("r2:2").await.unwrap();
    assert_eq!(row.fields["id"], text("r2"));
    assert_eq!(row.fields["city_id"], text("2"));

    // r3 has no city and cannot form an edge
    let mut ids: Vec<String> = lives_in
        .fetch_rows(Default::default())
        .collect()
        .await
        .into_iter()
        .map(|r| r.id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["r1:1", "r2:2"]);
}

#[test]
fn foreign_key_to_a_non_key_column_forms_no_edge() {
    let registry = Fixture::new(
        r#"
        CREATE TABLE account (id INTEGER PRIMARY KEY, email TEXT UNIQUE);
        CREATE TABLE login (
            id INTEGER PRIMARY KEY,
            email TEXT REFERENCES account(email)
        );
        "#,
    )
    .registry();

    assert_eq!(registry.names(), vec!["account", "login"]);
    assert!(registry.get("login").unwrap().field_links().is_empty());
}

#[test]
fn implicit_foreign_key_target_is_the_primary_key() {
    let registry = Fixture::new(
        r#"
        CREATE TABLE author (handle TEXT PRIMARY KEY);
        CREATE TABLE post (id INTEGER PRIMARY KEY, author TEXT REFERENCES Author);
        "#,
    )
    .registry();

    assert!(registry.contains("post:author"));
    assert_eq!(registry.get("post").unwrap().field_links()["author"], "author");
}

#[test]
fn foreign_key_to_missing_table_is_ignored() {
    let registry = Fixture::new(
        "CREATE TABLE orphan (id INTEGER PRIMARY KEY, ghost_id INTEGER REFERENCES ghost(id));",
    )
    .registry();
    assert_eq!(registry.names(), vec!["orphan"]);
}

#[test]
fn composite_keys_are_excluded() {
    let registry = Fixture::new(
        r#"
        CREATE TABLE shelf (aisle INTEGER, slot INTEGER, PRIMARY KEY (aisle, slot));
        CREATE TABLE book (
            isbn TEXT PRIMARY KEY,
            aisle INTEGER,
            slot INTEGER,
            FOREIGN KEY (aisle, slot) REFERENCES shelf(aisle, slot)
        );
        "#,
    )
    .registry();

    assert_eq!(registry.names(), vec!["book"]);
}

#[tokio::test]
async fn unkeyed_table_links_are_sourced_at_the_rowid() {
    let fixture = Fixture::new(
        r#"
        CREATE TABLE tag (name TEXT PRIMARY KEY);
        CREATE TABLE note (id INTEGER PRIMARY KEY);
        CREATE TABLE mention (note_id INTEGER REFERENCES note(id));
        CREATE TABLE triple (
            a TEXT REFERENCES tag(name),
            b TEXT REFERENCES tag(name),
            c TEXT REFERENCES tag(name)
        );
        INSERT INTO note VALUES (10), (11);
        INSERT INTO mention VALUES (10), (11), (10);
        "#,
    );
    let registry = fixture.registry();

    assert_eq!(
        registry.names(),
        vec!["mention:note_id", "note", "tag", "triple:a", "triple:b", "triple:c"]
    );

    let mention = registry.get("mention:note_id").unwrap();
    assert_eq!(mention.fields(), vec!["rowid", "note_id"]);
    assert_eq!(mention.field_links()["note_id"], "note");

    let row = mention.fetch_row("3:10").await.unwrap();
    assert_eq!(row.fields["rowid"], text("3"));
    assert_eq!(row.fields["note_id"], text("10"));

    let triple = registry.get("triple:b").unwrap();
    assert_eq!(triple.fields(), vec!["rowid", "b"]);
    assert_eq!(triple.field_links()["b"], "tag");
}

#[test]
fn unkeyed_without_rowid_table_forms_no_edges() {
    let registry = Fixture::new(
        r#"
        CREATE TABLE tag (name TEXT PRIMARY KEY);
        CREATE TABLE tagging (
            item INTEGER,
            tag TEXT REFERENCES tag(name),
            PRIMARY KEY (item, tag)
        ) WITHOUT ROWID;
        "#,
    )
    .registry();

    assert_eq!(registry.names(), vec!["tag"]);
}

#[tokio::test]
async fn foreign_key_on_the_primary_key_is_a_field_link_only() {
    let fixture = Fixture::new(
        r#"
        CREATE TABLE person (id TEXT PRIMARY KEY, name TEXT);
        CREATE TABLE profile (
            person_id TEXT PRIMARY KEY REFERENCES person(id),
            bio TEXT,
            mentor TEXT REFERENCES person(id)
        );
        INSERT INTO person VALUES ('alice', 'Alice'), ('bob', 'Bob');
        INSERT INTO profile VALUES ('alice', 'hi', 'bob');
        "#,
    );
    let registry = fixture.registry();

    assert_eq!(registry.names(), vec!["person", "profile", "profile:mentor"]);

    let profile = registry.get("profile").unwrap();
    let links = profile.field_links();
    assert_eq!(links.len(), 2);
    assert_eq!(links["person_id"], "person");
    assert_eq!(links["mentor"], "person");

    let mentor = registry.get("profile:mentor").unwrap();
    assert_eq!(mentor.fields(), vec!["person_id", "mentor"]);
    assert_eq!(mentor.field_links()["person_id"], "profile");
    assert_eq!(mentor.fetch_row("alice:bob").await.unwrap().id, "alice:bob");
}

#[test]
fn views_and_internal_tables_are_not_collections() {
    let fixture = Fixture::new(
        r#"
        CREATE TABLE counter (id INTEGER PRIMARY KEY AUTOINCREMENT, n INTEGER);
        INSERT INTO counter (n) VALUES (1);
        CREATE VIEW big_counters AS SELECT * FROM counter WHERE n > 0;
        "#,
    );
    let introspector = SchemaIntrospector::new(fixture.store());

    let tables = introspector.list_tables().unwrap();
    assert_eq!(tables, vec!["big_counters", "counter"]);

    let registry = introspector.build_adapters().unwrap();
    assert_eq!(registry.names(), vec!["counter"]);
}

#[test]
fn inspect_reports_columns_and_links() {
    let fixture = Fixture::social();
    let schema = SchemaIntrospector::new(fixture.store()).inspect().unwrap();

    let person = &schema.tables["person"];
    assert_eq!(person.primary_key.as_deref(), Some("id"));
    assert_eq!(person.column_names(), vec!["id", "name"]);
    assert_eq!(person.columns[0].declared_type, "TEXT");

    let friend_links = schema.links_from("friend");
    let columns: Vec<&str> = friend_links
        .iter()
        .map(|l| l.source_column.as_str())
        .collect();
    assert_eq!(columns, vec!["src", "dst"]);
    assert!(friend_links.iter().all(|l| l.target_table == "person"));
}

#[test]
fn unreadable_catalog_produces_no_registry() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("garbage.db");
    std::fs::write(&path, vec![b'x'; 4096]).unwrap();

    let store = std::sync::Arc::new(SqliteStore::open(&path).unwrap());
    let err = SchemaIntrospector::new(store).build_adapters().unwrap_err();
    assert!(matches!(err, SchemaError::CatalogQuery { .. }));
}
