use rsvp_store::migrate::latest_version;
use rsvp_store::Store;
use tempfile::TempDir;

#[test]
fn migrations_apply_once() {
    let store = Store::open_in_memory().expect("open in memory");
    assert_eq!(store.schema_version().expect("version"), 0);

    store.migrate().expect("migrate");
    store.migrate().expect("migrate again");
    assert_eq!(store.schema_version().expect("version"), latest_version());
}

#[test]
fn name_key_is_unique() {
    let store = Store::open_in_memory().expect("open in memory");
    store.migrate().expect("migrate");

    let conn = store.connection();
    conn.execute(
        "INSERT INTO rsvps (id, name, name_key, attending, timestamp) VALUES ('a', 'Ann', 'ann', 1, 1);",
        [],
    )
    .expect("first insert");
    let err = conn
        .execute(
            "INSERT INTO rsvps (id, name, name_key, attending, timestamp) VALUES ('b', 'ANN', 'ann', 0, 2);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("UNIQUE"));
}

#[test]
fn unsupported_schema_version_is_rejected() {
    let store = Store::open_in_memory().expect("open in memory");
    store.migrate().expect("migrate");

    for version in [99, -1] {
        store
            .connection()
            .pragma_update(None, "user_version", version)
            .expect("set version");
        let err = store.migrate().unwrap_err();
        assert!(err.to_string().contains("is not supported"), "{version}");
    }
}

#[test]
fn file_database_uses_wal() {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().join("rsvp.sqlite3");
    let store = Store::open(&path).expect("open");
    store.migrate().expect("migrate");

    let mode: String = store
        .connection()
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .expect("journal mode");
    assert_eq!(mode.to_ascii_lowercase(), "wal");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
