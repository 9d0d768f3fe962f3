//! Schema migrations, tracked in SQLite's `user_version` header field.

use crate::error::{Result, StoreError};
use rusqlite::Connection;

const MIGRATIONS: &[&str] = &[include_str!("../migrations/001_init.sql")];

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let current = schema_version(&tx)?;
    let latest = latest_version();
    let applied = usize::try_from(current)
        .ok()
        .filter(|_| current <= latest)
        .ok_or_else(|| {
            StoreError::Migration(format!(
                "schema version {current} is not supported (latest is {latest})"
            ))
        })?;

    for sql in &MIGRATIONS[applied..] {
        tx.execute_batch(sql)?;
    }
    tx.pragma_update(None, "user_version", latest)?;
    tx.commit()?;
    Ok(())
}

/// 0 for a database that has never been migrated.
pub fn schema_version(conn: &Connection) -> Result<i64> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}
