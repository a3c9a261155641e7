//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system: each migration transforms the
//! schema from version N to N+1. Running them is idempotent.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: the label log.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Append-only label log. AUTOINCREMENT keeps ids strictly
        -- increasing even if the max row were ever deleted externally.
        CREATE TABLE labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            src TEXT NOT NULL,                -- issuer DID
            uri TEXT NOT NULL,                -- subject DID or record URI
            cid TEXT,                         -- optional version pin
            val TEXT NOT NULL,                -- label vocabulary value
            neg INTEGER NOT NULL DEFAULT 0,   -- 1 = negation
            cts TEXT NOT NULL,                -- ISO-8601 creation time
            exp TEXT,                         -- optional ISO-8601 expiry
            sig BLOB NOT NULL                 -- 64-byte compact signature
        );

        CREATE INDEX idx_labels_uri ON labels(uri);
        CREATE INDEX idx_labels_src ON labels(src);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
