//! SQLite implementation of the Store trait.
//!
//! The primary backend for the label log. Uses rusqlite with bundled
//! SQLite behind a mutex-held connection, wrapped in async via
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ToSql};

use labeld_core::{Label, Sig, StoredLabel, LABEL_VERSION};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{pattern_to_like, LabelQuery, Store};

/// SQLite-based label store.
///
/// Thread-safe via an internal mutex. All operations run on the blocking
/// pool to avoid stalling the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// The schema is created by [`Store::init`], which must run before the
    /// store sees traffic.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the locked connection on the
    /// blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("connection mutex poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Convert a result row (id, src, uri, cid, val, neg, cts, exp, sig) to a
/// stored label.
fn row_to_stored(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, Label, Vec<u8>)> {
    let id: i64 = row.get(0)?;
    let label = Label {
        ver: LABEL_VERSION,
        src: row.get(1)?,
        uri: row.get(2)?,
        cid: row.get(3)?,
        val: row.get(4)?,
        neg: row.get::<_, i64>(5)? != 0,
        cts: row.get(6)?,
        exp: row.get(7)?,
        sig: None,
    };
    let sig: Vec<u8> = row.get(8)?;
    Ok((id, label, sig))
}

fn finish_stored((id, mut label, sig): (i64, Label, Vec<u8>)) -> Result<StoredLabel> {
    label.sig = Some(
        Sig::from_slice(&sig)
            .map_err(|_| StoreError::InvalidData(format!("label {id} has malformed signature")))?,
    );
    Ok(StoredLabel { id, label })
}

const SELECT_COLS: &str = "SELECT id, src, uri, cid, val, neg, cts, exp, sig FROM labels";

#[async_trait]
impl Store for SqliteStore {
    async fn init(&self) -> Result<()> {
        self.with_conn(|conn| {
            // WAL keeps concurrent readers unblocked during appends. The
            // pragma is a no-op for in-memory databases.
            let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
            migration::migrate(conn)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        // The connection is dropped with the last Arc clone; WAL content is
        // checkpointed by SQLite on close.
        Ok(())
    }

    async fn append(&self, label: &Label) -> Result<i64> {
        let label = label.clone();
        self.with_conn(move |conn| {
            let sig = label
                .sig
                .as_ref()
                .ok_or_else(|| StoreError::InvalidData("refusing to store unsigned label".into()))?;

            conn.execute(
                "INSERT INTO labels (src, uri, cid, val, neg, cts, exp, sig)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    label.src,
                    label.uri,
                    label.cid,
                    label.val,
                    label.neg as i64,
                    label.cts,
                    label.exp,
                    sig.as_bytes().as_slice(),
                ],
            )?;

            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn query(&self, query: &LabelQuery) -> Result<Vec<StoredLabel>> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let mut sql = String::from(SELECT_COLS);
            let mut clauses: Vec<String> = Vec::new();
            let mut args: Vec<Box<dyn ToSql>> = Vec::new();

            if !query.uri_patterns.is_empty() {
                let likes: Vec<String> = query
                    .uri_patterns
                    .iter()
                    .map(|p| {
                        args.push(Box::new(pattern_to_like(p)));
                        format!("uri LIKE ?{} ESCAPE '\\'", args.len())
                    })
                    .collect();
                clauses.push(format!("({})", likes.join(" OR ")));
            }

            if !query.sources.is_empty() {
                let marks: Vec<String> = query
                    .sources
                    .iter()
                    .map(|src| {
                        args.push(Box::new(src.clone()));
                        format!("?{}", args.len())
                    })
                    .collect();
                clauses.push(format!("src IN ({})", marks.join(", ")));
            }

            if query.after_id > 0 {
                args.push(Box::new(query.after_id));
                clauses.push(format!("id > ?{}", args.len()));
            }

            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            args.push(Box::new(query.limit as i64));
            sql.push_str(&format!(" ORDER BY id ASC LIMIT ?{}", args.len()));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
                    row_to_stored,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(finish_stored).collect()
        })
        .await
    }

    async fn scan(&self, after_id: i64, limit: usize) -> Result<Vec<StoredLabel>> {
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare(&format!("{SELECT_COLS} WHERE id > ?1 ORDER BY id ASC LIMIT ?2"))?;
            let rows = stmt
                .query_map(params![after_id, limit as i64], row_to_stored)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter().map(finish_stored).collect()
        })
        .await
    }

    async fn max_id(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let max: i64 =
                conn.query_row("SELECT COALESCE(MAX(id), 0) FROM labels", [], |row| row.get(0))?;
            Ok(max)
        })
        .await
    }
}
