//! In-memory implementation of the Store trait.
//!
//! Primarily for testing. Same semantics as SQLite but nothing persists.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use labeld_core::{Label, StoredLabel};

use crate::error::{Result, StoreError};
use crate::traits::{pattern_matches, LabelQuery, Store};

/// In-memory label store. Thread-safe via RwLock; all data is lost when
/// the store is dropped.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Labels ordered by id.
    labels: BTreeMap<i64, Label>,
    /// Next id to assign.
    next_id: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                labels: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Task(format!("store lock poisoned: {e}")))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(query: &LabelQuery, label: &Label) -> bool {
    if !query.uri_patterns.is_empty()
        && !query.uri_patterns.iter().any(|p| pattern_matches(p, &label.uri))
    {
        return false;
    }
    if !query.sources.is_empty() && !query.sources.iter().any(|s| s == &label.src) {
        return false;
    }
    true
}

#[async_trait]
impl Store for MemoryStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn append(&self, label: &Label) -> Result<i64> {
        if label.sig.is_none() {
            return Err(StoreError::InvalidData(
                "refusing to store unsigned label".into(),
            ));
        }

        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::Task(format!("store lock poisoned: {e}")))?;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.labels.insert(id, label.clone());
        Ok(id)
    }

    async fn query(&self, query: &LabelQuery) -> Result<Vec<StoredLabel>> {
        let inner = self.read()?;
        Ok(inner
            .labels
            .range((query.after_id + 1)..)
            .filter(|(_, label)| matches(query, label))
            .take(query.limit)
            .map(|(id, label)| StoredLabel {
                id: *id,
                label: label.clone(),
            })
            .collect())
    }

    async fn scan(&self, after_id: i64, limit: usize) -> Result<Vec<StoredLabel>> {
        let inner = self.read()?;
        Ok(inner
            .labels
            .range((after_id + 1)..)
            .take(limit)
            .map(|(id, label)| StoredLabel {
                id: *id,
                label: label.clone(),
            })
            .collect())
    }

    async fn max_id(&self) -> Result<i64> {
        let inner = self.read()?;
        Ok(inner.labels.keys().next_back().copied().unwrap_or(0))
    }
}
