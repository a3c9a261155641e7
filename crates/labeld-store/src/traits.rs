//! Store trait: the abstract interface for label persistence.
//!
//! This trait keeps the label pipeline storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use labeld_core::{Label, StoredLabel};

use crate::error::Result;

/// Filters for a paginated historical label query.
///
/// All filters combine with AND; patterns within `uri_patterns` combine
/// with OR. Results are always ordered by ascending id.
#[derive(Debug, Clone, Default)]
pub struct LabelQuery {
    /// Subject filters. Each is either an exact URI or a prefix ending in
    /// `*`. Callers validate placement of `*` before reaching the store.
    pub uri_patterns: Vec<String>,
    /// Issuer DIDs to restrict to (empty = any).
    pub sources: Vec<String>,
    /// Only labels with `id > after_id` (0 = from the start).
    pub after_id: i64,
    /// Maximum number of rows returned, applied after ordering.
    pub limit: usize,
}

/// The Store trait: async interface for the append-only label log.
///
/// # Design Notes
///
/// - **Append-only**: labels are inserted, never mutated or deleted.
/// - **Monotonic ids**: ids strictly increase in insertion order; an id is
///   never handed out before the row is visible to `query`/`scan`.
/// - **Batched scans**: `scan` is a strictly id-ascending range read;
///   callers page by passing the last seen id until a short batch comes
///   back.
#[async_trait]
pub trait Store: Send + Sync {
    /// Prepare the backend (schema creation, journal mode). Must complete
    /// before the service accepts traffic.
    async fn init(&self) -> Result<()>;

    /// Release resources. The store must not be used afterwards.
    async fn close(&self) -> Result<()>;

    /// Insert a signed label, returning its newly assigned id.
    async fn append(&self, label: &Label) -> Result<i64>;

    /// Historical query with URI-pattern, source, and cursor filters.
    async fn query(&self, query: &LabelQuery) -> Result<Vec<StoredLabel>>;

    /// Up to `limit` labels with `id > after_id`, ascending.
    async fn scan(&self, after_id: i64, limit: usize) -> Result<Vec<StoredLabel>>;

    /// The highest assigned id, or 0 when the log is empty.
    async fn max_id(&self) -> Result<i64>;
}

/// Escape `%`, `_`, and the escape character itself so user-supplied
/// pattern text matches literally inside a SQL LIKE.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Translate a validated URI pattern into a LIKE expression.
///
/// A trailing `*` becomes a `%` prefix match; anything else matches
/// exactly. `*` placement is validated at the endpoint; the store only
/// sees `*` in final position.
pub fn pattern_to_like(pattern: &str) -> String {
    match pattern.strip_suffix('*') {
        Some(prefix) => format!("{}%", escape_like(prefix)),
        None => escape_like(pattern),
    }
}

/// Check whether a stored URI matches a validated pattern. Mirror of
/// [`pattern_to_like`] for non-SQL backends.
pub fn pattern_matches(pattern: &str, uri: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => uri.starts_with(prefix),
        None => uri == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_escapes_sql_wildcards() {
        assert_eq!(escape_like("a%b_c"), "a\\%b\\_c");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn pattern_to_like_prefix_and_exact() {
        assert_eq!(pattern_to_like("did:plc:bb*"), "did:plc:bb%");
        assert_eq!(pattern_to_like("did:plc:bbb"), "did:plc:bbb");
        // A literal % in the pattern must not act as a wildcard.
        assert_eq!(pattern_to_like("at://a%b*"), "at://a\\%b%");
    }

    #[test]
    fn pattern_matches_mirrors_like() {
        assert!(pattern_matches("did:plc:bb*", "did:plc:bbb"));
        assert!(pattern_matches("did:plc:bb*", "did:plc:bbc"));
        assert!(!pattern_matches("did:plc:bb*", "did:plc:ccc"));
        assert!(pattern_matches("did:plc:bbb", "did:plc:bbb"));
        assert!(!pattern_matches("did:plc:bbb", "did:plc:bbbb"));
    }
}
