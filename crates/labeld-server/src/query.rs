//! The historical label query endpoint.

use axum::extract::{Query, State};
use axum::Json;

use labeld_store::{LabelQuery, Store};

use crate::error::ApiError;
use crate::service::AppState;

/// Default page size.
pub const DEFAULT_LIMIT: usize = 50;

/// Inclusive limit bounds.
pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 250;

/// GET /xrpc/com.atproto.label.queryLabels
///
/// Parameters arrive as repeated query pairs (`uriPatterns` and `sources`
/// may appear any number of times).
pub async fn query_labels(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let query = parse_query_params(&pairs)?;
    let stored = state.store.query(&query).await?;

    let cursor = stored.last().map_or(0, |s| s.id);
    let labels: Vec<serde_json::Value> = stored.iter().map(|s| s.label.to_json()).collect();

    Ok(Json(serde_json::json!({
        "cursor": cursor.to_string(),
        "labels": labels,
    })))
}

/// Validate and translate the public query contract into a store query.
pub fn parse_query_params(pairs: &[(String, String)]) -> Result<LabelQuery, ApiError> {
    let mut query = LabelQuery {
        limit: DEFAULT_LIMIT,
        ..LabelQuery::default()
    };

    for (key, value) in pairs {
        match key.as_str() {
            "uriPatterns" => {
                // A lone `*` matches everything: no filter at all.
                if value == "*" {
                    continue;
                }
                if let Some(pos) = value.find('*') {
                    if pos != value.len() - 1 {
                        return Err(ApiError::InvalidRequest(format!(
                            "uriPattern may only end with '*': {value:?}"
                        )));
                    }
                }
                query.uri_patterns.push(value.clone());
            }
            "sources" => query.sources.push(value.clone()),
            "limit" => {
                let limit: usize = value.parse().map_err(|_| {
                    ApiError::InvalidRequest(format!("limit must be an integer: {value:?}"))
                })?;
                if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
                    return Err(ApiError::InvalidRequest(format!(
                        "limit must be between {MIN_LIMIT} and {MAX_LIMIT}, got {limit}"
                    )));
                }
                query.limit = limit;
            }
            "cursor" => {
                let cursor: i64 = value.parse().map_err(|_| {
                    ApiError::InvalidRequest(format!("cursor must be an integer: {value:?}"))
                })?;
                if cursor < 0 {
                    return Err(ApiError::InvalidRequest(format!(
                        "cursor must be non-negative, got {cursor}"
                    )));
                }
                query.after_id = cursor;
            }
            // Unknown parameters are ignored, per xrpc convention.
            _ => {}
        }
    }

    Ok(query)
}
