//! The authenticated label-emission endpoint.
//!
//! Accepts a moderation event, authenticates the caller with a service
//! JWT, authorizes via the policy hook, and expands the event into one or
//! more sequenced label writes.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use labeld_auth::EmitAuthorizer;
use labeld_core::{now_iso8601, validate_val};

use crate::error::ApiError;
use crate::sequencer::LabelSubject;
use crate::service::AppState;

/// The lexicon method this endpoint implements; service JWTs must be
/// scoped to it.
pub const EMIT_LXM: &str = "tools.ozone.moderation.emitEvent";

/// Request body for emitEvent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitEventBody {
    pub event: serde_json::Value,
    pub subject: serde_json::Value,
    #[serde(default)]
    pub subject_blob_cids: Option<Vec<String>>,
    pub created_by: String,
}

/// The moderation events this labeler handles, dispatched on `$type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "$type")]
enum ModEvent {
    #[serde(rename = "tools.ozone.moderation.defs#modEventLabel")]
    #[serde(rename_all = "camelCase")]
    Label {
        #[serde(default)]
        create_label_vals: Vec<String>,
        #[serde(default)]
        negate_label_vals: Vec<String>,
    },
}

/// Emission subjects, dispatched on `$type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "$type")]
enum SubjectRef {
    #[serde(rename = "com.atproto.admin.defs#repoRef")]
    Repo { did: String },
    #[serde(rename = "com.atproto.repo.strongRef")]
    Strong { uri: String, cid: String },
}

/// POST /xrpc/tools.ozone.moderation.emitEvent
pub async fn emit_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<EmitEventBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // 1. Authenticate.
    let token = bearer_token(&headers)?;
    let payload = labeld_auth::verify_service_jwt(
        token,
        Some(&state.config.did),
        Some(EMIT_LXM),
        state.resolver.as_ref(),
    )
    .await?;

    // 2. Authorize.
    if !state.authorizer.allow(&payload.iss).await {
        tracing::info!(iss = %payload.iss, "emit denied by policy");
        return Err(ApiError::AuthRequired(format!(
            "{} is not allowed to emit labels",
            payload.iss
        )));
    }

    // 3. Validate the payload.
    let Json(body) = body.map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let event: ModEvent = serde_json::from_value(body.event.clone())
        .map_err(|e| ApiError::InvalidRequest(format!("unsupported event: {e}")))?;
    let ModEvent::Label {
        create_label_vals,
        negate_label_vals,
    } = event;

    if create_label_vals.is_empty() && negate_label_vals.is_empty() {
        return Err(ApiError::InvalidRequest(
            "event must create or negate at least one label value".into(),
        ));
    }
    for val in create_label_vals.iter().chain(&negate_label_vals) {
        validate_val(val).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    }

    let subject: SubjectRef = serde_json::from_value(body.subject.clone())
        .map_err(|e| ApiError::InvalidRequest(format!("unsupported subject: {e}")))?;
    let subject = match subject {
        SubjectRef::Repo { did } => LabelSubject { uri: did, cid: None },
        SubjectRef::Strong { uri, cid } => LabelSubject {
            uri,
            cid: Some(cid),
        },
    };

    // 4. Write.
    let stored = state
        .sequencer
        .create_labels(&subject, &create_label_vals, &negate_label_vals)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let id = stored.first().map_or(0, |s| s.id);

    tracing::info!(
        id,
        count = stored.len(),
        uri = %subject.uri,
        created_by = %body.created_by,
        "moderation event emitted"
    );

    Ok(Json(serde_json::json!({
        "id": id,
        "event": body.event,
        "subject": body.subject,
        "subjectBlobCids": body.subject_blob_cids.unwrap_or_default(),
        "createdBy": body.created_by,
        "createdAt": now_iso8601(),
    })))
}

/// Extract the bearer token. A missing header is an authorization failure;
/// a present-but-malformed one is `MissingJwt`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::AuthRequired("missing authorization header".into()))?;
    header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::MissingJwt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap_err().kind(), "AuthRequired");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers).unwrap_err().kind(), "MissingJwt");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers).unwrap_err().kind(), "MissingJwt");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn mod_event_tag_dispatch() {
        let event: ModEvent = serde_json::from_value(serde_json::json!({
            "$type": "tools.ozone.moderation.defs#modEventLabel",
            "createLabelVals": ["spam"],
            "negateLabelVals": [],
        }))
        .unwrap();
        let ModEvent::Label {
            create_label_vals, ..
        } = event;
        assert_eq!(create_label_vals, vec!["spam"]);

        // Unknown event tags must not deserialize.
        assert!(serde_json::from_value::<ModEvent>(serde_json::json!({
            "$type": "tools.ozone.moderation.defs#modEventAcknowledge",
        }))
        .is_err());
    }

    #[test]
    fn subject_tag_dispatch() {
        let repo: SubjectRef = serde_json::from_value(serde_json::json!({
            "$type": "com.atproto.admin.defs#repoRef",
            "did": "did:plc:bbb",
        }))
        .unwrap();
        assert!(matches!(repo, SubjectRef::Repo { did } if did == "did:plc:bbb"));

        let strong: SubjectRef = serde_json::from_value(serde_json::json!({
            "$type": "com.atproto.repo.strongRef",
            "uri": "at://did:plc:bbb/app.bsky.feed.post/3k",
            "cid": "bafyreib2rxk3rh6kzwq",
        }))
        .unwrap();
        assert!(matches!(strong, SubjectRef::Strong { .. }));

        // A strong ref without a cid is not a strong ref.
        assert!(serde_json::from_value::<SubjectRef>(serde_json::json!({
            "$type": "com.atproto.repo.strongRef",
            "uri": "at://did:plc:bbb/app.bsky.feed.post/3k",
        }))
        .is_err());

        assert!(serde_json::from_value::<SubjectRef>(serde_json::json!({
            "$type": "com.atproto.admin.defs#messageRef",
        }))
        .is_err());
    }
}
