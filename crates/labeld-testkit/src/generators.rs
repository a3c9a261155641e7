//! Proptest generators for property-based testing.

use proptest::prelude::*;

use labeld_core::{Label, LabelDraft, SigningKey};

/// Generate a deterministic signing key from an arbitrary seed.
pub fn signing_key() -> impl Strategy<Value = SigningKey> {
    any::<[u8; 32]>().prop_filter_map("seed must be a valid scalar", |seed| {
        SigningKey::from_bytes(&seed).ok()
    })
}

/// Generate a plausible account DID.
pub fn did() -> impl Strategy<Value = String> {
    "[a-z2-7]{8,24}".prop_map(|id| format!("did:plc:{id}"))
}

/// Generate a subject URI: an account DID or a record URI.
pub fn subject_uri() -> impl Strategy<Value = String> {
    prop_oneof![
        did(),
        ("[a-z2-7]{8,16}", "[a-z0-9]{4,13}")
            .prop_map(|(id, rkey)| format!("at://did:plc:{id}/app.bsky.feed.post/{rkey}")),
    ]
}

/// Generate a label vocabulary value.
pub fn label_val() -> impl Strategy<Value = String> {
    "!?[a-z][a-z-]{0,30}".prop_map(String::from)
}

/// Generate an ISO-8601 timestamp within a plausible range.
pub fn timestamp() -> impl Strategy<Value = String> {
    (2020i32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, mo, d, h, mi, s)| format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}.000Z"),
    )
}

/// Generate a full label draft.
pub fn label_draft() -> impl Strategy<Value = LabelDraft> {
    (
        subject_uri(),
        label_val(),
        proptest::option::of("[a-z2-7]{20,40}"),
        proptest::option::of(any::<bool>()),
        proptest::option::of(timestamp()),
        proptest::option::of(timestamp()),
    )
        .prop_map(|(uri, val, cid, neg, cts, exp)| LabelDraft {
            uri,
            val,
            src: None,
            cid,
            neg,
            cts,
            exp,
        })
}

/// Generate a signed label issued by the given source DID.
pub fn signed_label(src: &str) -> impl Strategy<Value = Label> {
    let src = src.to_string();
    (label_draft(), signing_key()).prop_map(move |(draft, key)| {
        let mut label = draft.into_label(&src);
        label.sign(&key).expect("signing a generated label");
        label
    })
}
