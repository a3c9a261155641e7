//! The sequencer: the single writer of the label log.
//!
//! Accepts unsigned drafts, fills in defaults, signs with the labeler key,
//! commits to the store, and hands the stored label to the broadcaster.
//! The broadcaster's registry mutex is held across the append + enqueue
//! pair, so the order subscribers observe is exactly id order.

use std::sync::Arc;

use thiserror::Error;

use labeld_core::{CoreError, Frame, Label, LabelDraft, SigningKey, StoredLabel};
use labeld_store::{Store, StoreError};

use crate::broadcast::{Broadcaster, LABELS_STREAM};
use crate::config::LabelerConfig;

/// Errors from the write path.
#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("encoding error: {0}")]
    Encoding(#[from] CoreError),
}

/// A resolved emission subject: an account DID or a record URI with an
/// optional version pin.
#[derive(Debug, Clone)]
pub struct LabelSubject {
    pub uri: String,
    pub cid: Option<String>,
}

/// Owns the signing key and write access to the store.
pub struct Sequencer {
    did: String,
    signing_key: SigningKey,
    store: Arc<dyn Store>,
    broadcaster: Arc<Broadcaster>,
}

impl Sequencer {
    pub fn new(
        config: &LabelerConfig,
        store: Arc<dyn Store>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            did: config.did.clone(),
            signing_key: config.signing_key.clone(),
            store,
            broadcaster,
        }
    }

    /// The labeler's DID.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Create one label from a draft: default `src` and `cts`, sign,
    /// append, broadcast. Returns the stored label with its assigned id.
    pub async fn create_label(&self, draft: LabelDraft) -> Result<StoredLabel, SequencerError> {
        let mut label = draft.into_label(&self.did);
        label.sign(&self.signing_key)?;
        self.commit(label).await
    }

    /// Expand an emission into ordered label writes: one non-negating
    /// label per `create` value, then one negating label per `negate`
    /// value. Empty inputs yield an empty list.
    pub async fn create_labels(
        &self,
        subject: &LabelSubject,
        create: &[String],
        negate: &[String],
    ) -> Result<Vec<StoredLabel>, SequencerError> {
        let mut stored = Vec::with_capacity(create.len() + negate.len());

        for (vals, neg) in [(create, false), (negate, true)] {
            for val in vals {
                let draft = LabelDraft {
                    uri: subject.uri.clone(),
                    val: val.clone(),
                    cid: subject.cid.clone(),
                    neg: Some(neg),
                    ..LabelDraft::default()
                };
                stored.push(self.create_label(draft).await?);
            }
        }

        Ok(stored)
    }

    /// Append + enqueue under the registry mutex.
    async fn commit(&self, label: Label) -> Result<StoredLabel, SequencerError> {
        let mut registry = self.broadcaster.lock().await;

        let id = self.store.append(&label).await?;
        let stored = StoredLabel { id, label };

        let frame = Frame::from_stored(&stored).encode()?;
        registry.publish(LABELS_STREAM, &frame);

        tracing::debug!(
            id = stored.id,
            uri = %stored.label.uri,
            val = %stored.label.val,
            neg = stored.label.neg,
            "label committed"
        );
        Ok(stored)
    }
}
