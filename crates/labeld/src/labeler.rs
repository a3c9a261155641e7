//! The Labeler: unified API for the labeld service.
//!
//! Brings together configuration, storage, the sequencer, and the xrpc
//! router into one embeddable handle.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use labeld_auth::{EmitAuthorizer, KeyResolver, LabelerOnly};
use labeld_core::{LabelDraft, StoredLabel};
use labeld_server::{AppState, LabelSubject, LabelerConfig, SequencerError};
use labeld_store::{Store, StoreError};

/// Errors from labeler construction and direct label writes.
#[derive(Debug, Error)]
pub enum LabelerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("write failed: {0}")]
    Sequencer(#[from] SequencerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running label pipeline plus its HTTP surface.
pub struct Labeler {
    state: AppState,
}

impl Labeler {
    /// Initialize the store and wire the pipeline. The router returned by
    /// [`Labeler::router`] only exists after `init` has completed, so the
    /// service can never accept traffic against a missing schema.
    pub async fn new(
        config: LabelerConfig,
        store: Arc<dyn Store>,
        resolver: Arc<dyn KeyResolver>,
        authorizer: Option<Arc<dyn EmitAuthorizer>>,
    ) -> Result<Self, LabelerError> {
        store.init().await?;

        let authorizer =
            authorizer.unwrap_or_else(|| Arc::new(LabelerOnly::new(config.did.clone())));
        Ok(Self {
            state: AppState::new(config, store, resolver, authorizer),
        })
    }

    /// The labeler's DID.
    pub fn did(&self) -> &str {
        &self.state.config.did
    }

    /// The xrpc router, for embedding into a larger app or serving.
    pub fn router(&self) -> axum::Router {
        labeld_server::build_router(self.state.clone())
    }

    /// Direct write access for embedders and provisioning jobs; goes
    /// through the same sequencer as the emit endpoint.
    pub async fn create_label(&self, draft: LabelDraft) -> Result<StoredLabel, LabelerError> {
        Ok(self.state.sequencer.create_label(draft).await?)
    }

    /// Batched create/negate writes for one subject.
    pub async fn create_labels(
        &self,
        subject: &LabelSubject,
        create: &[String],
        negate: &[String],
    ) -> Result<Vec<StoredLabel>, LabelerError> {
        Ok(self
            .state
            .sequencer
            .create_labels(subject, create, negate)
            .await?)
    }

    /// Serve until `shutdown` resolves, then drain gracefully.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), LabelerError> {
        let store = self.state.store.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        store.close().await?;
        Ok(())
    }
}
