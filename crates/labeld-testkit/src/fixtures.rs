//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a labeler with a fixed
//! identity, an in-memory store, and a static key resolver.

use std::sync::Arc;

use labeld_auth::{EmitAuthorizer, KeyResolver, LabelerOnly};
use labeld_core::{LabelDraft, SigningKey};
use labeld_server::{AppState, LabelerConfig};
use labeld_store::MemoryStore;

use crate::jwt::StaticResolver;

/// The fixture labeler's DID.
pub const TEST_DID: &str = "did:plc:aaa";

/// The fixture signing key: 32 bytes of 0x11.
pub const TEST_KEY_SEED: [u8; 32] = [0x11; 32];

/// A fully wired labeler over an in-memory store.
pub struct TestLabeler {
    pub state: AppState,
    pub signing_key: SigningKey,
}

impl TestLabeler {
    /// Labeler with the default (labeler-only) emit policy and an empty
    /// key resolver.
    pub fn new() -> Self {
        Self::build(
            Arc::new(StaticResolver::empty()),
            Arc::new(LabelerOnly::new(TEST_DID)),
        )
    }

    /// Labeler whose resolver knows the given issuer keys.
    pub fn with_resolver(resolver: StaticResolver) -> Self {
        Self::build(Arc::new(resolver), Arc::new(LabelerOnly::new(TEST_DID)))
    }

    /// Labeler with a custom policy and resolver.
    pub fn with_auth(resolver: StaticResolver, authorizer: Arc<dyn EmitAuthorizer>) -> Self {
        Self::build(Arc::new(resolver), authorizer)
    }

    fn build(resolver: Arc<dyn KeyResolver>, authorizer: Arc<dyn EmitAuthorizer>) -> Self {
        let signing_key = SigningKey::from_bytes(&TEST_KEY_SEED).expect("fixture key");
        let config =
            LabelerConfig::new(TEST_DID, signing_key.clone()).expect("fixture config");
        let state = AppState::new(config, Arc::new(MemoryStore::new()), resolver, authorizer);
        Self { state, signing_key }
    }

    /// The axum router for this labeler.
    pub fn router(&self) -> axum::Router {
        labeld_server::build_router(self.state.clone())
    }
}

impl Default for TestLabeler {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a minimal draft.
pub fn draft(uri: &str, val: &str) -> LabelDraft {
    LabelDraft::new(uri, val)
}
