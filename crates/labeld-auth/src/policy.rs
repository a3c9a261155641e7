//! Authorization policy for label emission.
//!
//! After JWT verification establishes *who* is calling, the policy decides
//! whether that DID may emit labels. The default admits only the labeler's
//! own DID; deployments plug in their own moderator roster.

use async_trait::async_trait;

/// Decides whether a verified caller may emit moderation events.
#[async_trait]
pub trait EmitAuthorizer: Send + Sync {
    /// True when `did` is allowed to emit.
    async fn allow(&self, did: &str) -> bool;
}

/// Default policy: only the labeler's own DID may emit.
pub struct LabelerOnly {
    labeler_did: String,
}

impl LabelerOnly {
    pub fn new(labeler_did: impl Into<String>) -> Self {
        Self {
            labeler_did: labeler_did.into(),
        }
    }
}

#[async_trait]
impl EmitAuthorizer for LabelerOnly {
    async fn allow(&self, did: &str) -> bool {
        did == self.labeler_did
    }
}

/// Policy backed by an explicit allow-list of DIDs.
pub struct AllowList {
    dids: Vec<String>,
}

impl AllowList {
    pub fn new(dids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            dids: dids.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl EmitAuthorizer for AllowList {
    async fn allow(&self, did: &str) -> bool {
        self.dids.iter().any(|d| d == did)
    }
}
