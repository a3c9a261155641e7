//! # labeld core
//!
//! Label model, deterministic encoding, and signing for the labeld
//! content-labeler service.
//!
//! ## Core Types
//!
//! - [`Label`] — an immutable, signed moderation assertion
//! - [`StoredLabel`] — a label plus its append-log id
//! - [`SigningKey`] / [`PublicKey`] — secp256k1 (and P-256) keys
//! - [`Frame`] — the two-object wire envelope for the subscription stream
//!
//! ## Core Invariants
//!
//! 1. **Stable bytes**: re-encoding a label's signable form reproduces the
//!    exact bytes that were signed
//! 2. **Signature before visibility**: a label is signed before it is stored
//! 3. **Omission over null**: absent optional fields are left out of the
//!    signable encoding entirely

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod label;

pub use crypto::{did_key_from_multibase, PublicKey, Sig, SigningKey};
pub use error::{CoreError, Result};
pub use frame::{Frame, LABELS_TYPE};
pub use label::{
    now_iso8601, validate_val, Label, LabelDraft, StoredLabel, LABEL_VERSION, MAX_VAL_LEN,
};
