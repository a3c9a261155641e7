//! # labeld server
//!
//! The label pipeline and its service shell: the sequencer (single writer
//! of the append-only log), the subscription broadcaster, and the xrpc
//! endpoints for querying, emitting, and streaming labels.
//!
//! ## Write path
//!
//! emit endpoint → [`Sequencer`] → sign → [`labeld_store::Store::append`]
//! → [`Broadcaster`] fan-out. The append and the broadcast enqueue happen
//! under one mutex, so subscribers observe exactly id order.

pub mod broadcast;
pub mod config;
pub mod emit;
pub mod error;
pub mod query;
pub mod sequencer;
pub mod service;
pub mod subscribe;

pub use broadcast::{Broadcaster, LABELS_STREAM, SUBSCRIBER_QUEUE};
pub use config::{ConfigError, LabelerConfig};
pub use emit::EMIT_LXM;
pub use error::ApiError;
pub use query::{DEFAULT_LIMIT, MAX_LIMIT};
pub use sequencer::{LabelSubject, Sequencer, SequencerError};
pub use service::{build_router, AppState, VERSION};
