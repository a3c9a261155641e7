//! # labeld
//!
//! An atproto content-labeler service: an authoritative publisher of
//! signed moderation labels.
//!
//! The service keeps an append-only log of secp256k1-signed labels,
//! serves paginated historical queries, accepts authenticated emission
//! commands, and streams new labels to subscribers in real time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use labeld::Labeler;
//! use labeld_auth::HttpDidResolver;
//! use labeld_core::LabelDraft;
//! use labeld_server::LabelerConfig;
//! use labeld_store::SqliteStore;
//!
//! async fn example() {
//!     let config = LabelerConfig::from_strings("did:plc:aaa", "<hex key>").unwrap();
//!     let store = Arc::new(SqliteStore::open("labels.db").unwrap());
//!     let resolver = Arc::new(HttpDidResolver::new());
//!
//!     let labeler = Labeler::new(config, store, resolver, None).await.unwrap();
//!     let stored = labeler
//!         .create_label(LabelDraft::new("did:plc:bbb", "spam"))
//!         .await
//!         .unwrap();
//!     assert!(stored.id > 0);
//! }
//! ```

mod labeler;

pub use labeler::{Labeler, LabelerError};

pub use labeld_auth as auth;
pub use labeld_core as core;
pub use labeld_server as server;
pub use labeld_store as store;
