//! # labeld testkit
//!
//! Testing utilities for the labeld service:
//!
//! - **Fixtures**: a fully wired labeler over an in-memory store with a
//!   fixed identity (`did:plc:aaa`, key = 32 bytes of 0x11)
//! - **JWT forging**: mint service tokens and resolve issuers from a
//!   static table, no network involved
//! - **Generators**: proptest strategies for drafts and labels

pub mod fixtures;
pub mod generators;
pub mod jwt;

pub use fixtures::{draft, TestLabeler, TEST_DID, TEST_KEY_SEED};
pub use jwt::{mint_service_jwt, StaticResolver};
