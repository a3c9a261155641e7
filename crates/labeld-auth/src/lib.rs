//! # labeld auth
//!
//! Authentication and authorization for the labeld service: verification
//! of inter-service JWTs against the issuer's DID document, DID-document
//! resolution with a TTL cache and key-rotation retry, and the policy hook
//! that gates label emission.

pub mod error;
pub mod jwt;
pub mod policy;
pub mod resolver;

pub use error::{AuthError, Result};
pub use jwt::{verify_service_jwt, JwtPayload};
pub use policy::{AllowList, EmitAuthorizer, LabelerOnly};
pub use resolver::{HttpDidResolver, KeyResolver, CACHE_TTL, DEFAULT_PLC_URL};
