//! Error types for authentication and DID resolution.

use thiserror::Error;

/// Errors from JWT verification and DID resolution.
///
/// The JWT variants mirror the wire-level error kinds one-for-one so the
/// service shell can map them without inspection.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed JWT: {0}")]
    BadJwt(String),

    #[error("JWT has expired")]
    JwtExpired,

    #[error("JWT audience does not match this labeler")]
    BadJwtAudience,

    #[error("JWT lexicon method does not match this procedure")]
    BadJwtLexiconMethod,

    #[error("JWT signature verification failed")]
    BadJwtSignature,

    #[error("DID resolution failed: {0}")]
    Resolution(String),
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;
