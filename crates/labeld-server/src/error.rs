//! The wire-level error taxonomy and its single mapping to HTTP statuses
//! and subscription frame strings.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use labeld_auth::AuthError;

/// Subscription frame error kinds (not HTTP errors).
pub const FUTURE_CURSOR: &str = "FutureCursor";
pub const CONSUMER_TOO_SLOW: &str = "ConsumerTooSlow";
pub const INTERNAL_SERVER_ERROR: &str = "InternalServerError";

/// Errors exposed on the wire as `{error, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    AuthRequired(String),

    #[error("malformed authorization header")]
    MissingJwt,

    #[error("{0}")]
    BadJwt(String),

    #[error("JWT has expired")]
    JwtExpired,

    #[error("JWT audience does not match this labeler")]
    BadJwtAudience,

    #[error("JWT lexicon method does not match this procedure")]
    BadJwtLexiconMethod,

    #[error("JWT signature verification failed")]
    BadJwtSignature,

    #[error("method not implemented")]
    MethodNotImplemented,

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    /// The wire error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::AuthRequired(_) => "AuthRequired",
            Self::MissingJwt => "MissingJwt",
            Self::BadJwt(_) => "BadJwt",
            Self::JwtExpired => "JwtExpired",
            Self::BadJwtAudience => "BadJwtAudience",
            Self::BadJwtLexiconMethod => "BadJwtLexiconMethod",
            Self::BadJwtSignature => "BadJwtSignature",
            Self::MethodNotImplemented => "MethodNotImplemented",
            Self::Internal(_) => INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => "ServiceUnavailable",
        }
    }

    /// The HTTP status the kind maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthRequired(_)
            | Self::MissingJwt
            | Self::BadJwt(_)
            | Self::JwtExpired
            | Self::BadJwtAudience
            | Self::BadJwtLexiconMethod
            | Self::BadJwtSignature => StatusCode::UNAUTHORIZED,
            Self::MethodNotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(message = %self, "request failed");
        }
        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::BadJwt(msg) => Self::BadJwt(msg),
            AuthError::JwtExpired => Self::JwtExpired,
            AuthError::BadJwtAudience => Self::BadJwtAudience,
            AuthError::BadJwtLexiconMethod => Self::BadJwtLexiconMethod,
            AuthError::BadJwtSignature => Self::BadJwtSignature,
            // Resolution problems outside the JWT path are server trouble.
            AuthError::Resolution(msg) => Self::Internal(msg),
        }
    }
}

impl From<labeld_store::StoreError> for ApiError {
    fn from(err: labeld_store::StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<labeld_core::CoreError> for ApiError {
    fn from(err: labeld_core::CoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
