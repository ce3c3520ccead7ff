//! Error taxonomy shared by every engine component.
//!
//! Each module keeps its own `thiserror` enum; [`ErrorKind`] is the common
//! classification the job runner and the API layer use to decide between
//! surfacing, retrying and compensating.

use serde::Serialize;

/// Broad failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input or a precondition that will not change on retry.
    Validation,
    /// Unknown contract, escrow or landlord.
    NotFound,
    /// Conflicting concurrent write or duplicate key outside an idempotent path.
    Conflict,
    /// Store or gateway temporarily unavailable; safe to retry.
    Transient,
    /// The gateway declined a charge or transfer.
    GatewayRejection,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Returns true if the operation may be retried with backoff.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Returns the HTTP status code conventionally used for this class.
    #[must_use]
    pub const fn http_status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::GatewayRejection => 422,
            Self::Transient => 503,
            Self::Internal => 500,
        }
    }
}

/// Implemented by every error type the engine returns.
pub trait Classify {
    /// The failure class of this error.
    fn kind(&self) -> ErrorKind;

    /// Shorthand for `self.kind().is_retryable()`.
    fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
