//! Mapping of engine errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rentflow_core::contract::ContractError;
use rentflow_core::error::{Classify, ErrorKind};
use rentflow_core::escrow::EscrowError;
use rentflow_core::jobs::JobError;
use rentflow_core::payment::PaymentError;
use rentflow_core::store::StoreError;
use rentflow_core::wallet::WalletError;
use rentflow_shared::AppError;
use serde_json::json;
use tracing::{error, warn};

/// An [`AppError`] plus the domain error code that caused it.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    code: &'static str,
}

impl ApiError {
    /// Wraps an [`AppError`] under its own generic code.
    #[must_use]
    pub const fn new(error: AppError) -> Self {
        let code = error.error_code();
        Self { error, code }
    }

    /// A 400 with a specific code.
    #[must_use]
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: AppError::Validation(message.into()),
            code,
        }
    }

    /// A 401 for unauthenticated callers.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(AppError::Unauthorized(message.into()))
    }

    /// A 404 with a specific code.
    #[must_use]
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: AppError::NotFound(message.into()),
            code,
        }
    }

    /// Builds the response for a classified engine error.
    fn classified(kind: ErrorKind, code: &'static str, message: String) -> Self {
        let error = match kind {
            ErrorKind::Validation => AppError::Validation(message),
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::Conflict => AppError::Conflict(message),
            ErrorKind::Transient => AppError::Unavailable(message),
            ErrorKind::GatewayRejection => AppError::BusinessRule(message),
            ErrorKind::Internal => AppError::Internal(message),
        };
        Self { error, code }
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Error code sent in the body.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self::new(error)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::classified(e.kind(), "STORE_ERROR", e.to_string())
    }
}

macro_rules! classified_error {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(e: $ty) -> Self {
                    Self::classified(e.kind(), e.error_code(), e.to_string())
                }
            }
        )+
    };
}

classified_error!(ContractError, PaymentError, WalletError, EscrowError, JobError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(code = self.code, error = %self.error, "Request failed");
            "An error occurred".to_string()
        } else {
            if status.is_server_error() {
                warn!(code = self.code, error = %self.error, "Dependency unavailable");
            }
            self.error.to_string()
        };
        (
            status,
            Json(json!({
                "error": self.code,
                "message": message
            })),
        )
            .into_response()
    }
}
