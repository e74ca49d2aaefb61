use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use crate::{
    models::{responses::ApiResponse, types::AccountStatus},
    utils::store::StoreError,
};

/// Business-rule failures. Each leaves stored state exactly as it was before the call.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Account is {status:?} with {outstanding} outstanding; clear dues before booking")]
    AccountBlocked {
        status: AccountStatus,
        outstanding: Decimal,
    },

    #[error("Payment of {amount} was declined")]
    PaymentFailed { amount: Decimal },

    #[error("Invalid extension: {0}")]
    InvalidExtension(String),

    #[error("Invalid booking: {0}")]
    InvalidBooking(String),

    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Session {0} is still open; end and settle it first")]
    SessionInProgress(String),

    #[error("Session {0} has already ended")]
    SessionAlreadyEnded(String),

    #[error("Session {0} has not been ended, so no bill exists yet")]
    BillNotIssued(String),

    #[error("Bill for session {0} has already been settled")]
    BillAlreadySettled(String),

    #[error("No outstanding dues for account {0}")]
    NoOutstandingDues(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::AccountBlocked { .. } => StatusCode::FORBIDDEN,
            EngineError::PaymentFailed { .. } => StatusCode::PAYMENT_REQUIRED,
            EngineError::InvalidExtension(_) | EngineError::InvalidBooking(_) => {
                StatusCode::BAD_REQUEST
            }
            EngineError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::SessionInProgress(_)
            | EngineError::SessionAlreadyEnded(_)
            | EngineError::BillNotIssued(_)
            | EngineError::BillAlreadySettled(_)
            | EngineError::NoOutstandingDues(_) => StatusCode::CONFLICT,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = u32::from(status.as_u16());

        let body = match &self {
            EngineError::AccountBlocked {
                status: account_status,
                outstanding,
            } => ApiResponse::failure_with_data(
                self.to_string(),
                code,
                json!({
                    "status": account_status,
                    "outstanding_amount": outstanding,
                }),
            ),
            EngineError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                ApiResponse::failure("A storage error occurred", code)
            }
            _ => ApiResponse::failure(self.to_string(), code),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_business_errors_to_statuses() {
        let blocked = EngineError::AccountBlocked {
            status: AccountStatus::PaymentPending,
            outstanding: Decimal::from(60),
        };

        assert_eq!(blocked.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            EngineError::PaymentFailed { amount: Decimal::ONE }.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            EngineError::SessionNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::BillAlreadySettled("x".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn blocked_message_names_the_dues() {
        let blocked = EngineError::AccountBlocked {
            status: AccountStatus::PaymentPending,
            outstanding: Decimal::from(60),
        };
        assert!(blocked.to_string().contains("60"));
    }
}
