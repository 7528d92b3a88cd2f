use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for services and handlers.
///
/// Payment variants are deliberately distinct from persistence errors: by the
/// time a payment call fails the order row is already saved with
/// `paymentStatus = Pending`, and the customer-facing message has to say so
/// without suggesting the order was lost.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid promo code")]
    InvalidPromoCode,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Payment authentication failed")]
    PaymentAuthFailed,

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Payment service unavailable")]
    PaymentUnavailable,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_) | ServiceError::InvalidPromoCode => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::PaymentAuthFailed
            | ServiceError::PaymentProvider(_)
            | ServiceError::PaymentUnavailable => StatusCode::BAD_GATEWAY,
            ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message surfaced to the client. Internal detail (database errors,
    /// raw provider responses) never leaks here; the only provider text ever
    /// returned verbatim is its own `errorMessage` field.
    pub fn response_message(&self) -> String {
        match self {
            ServiceError::DatabaseError(_) | ServiceError::InternalError(_) => {
                "Something went wrong. Please try again.".to_string()
            }
            ServiceError::NotFound(msg) => msg.clone(),
            ServiceError::ValidationError(msg) => msg.clone(),
            ServiceError::InvalidPromoCode => "Invalid promo code".to_string(),
            ServiceError::Unauthorized(_) => "Unauthorized".to_string(),
            ServiceError::PaymentAuthFailed => "Failed to authenticate with M-Pesa".to_string(),
            ServiceError::PaymentProvider(msg) => msg.clone(),
            ServiceError::PaymentUnavailable => "M-Pesa service unavailable".to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({
            "success": false,
            "message": self.response_message(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request_with_user_message() {
        let err = ServiceError::ValidationError("Missing required fields".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.response_message(), "Missing required fields");
    }

    #[test]
    fn database_errors_never_leak_detail() {
        let err = ServiceError::DatabaseError(sea_orm::DbErr::Custom("secret dsn".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.response_message().contains("secret"));
    }

    #[test]
    fn payment_failures_are_distinct_from_persistence_failures() {
        assert_eq!(
            ServiceError::PaymentAuthFailed.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::PaymentProvider("Invalid Amount".into()).response_message(),
            "Invalid Amount"
        );
        assert_eq!(
            ServiceError::PaymentUnavailable.response_message(),
            "M-Pesa service unavailable"
        );
    }
}
