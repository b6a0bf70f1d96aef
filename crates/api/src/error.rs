//! API error types and their HTTP mapping
//!
//! Every denial carries a machine-readable `code` alongside the human
//! sentence, and numeric denials (quota limits, over-payment) include the
//! concrete numbers so the dashboard can render them without a follow-up
//! query.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use quickmemo_billing::{BillingError, QuotaDenial};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("access denied")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
    },

    #[error("payment exceeds the remaining balance")]
    PaymentTooLarge { max_payable: f64 },

    #[error("quota denied: {}", .0.code)]
    QuotaDenied(QuotaDenial),

    #[error("internal error")]
    Internal(String),
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Database(e) => ApiError::Database(e.to_string()),
            BillingError::InvoiceNotFound => ApiError::NotFound("invoice"),
            BillingError::PaymentNotFound => ApiError::NotFound("payment"),
            BillingError::InvoiceVoid => ApiError::Conflict {
                code: "INVOICE_VOID",
                message: "This invoice is void and cannot accept payments.".to_string(),
            },
            BillingError::InvoiceAlreadyPaid => ApiError::Conflict {
                code: "INVOICE_ALREADY_PAID",
                message: "This invoice is already fully paid.".to_string(),
            },
            BillingError::OverPayment { max_payable, .. } => {
                ApiError::PaymentTooLarge { max_payable }
            }
            BillingError::InvalidAmount(amount) => ApiError::Validation(format!(
                "Payment amount must be greater than zero (got {amount:.2})."
            )),
            BillingError::TenantMismatch => ApiError::Forbidden,
            BillingError::InvalidStoredStatus(s) => {
                ApiError::Internal(format!("unrecognized stored status '{s}'"))
            }
            BillingError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "A database error occurred", "code": "DATABASE_ERROR" }),
                )
            }
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{what} not found"), "code": "NOT_FOUND" }),
            ),
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": msg, "code": "UNAUTHORIZED" }),
            ),
            // Deliberately vague: does not reveal whether the resource exists.
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "Access denied", "code": "FORBIDDEN" }),
            ),
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg, "code": "VALIDATION_ERROR" }),
            ),
            ApiError::Conflict { code, message } => (
                StatusCode::CONFLICT,
                json!({ "error": message, "code": code }),
            ),
            ApiError::PaymentTooLarge { max_payable } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": format!(
                        "Payment exceeds the remaining balance; maximum payable is {max_payable:.2}."
                    ),
                    "code": "PAYMENT_EXCEEDS_BALANCE",
                    "max_payable": max_payable,
                }),
            ),
            ApiError::QuotaDenied(denial) => {
                let mut body = json!({
                    "error": denial.message,
                    "code": denial.code.as_str(),
                });
                if let Some(limit) = denial.limit {
                    body["limit"] = json!(limit);
                }
                if let Some(current) = denial.current {
                    body["current"] = json!(current);
                }
                (StatusCode::FORBIDDEN, body)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "code": "INTERNAL_ERROR" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickmemo_billing::BillingError;

    #[test]
    fn billing_errors_map_to_distinct_api_errors() {
        assert!(matches!(
            ApiError::from(BillingError::InvoiceNotFound),
            ApiError::NotFound("invoice")
        ));
        assert!(matches!(
            ApiError::from(BillingError::TenantMismatch),
            ApiError::Forbidden
        ));
        assert!(matches!(
            ApiError::from(BillingError::InvoiceVoid),
            ApiError::Conflict { code: "INVOICE_VOID", .. }
        ));
    }

    #[test]
    fn over_payment_keeps_max_payable() {
        let err = ApiError::from(BillingError::OverPayment {
            amount: 50.0,
            max_payable: 30.0,
        });
        match err {
            ApiError::PaymentTooLarge { max_payable } => {
                assert!((max_payable - 30.0).abs() < 1e-9)
            }
            other => panic!("expected PaymentTooLarge, got {other:?}"),
        }
    }
}
