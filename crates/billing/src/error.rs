//! Billing error types

use thiserror::Error;

pub type BillingResult<T> = Result<T, BillingError>;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invoice not found")]
    InvoiceNotFound,

    #[error("payment not found")]
    PaymentNotFound,

    #[error("invoice is void and cannot accept payments")]
    InvoiceVoid,

    #[error("invoice is already fully paid")]
    InvoiceAlreadyPaid,

    #[error("payment of {amount:.2} exceeds the remaining balance; maximum payable is {max_payable:.2}")]
    OverPayment { amount: f64, max_payable: f64 },

    #[error("payment amount must be greater than zero (got {0:.2})")]
    InvalidAmount(f64),

    #[error("resource belongs to a different tenant")]
    TenantMismatch,

    #[error("stored status '{0}' is not a known value")]
    InvalidStoredStatus(String),

    #[error("internal billing error: {0}")]
    Internal(String),
}
