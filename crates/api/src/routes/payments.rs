//! Invoice payment routes
//!
//! Thin HTTP shims over the payment ledger: the ledger owns the
//! transactional math, these handlers own the request/response shapes.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use quickmemo_billing::{DeletionOutcome, NewPayment, PaymentOutcome, PaymentRecord};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{auth::AuthTenant, error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AddPaymentRequest {
    pub amount: f64,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub payment_date: Option<OffsetDateTime>,
}

pub async fn add_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<AddPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentOutcome>), ApiError> {
    let outcome = state
        .billing
        .ledger
        .add_payment(
            auth.tenant_id,
            invoice_id,
            NewPayment {
                amount: req.amount,
                payment_method: req.payment_method,
                reference_number: req.reference_number,
                notes: req.notes,
                payment_date: req.payment_date,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<DeletionOutcome>, ApiError> {
    let outcome = state
        .billing
        .ledger
        .delete_payment(auth.tenant_id, payment_id)
        .await?;

    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentRecord>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthTenant>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<PaymentListResponse>, ApiError> {
    let payments = state
        .billing
        .ledger
        .list_payments(auth.tenant_id, invoice_id)
        .await?;

    Ok(Json(PaymentListResponse { payments }))
}
