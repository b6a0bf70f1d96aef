//! Payment ledger
//!
//! Append-only payment records against invoices, with the invoice's
//! `amount_paid` and status derived from the ledger inside the same
//! transaction. The invoice row is locked (`FOR UPDATE`) before totals are
//! read, so two concurrent additions cannot both pass the over-payment
//! check, and the paid total is always recomputed from the payments table
//! rather than adjusted incrementally.

use quickmemo_shared::InvoiceStatus;
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};

/// Absolute tolerance for currency comparisons, absorbing float rounding.
pub const AMOUNT_EPSILON: f64 = 0.01;

/// A single ledger entry.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub payment_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: f64,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    /// Defaults to now when absent.
    pub payment_date: Option<OffsetDateTime>,
}

/// Result of adding a payment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaymentOutcome {
    pub payment: PaymentRecord,
    pub invoice_status: InvoiceStatus,
    pub amount_paid: f64,
    pub remaining_balance: f64,
}

/// Result of deleting a payment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeletionOutcome {
    pub new_amount_paid: f64,
    pub new_status: InvoiceStatus,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    tenant_id: Uuid,
    total_amount: f64,
    status: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentInvoiceRow {
    invoice_id: Uuid,
    tenant_id: Uuid,
    total_amount: f64,
    status: String,
}

/// Derive an invoice's status from its total and the ledger sum.
pub fn derive_status(total_amount: f64, amount_paid: f64) -> InvoiceStatus {
    if amount_paid.abs() < AMOUNT_EPSILON {
        InvoiceStatus::Due
    } else if (total_amount - amount_paid).abs() < AMOUNT_EPSILON {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    }
}

/// Validate a prospective payment against the invoice's current state.
///
/// Checks run in contract order; each failure is a distinct error.
pub fn validate_payment(
    status: InvoiceStatus,
    total_amount: f64,
    current_paid: f64,
    amount: f64,
) -> BillingResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(BillingError::InvalidAmount(amount));
    }
    if status == InvoiceStatus::Void {
        return Err(BillingError::InvoiceVoid);
    }
    if status == InvoiceStatus::Paid {
        return Err(BillingError::InvoiceAlreadyPaid);
    }
    if current_paid + amount > total_amount + AMOUNT_EPSILON {
        return Err(BillingError::OverPayment {
            amount,
            max_payable: (total_amount - current_paid).max(0.0),
        });
    }
    Ok(())
}

/// Ledger operations over invoices and payments.
#[derive(Clone)]
pub struct PaymentLedger {
    pool: PgPool,
}

impl PaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a payment against an invoice and update the invoice's derived
    /// paid amount and status, all in one transaction.
    pub async fn add_payment(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        new: NewPayment,
    ) -> BillingResult<PaymentOutcome> {
        if !new.amount.is_finite() || new.amount <= 0.0 {
            return Err(BillingError::InvalidAmount(new.amount));
        }

        let mut tx = self.pool.begin().await?;

        let invoice: InvoiceRow = sqlx::query_as(
            r#"
            SELECT tenant_id, total_amount, status
            FROM invoices
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BillingError::InvoiceNotFound)?;

        if invoice.tenant_id != tenant_id {
            return Err(BillingError::TenantMismatch);
        }

        let status = InvoiceStatus::parse(&invoice.status)
            .ok_or_else(|| BillingError::InvalidStoredStatus(invoice.status.clone()))?;

        let current_paid = ledger_sum(&mut tx, invoice_id).await?;
        validate_payment(status, invoice.total_amount, current_paid, new.amount)?;

        let payment_date = new.payment_date.unwrap_or_else(OffsetDateTime::now_utc);
        let payment: PaymentRecord = sqlx::query_as(
            r#"
            INSERT INTO payments
                (invoice_id, tenant_id, amount, payment_method, reference_number, notes, payment_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, invoice_id, tenant_id, amount, payment_method,
                      reference_number, notes, payment_date, created_at
            "#,
        )
        .bind(invoice_id)
        .bind(tenant_id)
        .bind(new.amount)
        .bind(&new.payment_method)
        .bind(&new.reference_number)
        .bind(&new.notes)
        .bind(payment_date)
        .fetch_one(&mut *tx)
        .await?;

        let new_paid = current_paid + new.amount;
        let new_status = derive_status(invoice.total_amount, new_paid);

        sqlx::query("UPDATE invoices SET amount_paid = $2, status = $3 WHERE id = $1")
            .bind(invoice_id)
            .bind(new_paid)
            .bind(new_status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            invoice_id = %invoice_id,
            payment_id = %payment.id,
            amount = new.amount,
            new_status = %new_status,
            "Payment recorded"
        );

        Ok(PaymentOutcome {
            payment,
            invoice_status: new_status,
            amount_paid: new_paid,
            remaining_balance: (invoice.total_amount - new_paid).max(0.0),
        })
    }

    /// Delete a payment and recompute the owning invoice's paid amount and
    /// status from the remaining ledger entries.
    ///
    /// The recompute-from-scratch is deliberate: summing what remains cannot
    /// drift, whatever concurrent deletes happened before this one. A void
    /// invoice keeps its void status; only the derived amount changes.
    pub async fn delete_payment(
        &self,
        tenant_id: Uuid,
        payment_id: Uuid,
    ) -> BillingResult<DeletionOutcome> {
        let mut tx = self.pool.begin().await?;

        let row: PaymentInvoiceRow = sqlx::query_as(
            r#"
            SELECT p.invoice_id, i.tenant_id, i.total_amount, i.status
            FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            WHERE p.id = $1
            FOR UPDATE OF i
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(BillingError::PaymentNotFound)?;

        if row.tenant_id != tenant_id {
            return Err(BillingError::TenantMismatch);
        }

        let stored_status = InvoiceStatus::parse(&row.status)
            .ok_or_else(|| BillingError::InvalidStoredStatus(row.status.clone()))?;

        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        let new_paid = ledger_sum(&mut tx, row.invoice_id).await?;
        let new_status = if stored_status == InvoiceStatus::Void {
            InvoiceStatus::Void
        } else {
            derive_status(row.total_amount, new_paid)
        };

        sqlx::query("UPDATE invoices SET amount_paid = $2, status = $3 WHERE id = $1")
            .bind(row.invoice_id)
            .bind(new_paid)
            .bind(new_status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            tenant_id = %tenant_id,
            invoice_id = %row.invoice_id,
            payment_id = %payment_id,
            new_amount_paid = new_paid,
            new_status = %new_status,
            "Payment deleted"
        );

        Ok(DeletionOutcome {
            new_amount_paid: new_paid,
            new_status,
        })
    }

    /// List an invoice's payments, newest first.
    pub async fn list_payments(
        &self,
        tenant_id: Uuid,
        invoice_id: Uuid,
    ) -> BillingResult<Vec<PaymentRecord>> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT tenant_id FROM invoices WHERE id = $1")
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await?;

        match owner {
            None => return Err(BillingError::InvoiceNotFound),
            Some(owner) if owner != tenant_id => return Err(BillingError::TenantMismatch),
            Some(_) => {}
        }

        let payments = sqlx::query_as(
            r#"
            SELECT id, invoice_id, tenant_id, amount, payment_method,
                   reference_number, notes, payment_date, created_at
            FROM payments
            WHERE invoice_id = $1
            ORDER BY payment_date DESC, created_at DESC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

async fn ledger_sum(tx: &mut Transaction<'_, Postgres>, invoice_id: Uuid) -> BillingResult<f64> {
    let sum: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM payments WHERE invoice_id = $1",
    )
    .bind(invoice_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_paid_is_due() {
        assert_eq!(derive_status(100.0, 0.0), InvoiceStatus::Due);
        assert_eq!(derive_status(100.0, 0.005), InvoiceStatus::Due);
    }

    #[test]
    fn partial_paid_is_partial() {
        assert_eq!(derive_status(100.0, 60.0), InvoiceStatus::Partial);
        assert_eq!(derive_status(100.0, 99.98), InvoiceStatus::Partial);
    }

    #[test]
    fn full_paid_is_paid_within_tolerance() {
        assert_eq!(derive_status(100.0, 100.0), InvoiceStatus::Paid);
        assert_eq!(derive_status(100.0, 99.995), InvoiceStatus::Paid);
        assert_eq!(derive_status(100.0, 100.005), InvoiceStatus::Paid);
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(matches!(
            validate_payment(InvoiceStatus::Due, 100.0, 0.0, 0.0),
            Err(BillingError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_payment(InvoiceStatus::Due, 100.0, 0.0, -5.0),
            Err(BillingError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_payment(InvoiceStatus::Due, 100.0, 0.0, f64::NAN),
            Err(BillingError::InvalidAmount(_))
        ));
    }

    #[test]
    fn rejects_void_and_paid_invoices() {
        assert!(matches!(
            validate_payment(InvoiceStatus::Void, 100.0, 0.0, 10.0),
            Err(BillingError::InvoiceVoid)
        ));
        assert!(matches!(
            validate_payment(InvoiceStatus::Paid, 100.0, 100.0, 10.0),
            Err(BillingError::InvoiceAlreadyPaid)
        ));
    }

    #[test]
    fn rejects_over_payment_with_max_payable() {
        match validate_payment(InvoiceStatus::Partial, 100.0, 60.0, 40.02) {
            Err(BillingError::OverPayment { max_payable, .. }) => {
                assert!((max_payable - 40.0).abs() < 1e-9);
            }
            other => panic!("expected over-payment rejection, got {other:?}"),
        }
    }

    #[test]
    fn accepts_exact_remaining_balance() {
        assert!(validate_payment(InvoiceStatus::Partial, 100.0, 60.0, 40.0).is_ok());
        // Within the rounding tolerance.
        assert!(validate_payment(InvoiceStatus::Partial, 100.0, 60.0, 40.005).is_ok());
    }
}
