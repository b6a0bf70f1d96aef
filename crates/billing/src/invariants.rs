//! Billing Invariants Module
//!
//! Provides runnable consistency checks for the quota and billing core.
//! These invariants can be run after any mutation or on a schedule to
//! ensure the system is in a valid state.
//!
//! ## Design Principles
//!
//! 1. **Executable**: Each invariant is a real SQL query that can be run
//! 2. **Explanatory**: Violations include enough context to debug
//! 3. **Non-destructive**: Checks only read, never write
//! 4. **Complete**: Covers the ledger and lifecycle consistency rules

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::BillingResult;
use crate::ledger::AMOUNT_EPSILON;

/// Result of running a single invariant check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Which invariant was violated
    pub invariant: String,
    /// Tenant(s) affected
    pub tenant_ids: Vec<Uuid>,
    /// Human-readable description of the violation
    pub description: String,
    /// Additional context for debugging
    pub context: serde_json::Value,
    /// Severity level
    pub severity: ViolationSeverity,
}

/// Severity of an invariant violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Critical - money or access may be wrong right now
    Critical,
    /// High - data inconsistency that needs attention
    High,
    /// Medium - potential issue, should investigate
    Medium,
    /// Low - minor inconsistency, informational
    Low,
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationSeverity::Critical => write!(f, "CRITICAL"),
            ViolationSeverity::High => write!(f, "HIGH"),
            ViolationSeverity::Medium => write!(f, "MEDIUM"),
            ViolationSeverity::Low => write!(f, "LOW"),
        }
    }
}

/// Summary of all invariant checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantCheckSummary {
    /// When the check was run
    pub checked_at: OffsetDateTime,
    /// Total number of checks run
    pub checks_run: usize,
    /// Number of checks that passed
    pub checks_passed: usize,
    /// Number of checks that failed
    pub checks_failed: usize,
    /// List of all violations found
    pub violations: Vec<InvariantViolation>,
    /// Overall health status
    pub healthy: bool,
}

/// Row type for ledger drift violation
#[derive(Debug, sqlx::FromRow)]
struct LedgerDriftRow {
    invoice_id: Uuid,
    tenant_id: Uuid,
    amount_paid: f64,
    ledger_sum: f64,
}

/// Row type for over-paid invoice violation
#[derive(Debug, sqlx::FromRow)]
struct OverPaidRow {
    invoice_id: Uuid,
    tenant_id: Uuid,
    total_amount: f64,
    amount_paid: f64,
}

/// Row type for multiple active subscriptions violation
#[derive(Debug, sqlx::FromRow)]
struct MultipleSubsRow {
    tenant_id: Uuid,
    sub_count: i64,
}

/// Row type for grace-end consistency violation
#[derive(Debug, sqlx::FromRow)]
struct GraceEndMismatchRow {
    sub_id: Uuid,
    tenant_id: Uuid,
    status: String,
    grace_period_end: Option<OffsetDateTime>,
}

/// Row type for status/amount disagreement violation
#[derive(Debug, sqlx::FromRow)]
struct StatusMismatchRow {
    invoice_id: Uuid,
    tenant_id: Uuid,
    status: String,
    total_amount: f64,
    amount_paid: f64,
}

/// Service for running billing invariant checks
pub struct InvariantChecker {
    pool: PgPool,
}

impl InvariantChecker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all invariant checks and return summary
    pub async fn run_all_checks(&self) -> BillingResult<InvariantCheckSummary> {
        let now = OffsetDateTime::now_utc();
        let mut violations = Vec::new();

        // Run all checks
        violations.extend(self.check_ledger_matches_amount_paid().await?);
        violations.extend(self.check_no_over_paid_invoice().await?);
        violations.extend(self.check_single_active_subscription().await?);
        violations.extend(self.check_grace_end_matches_status().await?);
        violations.extend(self.check_invoice_status_matches_amounts().await?);

        let checks_run = 5;
        let checks_failed = violations
            .iter()
            .map(|v| &v.invariant)
            .collect::<std::collections::HashSet<_>>()
            .len();
        let checks_passed = checks_run - checks_failed;

        Ok(InvariantCheckSummary {
            checked_at: now,
            checks_run,
            checks_passed,
            checks_failed,
            healthy: violations.is_empty(),
            violations,
        })
    }

    /// Invariant 1: amount_paid equals the ledger sum
    ///
    /// Every invoice's stored amount_paid must equal the sum of its payment
    /// records within the currency tolerance. Drift here means a ledger
    /// mutation bypassed the transactional recompute.
    async fn check_ledger_matches_amount_paid(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<LedgerDriftRow> = sqlx::query_as(
            r#"
            SELECT
                i.id as invoice_id,
                i.tenant_id,
                i.amount_paid,
                COALESCE(SUM(p.amount), 0)::DOUBLE PRECISION as ledger_sum
            FROM invoices i
            LEFT JOIN payments p ON p.invoice_id = i.id
            GROUP BY i.id, i.tenant_id, i.amount_paid
            HAVING ABS(i.amount_paid - COALESCE(SUM(p.amount), 0)) > $1
            "#,
        )
        .bind(AMOUNT_EPSILON)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "ledger_matches_amount_paid".to_string(),
                tenant_ids: vec![row.tenant_id],
                description: format!(
                    "Invoice amount_paid {:.2} does not match ledger sum {:.2}",
                    row.amount_paid, row.ledger_sum
                ),
                context: serde_json::json!({
                    "invoice_id": row.invoice_id,
                    "amount_paid": row.amount_paid,
                    "ledger_sum": row.ledger_sum,
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Invariant 2: no invoice is paid beyond its total
    ///
    /// The ledger rejects over-payment at write time; an over-paid invoice
    /// means that check was bypassed or the total was edited after payment.
    async fn check_no_over_paid_invoice(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<OverPaidRow> = sqlx::query_as(
            r#"
            SELECT
                i.id as invoice_id,
                i.tenant_id,
                i.total_amount,
                i.amount_paid
            FROM invoices i
            WHERE i.amount_paid > i.total_amount + $1
            "#,
        )
        .bind(AMOUNT_EPSILON)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "no_over_paid_invoice".to_string(),
                tenant_ids: vec![row.tenant_id],
                description: format!(
                    "Invoice paid {:.2} against a total of {:.2}",
                    row.amount_paid, row.total_amount
                ),
                context: serde_json::json!({
                    "invoice_id": row.invoice_id,
                    "total_amount": row.total_amount,
                    "amount_paid": row.amount_paid,
                }),
                severity: ViolationSeverity::Critical,
            })
            .collect())
    }

    /// Invariant 3: At most 1 active subscription per tenant
    ///
    /// Multiple active subscriptions would make limit resolution ambiguous
    /// and double-entitle the tenant.
    async fn check_single_active_subscription(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<MultipleSubsRow> = sqlx::query_as(
            r#"
            SELECT tenant_id, COUNT(*) as sub_count
            FROM subscriptions
            WHERE status = 'active'
            GROUP BY tenant_id
            HAVING COUNT(*) > 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "single_active_subscription".to_string(),
                tenant_ids: vec![row.tenant_id],
                description: format!(
                    "Tenant has {} active subscriptions (expected at most 1)",
                    row.sub_count
                ),
                context: serde_json::json!({
                    "subscription_count": row.sub_count,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 4: grace_period_end is set exactly for grace/expired rows
    ///
    /// An active row with grace_period_end, or a grace/expired row without
    /// one, means a transition was applied partially.
    async fn check_grace_end_matches_status(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<GraceEndMismatchRow> = sqlx::query_as(
            r#"
            SELECT
                s.id as sub_id,
                s.tenant_id,
                s.status,
                s.grace_period_end
            FROM subscriptions s
            WHERE (s.status IN ('grace_period', 'expired') AND s.grace_period_end IS NULL)
               OR (s.status = 'active' AND s.grace_period_end IS NOT NULL)
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "grace_end_matches_status".to_string(),
                tenant_ids: vec![row.tenant_id],
                description: format!(
                    "Subscription in status '{}' has grace_period_end = {:?}",
                    row.status, row.grace_period_end
                ),
                context: serde_json::json!({
                    "subscription_id": row.sub_id,
                    "status": row.status,
                    "grace_period_end": row.grace_period_end,
                }),
                severity: ViolationSeverity::High,
            })
            .collect())
    }

    /// Invariant 5: invoice status agrees with its amounts
    ///
    /// paid means settled within tolerance, due means nothing paid, partial
    /// means strictly in between. Void rows are exempt (status is pinned).
    async fn check_invoice_status_matches_amounts(&self) -> BillingResult<Vec<InvariantViolation>> {
        let rows: Vec<StatusMismatchRow> = sqlx::query_as(
            r#"
            SELECT
                i.id as invoice_id,
                i.tenant_id,
                i.status,
                i.total_amount,
                i.amount_paid
            FROM invoices i
            WHERE i.status != 'void'
              AND i.status != CASE
                  WHEN ABS(i.amount_paid) < $1 THEN 'due'
                  WHEN ABS(i.total_amount - i.amount_paid) < $1 THEN 'paid'
                  ELSE 'partial'
              END
            "#,
        )
        .bind(AMOUNT_EPSILON)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvariantViolation {
                invariant: "invoice_status_matches_amounts".to_string(),
                tenant_ids: vec![row.tenant_id],
                description: format!(
                    "Invoice status '{}' disagrees with amounts (paid {:.2} of {:.2})",
                    row.status, row.amount_paid, row.total_amount
                ),
                context: serde_json::json!({
                    "invoice_id": row.invoice_id,
                    "status": row.status,
                    "total_amount": row.total_amount,
                    "amount_paid": row.amount_paid,
                }),
                severity: ViolationSeverity::Medium,
            })
            .collect())
    }
}
