//! Subscription lifecycle engine
//!
//! Time-driven state machine over subscription rows:
//!
//! ```text
//! active --(end_date < now, no grace_period_end yet)--> grace_period
//! grace_period --(grace_period_end < now)--> expired
//! ```
//!
//! Both transition passes run in a single transaction per invocation, with
//! each transitioned row's notification inserted in the same transaction:
//! either the whole batch moves or none of it does. The expiry-warning pass
//! runs afterwards, outside that transaction, one offset at a time; it is
//! additive and de-duplicated, so partial completion is harmless and the
//! next run fills any gap.
//!
//! Re-running the engine on unchanged data is a no-op: the status and
//! null-guard predicates exclude already-transitioned rows, and warnings
//! are keyed on `(tenant, days_remaining)` within a 24-hour window.

use quickmemo_shared::NotificationType;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::BillingResult;
use crate::notifications::NotificationDraft;

/// Grace window applied when a subscription row has no explicit override.
pub const DEFAULT_GRACE_PERIOD_DAYS: i32 = 7;

/// Days-before-expiry offsets at which warning notifications fire.
pub const EXPIRY_WARNING_OFFSETS_DAYS: [i32; 3] = [7, 3, 1];

/// What a single engine run did.
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct LifecycleRunSummary {
    pub entered_grace: usize,
    pub expired: usize,
    pub warnings_created: usize,
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    tenant_id: Uuid,
    plan_name: String,
}

/// The lifecycle engine. One instance, driven by the worker's scheduler.
#[derive(Clone)]
pub struct LifecycleEngine {
    pool: PgPool,
}

impl LifecycleEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run both transition passes and the warning pass once.
    pub async fn run_once(&self) -> BillingResult<LifecycleRunSummary> {
        let (entered_grace, expired) = self.process_transitions().await?;
        let warnings_created = self.process_expiry_warnings().await?;

        let summary = LifecycleRunSummary {
            entered_grace,
            expired,
            warnings_created,
        };
        tracing::info!(
            entered_grace = summary.entered_grace,
            expired = summary.expired,
            warnings_created = summary.warnings_created,
            "Subscription lifecycle run complete"
        );
        Ok(summary)
    }

    /// Move overdue subscriptions into their next state, all in one
    /// transaction. Rows are locked before updating so a concurrent run
    /// cannot double-transition them.
    async fn process_transitions(&self) -> BillingResult<(usize, usize)> {
        let mut tx = self.pool.begin().await?;

        let entering_grace: Vec<CandidateRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.tenant_id, p.name AS plan_name
            FROM subscriptions s
            JOIN subscription_plans p ON p.id = s.plan_id
            WHERE s.status = 'active'
              AND s.end_date < NOW()
              AND s.grace_period_end IS NULL
            FOR UPDATE OF s
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for row in &entering_grace {
            let grace_period_end: OffsetDateTime = sqlx::query_scalar(
                r#"
                UPDATE subscriptions
                SET status = 'grace_period',
                    grace_period_end = end_date
                        + make_interval(days => COALESCE(grace_period_days, $2))
                WHERE id = $1
                RETURNING grace_period_end
                "#,
            )
            .bind(row.id)
            .bind(DEFAULT_GRACE_PERIOD_DAYS)
            .fetch_one(&mut *tx)
            .await?;

            let draft = NotificationDraft::grace_period_started(
                &row.plan_name,
                grace_period_end.date(),
                row.id,
            );
            insert_notification(&mut *tx, row.tenant_id, &draft).await?;

            tracing::info!(
                subscription_id = %row.id,
                tenant_id = %row.tenant_id,
                grace_period_end = %grace_period_end,
                "Subscription entered grace period"
            );
        }

        let expiring: Vec<CandidateRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.tenant_id, p.name AS plan_name
            FROM subscriptions s
            JOIN subscription_plans p ON p.id = s.plan_id
            WHERE s.status = 'grace_period'
              AND s.grace_period_end < NOW()
            FOR UPDATE OF s
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for row in &expiring {
            sqlx::query("UPDATE subscriptions SET status = 'expired' WHERE id = $1")
                .bind(row.id)
                .execute(&mut *tx)
                .await?;

            let draft = NotificationDraft::subscription_expired(&row.plan_name, row.id);
            insert_notification(&mut *tx, row.tenant_id, &draft).await?;

            tracing::info!(
                subscription_id = %row.id,
                tenant_id = %row.tenant_id,
                "Subscription expired"
            );
        }

        tx.commit().await?;
        Ok((entering_grace.len(), expiring.len()))
    }

    /// Insert expiry warnings for active subscriptions whose end date lands
    /// exactly `offset` days out, skipping tenants already warned for that
    /// offset in the last 24 hours.
    async fn process_expiry_warnings(&self) -> BillingResult<usize> {
        let mut created = 0usize;

        for offset in EXPIRY_WARNING_OFFSETS_DAYS {
            let candidates: Vec<CandidateRow> = sqlx::query_as(
                r#"
                SELECT s.id, s.tenant_id, p.name AS plan_name
                FROM subscriptions s
                JOIN subscription_plans p ON p.id = s.plan_id
                WHERE s.status = 'active'
                  AND s.end_date::date = CURRENT_DATE + $1
                  AND NOT EXISTS (
                      SELECT 1
                      FROM notifications n
                      WHERE n.tenant_id = s.tenant_id
                        AND n.type = $2
                        AND (n.metadata->>'days_remaining')::INT = $1
                        AND n.created_at > NOW() - INTERVAL '24 hours'
                  )
                "#,
            )
            .bind(offset)
            .bind(NotificationType::SubscriptionExpiring.as_str())
            .fetch_all(&self.pool)
            .await?;

            for row in &candidates {
                let draft = NotificationDraft::expiry_warning(&row.plan_name, offset, row.id);
                insert_notification(&self.pool, row.tenant_id, &draft).await?;

                tracing::info!(
                    subscription_id = %row.id,
                    tenant_id = %row.tenant_id,
                    days_remaining = offset,
                    "Expiry warning sent"
                );
            }

            created += candidates.len();
        }

        Ok(created)
    }
}

async fn insert_notification<'e, E>(
    executor: E,
    tenant_id: Uuid,
    draft: &NotificationDraft,
) -> BillingResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO notifications (tenant_id, type, title, message, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(tenant_id)
    .bind(draft.kind.as_str())
    .bind(&draft.title)
    .bind(&draft.message)
    .bind(&draft.metadata)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_offsets_are_descending_days() {
        assert_eq!(EXPIRY_WARNING_OFFSETS_DAYS, [7, 3, 1]);
    }

    #[test]
    fn default_grace_window_is_a_week() {
        assert_eq!(DEFAULT_GRACE_PERIOD_DAYS, 7);
    }

    #[test]
    fn summary_defaults_to_no_work() {
        let summary = LifecycleRunSummary::default();
        assert_eq!(summary.entered_grace, 0);
        assert_eq!(summary.expired, 0);
        assert_eq!(summary.warnings_created, 0);
    }
}
