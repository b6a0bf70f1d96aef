//! Tenant notifications
//!
//! Lifecycle events surface to the seller's bell/inbox as notification rows.
//! The `metadata.days_remaining` field of expiry warnings is load-bearing:
//! the lifecycle engine keys its 24-hour de-duplication on it.

use quickmemo_shared::NotificationType;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::BillingResult;

/// A notification row as stored.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A notification yet to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

impl NotificationDraft {
    /// Warning that a subscription expires in `days_remaining` days.
    pub fn expiry_warning(plan_name: &str, days_remaining: i32, subscription_id: Uuid) -> Self {
        let when = if days_remaining == 1 {
            "tomorrow".to_string()
        } else {
            format!("in {days_remaining} days")
        };
        Self {
            kind: NotificationType::SubscriptionExpiring,
            title: "Subscription expiring soon".to_string(),
            message: format!(
                "Your {plan_name} subscription expires {when}. Renew now to keep your shop online."
            ),
            metadata: serde_json::json!({
                "days_remaining": days_remaining,
                "subscription_id": subscription_id,
                "plan": plan_name,
            }),
        }
    }

    /// A subscription's term ended and its grace period began.
    pub fn grace_period_started(
        plan_name: &str,
        grace_period_end: Date,
        subscription_id: Uuid,
    ) -> Self {
        Self {
            kind: NotificationType::SubscriptionGracePeriod,
            title: "Subscription entered grace period".to_string(),
            message: format!(
                "Your {plan_name} subscription has ended. Renew before {grace_period_end} to keep your shop data and settings."
            ),
            metadata: serde_json::json!({
                "grace_period_end": grace_period_end.to_string(),
                "subscription_id": subscription_id,
                "plan": plan_name,
            }),
        }
    }

    /// The grace period ran out.
    pub fn subscription_expired(plan_name: &str, subscription_id: Uuid) -> Self {
        Self {
            kind: NotificationType::SubscriptionExpired,
            title: "Subscription expired".to_string(),
            message: format!(
                "Your {plan_name} subscription has expired. Renew to regain access to your shop."
            ),
            metadata: serde_json::json!({
                "subscription_id": subscription_id,
                "plan": plan_name,
            }),
        }
    }
}

/// Tenant-facing notification operations.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Newest notifications for a tenant.
    pub async fn list(&self, tenant_id: Uuid, limit: i64) -> BillingResult<Vec<Notification>> {
        let rows = sqlx::query_as(
            r#"
            SELECT id, tenant_id, type, title, message, metadata, is_read, created_at
            FROM notifications
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn unread_count(&self, tenant_id: Uuid) -> BillingResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE tenant_id = $1 AND is_read = FALSE",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Mark one notification read. Returns false when the row does not exist
    /// or belongs to another tenant.
    pub async fn mark_read(&self, tenant_id: Uuid, notification_id: Uuid) -> BillingResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND tenant_id = $2")
                .bind(notification_id)
                .bind(tenant_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, tenant_id: Uuid) -> BillingResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE tenant_id = $1 AND is_read = FALSE",
        )
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete the tenant's read notifications.
    pub async fn delete_read(&self, tenant_id: Uuid) -> BillingResult<u64> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE tenant_id = $1 AND is_read = TRUE")
                .bind(tenant_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Worker maintenance: drop read notifications older than `days` days,
    /// across all tenants.
    pub async fn prune_read_older_than(&self, days: i32) -> BillingResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM notifications
            WHERE is_read = TRUE
              AND created_at < NOW() - make_interval(days => $1)
            "#,
        )
        .bind(days)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn expiry_warning_embeds_plan_and_days() {
        let id = Uuid::new_v4();
        let draft = NotificationDraft::expiry_warning("Pro", 7, id);
        assert_eq!(draft.kind, NotificationType::SubscriptionExpiring);
        assert!(draft.message.contains("Pro"));
        assert!(draft.message.contains("in 7 days"));
        assert_eq!(draft.metadata["days_remaining"], 7);
        assert_eq!(draft.metadata["subscription_id"], id.to_string());
    }

    #[test]
    fn one_day_warning_reads_naturally() {
        let draft = NotificationDraft::expiry_warning("Basic", 1, Uuid::new_v4());
        assert!(draft.message.contains("tomorrow"));
        assert_eq!(draft.metadata["days_remaining"], 1);
    }

    #[test]
    fn grace_period_draft_names_the_deadline() {
        let draft = NotificationDraft::grace_period_started(
            "Basic",
            date!(2026 - 08 - 14),
            Uuid::new_v4(),
        );
        assert_eq!(draft.kind, NotificationType::SubscriptionGracePeriod);
        assert!(draft.message.contains("2026-08-14"));
        assert_eq!(draft.metadata["grace_period_end"], "2026-08-14");
    }

    #[test]
    fn expired_draft_names_the_plan() {
        let draft = NotificationDraft::subscription_expired("Pro", Uuid::new_v4());
        assert_eq!(draft.kind, NotificationType::SubscriptionExpired);
        assert!(draft.title.contains("expired"));
        assert!(draft.message.contains("Pro"));
    }
}
