//! Plan limit resolution
//!
//! Answers "what is this tenant allowed to do right now?" by joining the
//! tenant's subscription to its plan. Only rows with `status = 'active'` and
//! an unexpired term qualify: a subscription in its grace period carries no
//! limits here and resolves the same as having no subscription at all.

use quickmemo_shared::{Limit, ResourceKind};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::BillingResult;

/// The resolved limits of a tenant's active plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanLimits {
    pub plan_name: String,
    pub max_categories: Limit,
    pub max_products: Limit,
    pub max_orders_per_month: Limit,
    pub can_upload_images: bool,
}

impl PlanLimits {
    /// The cap governing a countable resource kind. Image uploads are
    /// permission-gated, not counted, so they carry no cap here.
    pub fn cap_for(&self, kind: ResourceKind) -> Option<Limit> {
        match kind {
            ResourceKind::Product => Some(self.max_products),
            ResourceKind::Category => Some(self.max_categories),
            ResourceKind::Order => Some(self.max_orders_per_month),
            ResourceKind::ImageUpload => None,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanLimitRow {
    plan_name: String,
    max_categories: i32,
    max_products: i32,
    max_orders_per_month: i32,
    can_upload_images: bool,
}

/// Resolves the plan limits attached to a tenant's active subscription.
#[derive(Clone)]
pub struct PlanLimitService {
    pool: PgPool,
}

impl PlanLimitService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up the tenant's active subscription and return its plan limits.
    ///
    /// Returns `None` when the tenant has no qualifying subscription, which
    /// is distinct from an unlimited plan (`Limit::Unlimited` fields).
    pub async fn resolve(&self, tenant_id: Uuid) -> BillingResult<Option<PlanLimits>> {
        let row: Option<PlanLimitRow> = sqlx::query_as(
            r#"
            SELECT
                p.name AS plan_name,
                p.max_categories,
                p.max_products,
                p.max_orders_per_month,
                p.can_upload_images
            FROM subscriptions s
            JOIN subscription_plans p ON p.id = s.plan_id
            WHERE s.tenant_id = $1
              AND s.status = 'active'
              AND s.end_date > NOW()
            ORDER BY s.end_date DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| PlanLimits {
            plan_name: r.plan_name,
            max_categories: Limit::from_raw(r.max_categories),
            max_products: Limit::from_raw(r.max_products),
            max_orders_per_month: Limit::from_raw(r.max_orders_per_month),
            can_upload_images: r.can_upload_images,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(products: i32, categories: i32, orders: i32) -> PlanLimits {
        PlanLimits {
            plan_name: "starter".to_string(),
            max_categories: Limit::from_raw(categories),
            max_products: Limit::from_raw(products),
            max_orders_per_month: Limit::from_raw(orders),
            can_upload_images: false,
        }
    }

    #[test]
    fn cap_for_selects_the_matching_field() {
        let l = limits(10, 20, -1);
        assert_eq!(l.cap_for(ResourceKind::Product), Some(Limit::Capped(10)));
        assert_eq!(l.cap_for(ResourceKind::Category), Some(Limit::Capped(20)));
        assert_eq!(l.cap_for(ResourceKind::Order), Some(Limit::Unlimited));
    }

    #[test]
    fn image_uploads_have_no_cap() {
        assert_eq!(limits(1, 1, 1).cap_for(ResourceKind::ImageUpload), None);
    }
}
