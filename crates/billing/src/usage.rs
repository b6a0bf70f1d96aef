//! Tenant usage counting
//!
//! Live consumption counts backing the quota gate. Counts are computed fresh
//! on every call; these guard mutations, not hot read paths, so correctness
//! wins over caching.

use quickmemo_shared::ResourceKind;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::BillingResult;

/// A tenant's current consumption of quota-limited resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct UsageCounts {
    pub product_count: u64,
    pub category_count: u64,
    /// Orders placed since the first day of the current calendar month.
    pub monthly_order_count: u64,
}

impl UsageCounts {
    /// The count relevant to a resource kind. Image uploads are not a
    /// counted resource and always report zero.
    pub fn current_for(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Product => self.product_count,
            ResourceKind::Category => self.category_count,
            ResourceKind::Order => self.monthly_order_count,
            ResourceKind::ImageUpload => 0,
        }
    }
}

/// Computes a tenant's live usage counts.
#[derive(Clone)]
pub struct UsageCounter {
    pool: PgPool,
}

impl UsageCounter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self, tenant_id: Uuid) -> BillingResult<UsageCounts> {
        let product_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        let category_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE tenant_id = $1")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        let monthly_order_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM orders
            WHERE tenant_id = $1
              AND order_date >= date_trunc('month', NOW())
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UsageCounts {
            product_count: product_count.max(0) as u64,
            category_count: category_count.max(0) as u64,
            monthly_order_count: monthly_order_count.max(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_for_maps_kinds_to_counts() {
        let counts = UsageCounts {
            product_count: 3,
            category_count: 7,
            monthly_order_count: 11,
        };
        assert_eq!(counts.current_for(ResourceKind::Product), 3);
        assert_eq!(counts.current_for(ResourceKind::Category), 7);
        assert_eq!(counts.current_for(ResourceKind::Order), 11);
        assert_eq!(counts.current_for(ResourceKind::ImageUpload), 0);
    }
}
