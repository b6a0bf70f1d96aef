//! Quota gate
//!
//! The pre-mutation check run before a tenant creates a product, category,
//! or order, or uploads a product image. Decisions carry machine-readable
//! denial codes plus the concrete numbers, so the route layer can render
//! "X of Y used" without a follow-up query.
//!
//! Query failures propagate as errors and the caller denies the mutation:
//! the gate fails closed, never open.

use std::future::Future;

use quickmemo_shared::{Limit, ResourceKind};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::BillingResult;
use crate::plans::PlanLimitService;
use crate::usage::UsageCounter;

/// Machine-readable denial codes, one per distinct upgrade prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DenialCode {
    NoSubscription,
    ProductLimitReached,
    CategoryLimitReached,
    OrderLimitReached,
    ImageUploadNotAllowed,
}

impl DenialCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialCode::NoSubscription => "NO_SUBSCRIPTION",
            DenialCode::ProductLimitReached => "PRODUCT_LIMIT_REACHED",
            DenialCode::CategoryLimitReached => "CATEGORY_LIMIT_REACHED",
            DenialCode::OrderLimitReached => "ORDER_LIMIT_REACHED",
            DenialCode::ImageUploadNotAllowed => "IMAGE_UPLOAD_NOT_ALLOWED",
        }
    }

    fn limit_reached(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Product => DenialCode::ProductLimitReached,
            ResourceKind::Category => DenialCode::CategoryLimitReached,
            ResourceKind::Order => DenialCode::OrderLimitReached,
            // Image uploads deny on permission, never on a count.
            ResourceKind::ImageUpload => DenialCode::ImageUploadNotAllowed,
        }
    }
}

impl std::fmt::Display for DenialCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A denied quota check: the code, a human sentence, and the numbers.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QuotaDenial {
    pub code: DenialCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
}

impl QuotaDenial {
    fn no_subscription() -> Self {
        Self {
            code: DenialCode::NoSubscription,
            message: "No active subscription. Choose a plan to continue.".to_string(),
            limit: None,
            current: None,
        }
    }

    fn image_upload_not_allowed() -> Self {
        Self {
            code: DenialCode::ImageUploadNotAllowed,
            message: "Your current plan does not include image uploads.".to_string(),
            limit: None,
            current: None,
        }
    }

    fn limit_reached(kind: ResourceKind, limit: u32, current: u64) -> Self {
        let noun = match kind {
            ResourceKind::Product => "products",
            ResourceKind::Category => "categories",
            ResourceKind::Order => "orders this month",
            ResourceKind::ImageUpload => "image uploads",
        };
        Self {
            code: DenialCode::limit_reached(kind),
            message: format!(
                "Plan limit reached: {current} of {limit} {noun} used. Upgrade your plan to add more."
            ),
            limit: Some(limit),
            current: Some(current),
        }
    }
}

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq)]
pub enum QuotaDecision {
    Allow,
    Deny(QuotaDenial),
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaDecision::Allow)
    }
}

/// Compare a cap against lazily fetched usage.
///
/// The fetch runs only for capped limits: unlimited plans short-circuit to
/// `Allow` without paying the counting cost.
async fn evaluate_cap<F, Fut>(
    kind: ResourceKind,
    limit: Limit,
    fetch_current: F,
) -> BillingResult<QuotaDecision>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = BillingResult<u64>>,
{
    let cap = match limit {
        Limit::Unlimited => return Ok(QuotaDecision::Allow),
        Limit::Capped(n) => n,
    };

    let current = fetch_current().await?;
    if current >= u64::from(cap) {
        Ok(QuotaDecision::Deny(QuotaDenial::limit_reached(
            kind, cap, current,
        )))
    } else {
        Ok(QuotaDecision::Allow)
    }
}

/// The quota gate: plan limits on one side, live usage on the other.
#[derive(Clone)]
pub struct QuotaGate {
    limits: PlanLimitService,
    usage: UsageCounter,
}

impl QuotaGate {
    pub fn new(pool: PgPool) -> Self {
        Self {
            limits: PlanLimitService::new(pool.clone()),
            usage: UsageCounter::new(pool),
        }
    }

    /// Decide whether a tenant may create one more of `kind`.
    pub async fn check(
        &self,
        tenant_id: Uuid,
        kind: ResourceKind,
    ) -> BillingResult<QuotaDecision> {
        let limits = match self.limits.resolve(tenant_id).await? {
            Some(limits) => limits,
            None => {
                tracing::debug!(tenant_id = %tenant_id, kind = %kind, "Quota check denied: no active subscription");
                return Ok(QuotaDecision::Deny(QuotaDenial::no_subscription()));
            }
        };

        let decision = match limits.cap_for(kind) {
            None => {
                // Image upload: a feature flag, not a counted quota.
                if limits.can_upload_images {
                    QuotaDecision::Allow
                } else {
                    QuotaDecision::Deny(QuotaDenial::image_upload_not_allowed())
                }
            }
            Some(limit) => {
                let usage = &self.usage;
                evaluate_cap(kind, limit, || async move {
                    Ok(usage.count(tenant_id).await?.current_for(kind))
                })
                .await?
            }
        };

        if let QuotaDecision::Deny(denial) = &decision {
            tracing::debug!(
                tenant_id = %tenant_id,
                kind = %kind,
                code = %denial.code,
                "Quota check denied"
            );
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    async fn eval(limit: Limit, current: u64) -> QuotaDecision {
        evaluate_cap(ResourceKind::Product, limit, || async move { Ok(current) })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn below_cap_allows() {
        assert_eq!(eval(Limit::Capped(5), 4).await, QuotaDecision::Allow);
    }

    #[tokio::test]
    async fn at_cap_denies_with_numbers() {
        match eval(Limit::Capped(5), 5).await {
            QuotaDecision::Deny(denial) => {
                assert_eq!(denial.code, DenialCode::ProductLimitReached);
                assert_eq!(denial.limit, Some(5));
                assert_eq!(denial.current, Some(5));
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn above_cap_denies() {
        assert!(!eval(Limit::Capped(5), 6).await.is_allowed());
    }

    #[tokio::test]
    async fn unlimited_never_fetches_usage() {
        let calls = AtomicUsize::new(0);
        let decision = evaluate_cap(ResourceKind::Order, Limit::Unlimited, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(u64::MAX)
        })
        .await
        .unwrap();

        assert_eq!(decision, QuotaDecision::Allow);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "usage fetch must not run");
    }

    #[tokio::test]
    async fn capped_fetches_usage_exactly_once() {
        let calls = AtomicUsize::new(0);
        let decision = evaluate_cap(ResourceKind::Category, Limit::Capped(10), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(2)
        })
        .await
        .unwrap();

        assert_eq!(decision, QuotaDecision::Allow);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_cap_denies_at_zero_usage() {
        match eval(Limit::Capped(0), 0).await {
            QuotaDecision::Deny(denial) => {
                assert_eq!(denial.limit, Some(0));
                assert_eq!(denial.current, Some(0));
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn denial_codes_are_stable() {
        assert_eq!(DenialCode::NoSubscription.as_str(), "NO_SUBSCRIPTION");
        assert_eq!(
            DenialCode::ProductLimitReached.as_str(),
            "PRODUCT_LIMIT_REACHED"
        );
        assert_eq!(
            DenialCode::CategoryLimitReached.as_str(),
            "CATEGORY_LIMIT_REACHED"
        );
        assert_eq!(DenialCode::OrderLimitReached.as_str(), "ORDER_LIMIT_REACHED");
        assert_eq!(
            DenialCode::ImageUploadNotAllowed.as_str(),
            "IMAGE_UPLOAD_NOT_ALLOWED"
        );
    }
}
