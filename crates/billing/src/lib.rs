// Billing crate clippy configuration
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! QuickMemo Billing Module
//!
//! The subscription, quota, and invoicing core behind the shop dashboard.
//!
//! ## Features
//!
//! - **Plan Limits**: Resolve a tenant's active plan limits
//! - **Usage Counting**: Live product/category/monthly-order counts
//! - **Quota Gate**: Pre-mutation allow/deny decisions with machine codes
//! - **Payment Ledger**: Transactional payment recording with derived
//!   invoice status and over-payment protection
//! - **Lifecycle Engine**: active → grace_period → expired transitions plus
//!   pre-expiry warning notifications
//! - **Notifications**: Tenant inbox rows for lifecycle events
//! - **Invariants**: Runnable consistency checks over the whole core

pub mod error;
pub mod invariants;
pub mod ledger;
pub mod lifecycle;
pub mod notifications;
pub mod plans;
pub mod quota;
pub mod usage;

#[cfg(test)]
mod edge_case_tests;

// Error
pub use error::{BillingError, BillingResult};

// Plans
pub use plans::{PlanLimitService, PlanLimits};

// Usage
pub use usage::{UsageCounter, UsageCounts};

// Quota
pub use quota::{DenialCode, QuotaDecision, QuotaDenial, QuotaGate};

// Ledger
pub use ledger::{
    DeletionOutcome, NewPayment, PaymentLedger, PaymentOutcome, PaymentRecord, AMOUNT_EPSILON,
};

// Lifecycle
pub use lifecycle::{
    LifecycleEngine, LifecycleRunSummary, DEFAULT_GRACE_PERIOD_DAYS, EXPIRY_WARNING_OFFSETS_DAYS,
};

// Notifications
pub use notifications::{Notification, NotificationDraft, NotificationService};

// Invariants
pub use invariants::{
    InvariantCheckSummary, InvariantChecker, InvariantViolation, ViolationSeverity,
};

use sqlx::PgPool;

/// Main billing service that combines all billing functionality
pub struct BillingService {
    pub limits: PlanLimitService,
    pub usage: UsageCounter,
    pub quota: QuotaGate,
    pub ledger: PaymentLedger,
    pub lifecycle: LifecycleEngine,
    pub notifications: NotificationService,
    pub invariants: InvariantChecker,
}

impl BillingService {
    /// Create a new billing service over a database pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            limits: PlanLimitService::new(pool.clone()),
            usage: UsageCounter::new(pool.clone()),
            quota: QuotaGate::new(pool.clone()),
            ledger: PaymentLedger::new(pool.clone()),
            lifecycle: LifecycleEngine::new(pool.clone()),
            notifications: NotificationService::new(pool.clone()),
            invariants: InvariantChecker::new(pool),
        }
    }
}
