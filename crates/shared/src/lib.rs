//! Shared foundation for the QuickMemo services.
//!
//! Holds the database pool/migration helpers and the domain vocabulary
//! (statuses, resource kinds, plan limits) used by the billing core, the
//! API server, and the background worker.

pub mod db;
pub mod types;

pub use db::{create_migration_pool, create_pool, run_migrations};
pub use types::{
    InvoiceStatus, Limit, NotificationType, ResourceKind, SubscriptionStatus, UNLIMITED_SENTINEL,
};
