//! Domain vocabulary shared across crates.
//!
//! Statuses are stored as lowercase TEXT in Postgres and compared as strings
//! in SQL; these enums are the typed form used at decision sites. Plan limits
//! are stored with a `-1` "unlimited" sentinel and surface in Rust only as
//! the tagged [`Limit`] type.

use serde::{Deserialize, Serialize};

/// Stored integer value meaning "no cap" on a plan limit column.
pub const UNLIMITED_SENTINEL: i32 = -1;

/// Lifecycle state of a subscription row.
///
/// Transitions are one-directional: `Active` → `GracePeriod` → `Expired`.
/// A renewal creates a new row rather than reviving an old one. `Cancelled`
/// is a terminal state set outside the lifecycle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    GracePeriod,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::GracePeriod => "grace_period",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "grace_period" => Some(SubscriptionStatus::GracePeriod),
            "expired" => Some(SubscriptionStatus::Expired),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state of an invoice, derived from its ledger.
///
/// `Void` is a sink: a void invoice accepts no further payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Due,
    Partial,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Due => "due",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "due" => Some(InvoiceStatus::Due),
            "partial" => Some(InvoiceStatus::Partial),
            "paid" => Some(InvoiceStatus::Paid),
            "void" => Some(InvoiceStatus::Void),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification categories produced by the subscription lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    SubscriptionExpiring,
    SubscriptionGracePeriod,
    SubscriptionExpired,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::SubscriptionExpiring => "subscription_expiring",
            NotificationType::SubscriptionGracePeriod => "subscription_grace_period",
            NotificationType::SubscriptionExpired => "subscription_expired",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource kinds subject to plan quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Product,
    Category,
    Order,
    ImageUpload,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Product => "product",
            ResourceKind::Category => "category",
            ResourceKind::Order => "order",
            ResourceKind::ImageUpload => "image_upload",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A plan limit: either uncapped or a hard cap.
///
/// Storage uses `-1` for "unlimited"; that sentinel is converted here at the
/// database boundary so comparison sites never see a signed magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unlimited,
    Capped(u32),
}

impl Limit {
    /// Convert a stored limit column value. Negative values mean unlimited.
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            Limit::Unlimited
        } else {
            Limit::Capped(raw as u32)
        }
    }

    /// The stored representation (`-1` for unlimited).
    pub fn as_raw(&self) -> i32 {
        match self {
            Limit::Unlimited => UNLIMITED_SENTINEL,
            Limit::Capped(n) => *n as i32,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// Whether `current` consumption has reached this limit.
    pub fn is_reached(&self, current: u64) -> bool {
        match self {
            Limit::Unlimited => false,
            Limit::Capped(n) => current >= u64::from(*n),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i32::deserialize(deserializer)?;
        Ok(Limit::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_from_raw_maps_negative_to_unlimited() {
        assert_eq!(Limit::from_raw(-1), Limit::Unlimited);
        assert_eq!(Limit::from_raw(-42), Limit::Unlimited);
        assert_eq!(Limit::from_raw(0), Limit::Capped(0));
        assert_eq!(Limit::from_raw(5), Limit::Capped(5));
    }

    #[test]
    fn limit_round_trips_through_raw() {
        for raw in [-1, 0, 1, 250] {
            let limit = Limit::from_raw(raw);
            let expected = if raw < 0 { UNLIMITED_SENTINEL } else { raw };
            assert_eq!(limit.as_raw(), expected);
        }
    }

    #[test]
    fn capped_limit_boundary() {
        let limit = Limit::Capped(5);
        assert!(!limit.is_reached(4));
        assert!(limit.is_reached(5));
        assert!(limit.is_reached(6));
    }

    #[test]
    fn unlimited_is_never_reached() {
        assert!(!Limit::Unlimited.is_reached(u64::MAX));
    }

    #[test]
    fn zero_cap_blocks_everything() {
        assert!(Limit::Capped(0).is_reached(0));
    }

    #[test]
    fn status_string_round_trips() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::GracePeriod,
            SubscriptionStatus::Expired,
            SubscriptionStatus::Cancelled,
        ] {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubscriptionStatus::parse("pending"), None);
    }

    #[test]
    fn invoice_status_string_round_trips() {
        for status in [
            InvoiceStatus::Due,
            InvoiceStatus::Partial,
            InvoiceStatus::Paid,
            InvoiceStatus::Void,
        ] {
            assert_eq!(InvoiceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(InvoiceStatus::parse("open"), None);
    }
}
