// Test file - these are expected patterns in test code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Edge Case Tests for the Quota and Billing Core
//!
//! Tests critical boundary conditions in:
//! - Invoice payment math (LED-01 to LED-08)
//! - Limit handling (LIM-01 to LIM-04)
//! - Lifecycle notification drafts (LC-01 to LC-04)

#[cfg(test)]
mod ledger_math_tests {
    use crate::error::BillingError;
    use crate::ledger::{derive_status, validate_payment, AMOUNT_EPSILON};
    use quickmemo_shared::InvoiceStatus;

    /// Walk an invoice through payments the way the ledger does: validate,
    /// then accumulate and re-derive status.
    fn apply(
        total: f64,
        paid: &mut f64,
        status: &mut InvoiceStatus,
        amount: f64,
    ) -> Result<(), BillingError> {
        validate_payment(*status, total, *paid, amount)?;
        *paid += amount;
        *status = derive_status(total, *paid);
        Ok(())
    }

    // =========================================================================
    // LED-01: 100.00 invoice, pay 60.00 - becomes partial with 40.00 remaining
    // =========================================================================
    #[test]
    fn test_partial_payment_sequence() {
        let total = 100.00;
        let mut paid = 0.0;
        let mut status = InvoiceStatus::Due;

        apply(total, &mut paid, &mut status, 60.00).unwrap();
        assert_eq!(status, InvoiceStatus::Partial);
        assert!((paid - 60.00).abs() < AMOUNT_EPSILON);
        assert!((total - paid - 40.00).abs() < AMOUNT_EPSILON);
    }

    // =========================================================================
    // LED-02: settle the remainder - becomes paid
    // =========================================================================
    #[test]
    fn test_settling_payment_marks_paid() {
        let total = 100.00;
        let mut paid = 0.0;
        let mut status = InvoiceStatus::Due;

        apply(total, &mut paid, &mut status, 60.00).unwrap();
        apply(total, &mut paid, &mut status, 40.00).unwrap();
        assert_eq!(status, InvoiceStatus::Paid);
        assert!((paid - 100.00).abs() < AMOUNT_EPSILON);
    }

    // =========================================================================
    // LED-03: one cent over a settled invoice - rejected, state unchanged
    // =========================================================================
    #[test]
    fn test_payment_against_paid_invoice_rejected() {
        let total = 100.00;
        let mut paid = 0.0;
        let mut status = InvoiceStatus::Due;

        apply(total, &mut paid, &mut status, 100.00).unwrap();
        let before = (paid, status);

        let err = apply(total, &mut paid, &mut status, 0.01).unwrap_err();
        assert!(matches!(err, BillingError::InvoiceAlreadyPaid));
        assert_eq!((paid, status), before, "failed payment must not mutate state");
    }

    // =========================================================================
    // LED-04: over-payment carries the exact maximum payable
    // =========================================================================
    #[test]
    fn test_over_payment_reports_max_payable() {
        match validate_payment(InvoiceStatus::Partial, 100.00, 70.00, 50.00) {
            Err(BillingError::OverPayment {
                amount,
                max_payable,
            }) => {
                assert!((amount - 50.00).abs() < 1e-9);
                assert!((max_payable - 30.00).abs() < 1e-9);
            }
            other => panic!("expected OverPayment, got {other:?}"),
        }
    }

    // =========================================================================
    // LED-05: float dust near the total still settles as paid
    // =========================================================================
    #[test]
    fn test_floating_dust_settles() {
        // Ten payments of 9.99 plus one of 0.10 on a 100.00 invoice.
        let total = 100.00;
        let mut paid = 0.0;
        let mut status = InvoiceStatus::Due;

        for _ in 0..10 {
            apply(total, &mut paid, &mut status, 9.99).unwrap();
        }
        assert_eq!(status, InvoiceStatus::Partial);
        apply(total, &mut paid, &mut status, 0.10).unwrap();
        assert_eq!(status, InvoiceStatus::Paid);
    }

    // =========================================================================
    // LED-06: void invoice accepts nothing
    // =========================================================================
    #[test]
    fn test_void_invoice_is_a_sink() {
        let err = validate_payment(InvoiceStatus::Void, 100.00, 0.0, 1.00).unwrap_err();
        assert!(matches!(err, BillingError::InvoiceVoid));
    }

    // =========================================================================
    // LED-07: deletion recompute - sum of remaining records drives status
    // =========================================================================
    #[test]
    fn test_recompute_after_delete() {
        // Payments 60 and 40 settle the invoice; deleting the 40 leaves a
        // partial invoice, deleting both leaves it due.
        assert_eq!(derive_status(100.00, 60.00 + 40.00), InvoiceStatus::Paid);
        assert_eq!(derive_status(100.00, 60.00), InvoiceStatus::Partial);
        assert_eq!(derive_status(100.00, 0.0), InvoiceStatus::Due);
    }

    // =========================================================================
    // LED-08: precondition order - invalid amount reported before void status
    // =========================================================================
    #[test]
    fn test_invalid_amount_checked_first() {
        let err = validate_payment(InvoiceStatus::Void, 100.00, 0.0, -1.00).unwrap_err();
        assert!(matches!(err, BillingError::InvalidAmount(_)));
    }
}

#[cfg(test)]
mod limit_tests {
    use quickmemo_shared::Limit;

    // =========================================================================
    // LIM-01: the stored -1 sentinel never reaches comparison sites
    // =========================================================================
    #[test]
    fn test_sentinel_becomes_unlimited() {
        assert!(Limit::from_raw(-1).is_unlimited());
        assert!(!Limit::from_raw(-1).is_reached(u64::MAX));
    }

    // =========================================================================
    // LIM-02: cap of 5 with 5 used is reached, with 4 used is not
    // =========================================================================
    #[test]
    fn test_cap_boundary() {
        let cap = Limit::Capped(5);
        assert!(!cap.is_reached(4));
        assert!(cap.is_reached(5));
    }

    // =========================================================================
    // LIM-03: zero cap denies from the start
    // =========================================================================
    #[test]
    fn test_zero_cap() {
        assert!(Limit::Capped(0).is_reached(0));
    }

    // =========================================================================
    // LIM-04: raw round-trip preserves meaning
    // =========================================================================
    #[test]
    fn test_raw_round_trip() {
        assert_eq!(Limit::Unlimited.as_raw(), -1);
        assert_eq!(Limit::Capped(12).as_raw(), 12);
        assert_eq!(
            Limit::from_raw(Limit::Capped(12).as_raw()),
            Limit::Capped(12)
        );
    }
}

#[cfg(test)]
mod lifecycle_draft_tests {
    use crate::notifications::NotificationDraft;
    use quickmemo_shared::NotificationType;
    use uuid::Uuid;

    // =========================================================================
    // LC-01: warning metadata carries the dedup key
    // =========================================================================
    #[test]
    fn test_warning_metadata_days_remaining() {
        for days in [7, 3, 1] {
            let draft = NotificationDraft::expiry_warning("Pro", days, Uuid::new_v4());
            assert_eq!(draft.metadata["days_remaining"], days);
        }
    }

    // =========================================================================
    // LC-02: same inputs produce identical drafts (dedup relies on it)
    // =========================================================================
    #[test]
    fn test_drafts_are_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(
            NotificationDraft::expiry_warning("Pro", 3, id),
            NotificationDraft::expiry_warning("Pro", 3, id)
        );
    }

    // =========================================================================
    // LC-03: each lifecycle stage has a distinct notification type
    // =========================================================================
    #[test]
    fn test_stage_types_are_distinct() {
        let id = Uuid::new_v4();
        let warning = NotificationDraft::expiry_warning("Pro", 7, id);
        let grace = NotificationDraft::grace_period_started(
            "Pro",
            time::macros::date!(2026 - 01 - 01),
            id,
        );
        let expired = NotificationDraft::subscription_expired("Pro", id);

        assert_eq!(warning.kind, NotificationType::SubscriptionExpiring);
        assert_eq!(grace.kind, NotificationType::SubscriptionGracePeriod);
        assert_eq!(expired.kind, NotificationType::SubscriptionExpired);
    }

    // =========================================================================
    // LC-04: every draft identifies its subscription for the inbox UI
    // =========================================================================
    #[test]
    fn test_drafts_reference_subscription() {
        let id = Uuid::new_v4();
        for draft in [
            NotificationDraft::expiry_warning("Pro", 1, id),
            NotificationDraft::grace_period_started("Pro", time::macros::date!(2026 - 01 - 01), id),
            NotificationDraft::subscription_expired("Pro", id),
        ] {
            assert_eq!(draft.metadata["subscription_id"], id.to_string());
        }
    }
}
