//! Ledger invariants under arbitrary admission sequences.

use proptest::prelude::*;

use skilldisc::budget::BudgetLedger;

proptest! {
    /// Cumulative admitted size never exceeds capacity and remaining
    /// never underflows, whatever the request sequence.
    #[test]
    fn admitted_total_never_exceeds_capacity(
        capacity in 0u64..20_000,
        requests in prop::collection::vec(0u64..8_000, 0..64),
    ) {
        let mut ledger = BudgetLedger::new(capacity);
        let mut admitted_total = 0u64;
        for request in requests {
            let admission = ledger.admit(request);
            if admission.granted {
                admitted_total += request;
            }
            prop_assert!(admitted_total <= capacity);
            prop_assert_eq!(admission.remaining, capacity - admitted_total);
            prop_assert_eq!(ledger.remaining(), capacity - admitted_total);
        }
    }

    /// A refused admission leaves the ledger exactly as it was.
    #[test]
    fn refusal_has_no_side_effects(
        capacity in 0u64..5_000,
        fill in 0u64..5_000,
        oversize_by in 1u64..1_000,
    ) {
        let mut ledger = BudgetLedger::new(capacity);
        let _ = ledger.admit(fill);
        let before = ledger.remaining();
        let refused = ledger.admit(before + oversize_by);
        prop_assert!(!refused.granted);
        prop_assert_eq!(ledger.remaining(), before);
    }

    /// Reserve-then-release is a no-op; reserve-then-commit spends
    /// exactly the reservation.
    #[test]
    fn reservations_balance(
        capacity in 1u64..10_000,
        units in 0u64..10_000,
        commit in any::<bool>(),
    ) {
        let mut ledger = BudgetLedger::new(capacity);
        let before = ledger.remaining();
        if ledger.reserve(units) {
            prop_assert_eq!(ledger.remaining(), before - units);
            if commit {
                ledger.commit_reserved(units);
                prop_assert_eq!(ledger.committed(), units);
                prop_assert_eq!(ledger.remaining(), before - units);
            } else {
                ledger.release_reserved(units);
                prop_assert_eq!(ledger.committed(), 0);
                prop_assert_eq!(ledger.remaining(), before);
            }
        } else {
            // refusal is only legal when the units genuinely do not fit
            prop_assert!(units > before);
            prop_assert_eq!(ledger.remaining(), before);
        }
    }
}
