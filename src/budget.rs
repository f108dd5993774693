//! Session budget accounting.
//!
//! A ledger tracks one session's finite capacity. Committed units are
//! spent for good; reserved units are held across a fetch and either
//! committed on success or released on failure or cancellation. The sum
//! of both never exceeds capacity, so remaining capacity never goes
//! negative.

use serde::Serialize;

/// Outcome of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Admission {
    pub granted: bool,
    /// Capacity left after this request
    pub remaining: u64,
}

/// Capacity counter for one session. Monotonically non-increasing within
/// the session; a new session gets a fresh ledger.
#[derive(Debug, Clone)]
pub struct BudgetLedger {
    capacity: u64,
    committed: u64,
    reserved: u64,
}

impl BudgetLedger {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            committed: 0,
            reserved: 0,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Units still available for admission.
    pub fn remaining(&self) -> u64 {
        self.capacity - self.committed - self.reserved
    }

    /// Admit and commit `units` in one step, used for content that is
    /// already resident (metadata). Refused wholesale when it does not
    /// fit; there are no partial admissions.
    pub fn admit(&mut self, units: u64) -> Admission {
        let granted = units <= self.remaining();
        if granted {
            self.committed += units;
        }
        Admission {
            granted,
            remaining: self.remaining(),
        }
    }

    /// Hold `units` across a fetch. Returns false without side effects
    /// when the units do not fit.
    pub fn reserve(&mut self, units: u64) -> bool {
        if units <= self.remaining() {
            self.reserved += units;
            true
        } else {
            false
        }
    }

    /// Convert previously reserved units into committed ones.
    pub fn commit_reserved(&mut self, units: u64) {
        debug_assert!(units <= self.reserved, "commit exceeds reservation");
        let units = units.min(self.reserved);
        self.reserved -= units;
        self.committed += units;
    }

    /// Return previously reserved units to the pool.
    pub fn release_reserved(&mut self, units: u64) {
        debug_assert!(units <= self.reserved, "release exceeds reservation");
        self.reserved -= units.min(self.reserved);
    }

    /// Return every outstanding reservation, the cancellation path.
    pub fn release_all_reserved(&mut self) {
        self.reserved = 0;
    }
}
