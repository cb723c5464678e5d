//! Record of successful guarded calls.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Names of guarded functions that completed successfully.
///
/// Cloning shares the underlying set, so guards that should see each other's
/// calls are given clones of one ledger. Written only after a call passes
/// every check.
#[derive(Debug, Clone, Default)]
pub struct CallLedger {
    calls: Arc<Mutex<BTreeSet<String>>>,
}

impl CallLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful call of `name`.
    pub fn record(&self, name: &str) {
        self.lock().insert(name.to_string());
    }

    /// Returns `true` if `name` has completed successfully.
    pub fn has_succeeded(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    /// Recorded names in sorted order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Forgets every recorded call.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_records() {
        let ledger = CallLedger::new();
        let shared = ledger.clone();

        shared.record("load_users");
        shared.record("fetch_orders");

        assert!(ledger.has_succeeded("load_users"));
        assert!(!ledger.has_succeeded("save_report"));
        assert_eq!(ledger.calls(), vec!["fetch_orders", "load_users"]);

        ledger.clear();
        assert!(shared.calls().is_empty());
    }
}
