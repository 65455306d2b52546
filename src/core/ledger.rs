//! core::ledger
//!
//! Run-scoped publish ledger.
//!
//! # Architecture
//!
//! The ledger is the single synchronization point of a run. It maps every
//! module identity the walk has encountered to its [`EntryState`] and keeps
//! the success/failure/total counters reported at the end of the run.
//!
//! It is shared by reference (`Arc<PublishLedger>`) across the whole
//! resolution tree. The walk itself is sequential, but every mutation that
//! decides whether work happens is a single atomic operation
//! ([`PublishLedger::claim`], [`PublishLedger::claim_publish`]) so that a
//! future parallel walk keeps the at-most-once guarantees.
//!
//! # Invariants
//!
//! - An identity transitions to `Published` at most once.
//! - Once an identity is present in the ledger, no branch claims it again.
//! - Counters never decrease within a run.
//!
//! The ledger is never persisted; a new run starts from an empty ledger.
//!
//! # Example
//!
//! ```
//! use modpub::core::ledger::{EntryState, PublishLedger};
//! use modpub::core::types::ModuleIdentity;
//!
//! let ledger = PublishLedger::new();
//! let id: ModuleIdentity = "example.com/a@v1.0.0".parse().unwrap();
//!
//! assert!(ledger.claim(&id, EntryState::Pending));
//! assert!(!ledger.claim(&id, EntryState::Pending));
//!
//! assert!(ledger.claim_publish(&id));
//! assert!(!ledger.claim_publish(&id));
//! assert_eq!(ledger.state(&id), Some(EntryState::Published));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::types::ModuleIdentity;

/// State of one identity in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Claimed by this run and not yet finished.
    Pending,
    /// Already present in the target repository before this run touched it.
    InRepository,
    /// Published by this run.
    Published,
    /// Abandoned by this run; never retried.
    Failed,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryState::Pending => write!(f, "pending"),
            EntryState::InRepository => write!(f, "in-repository"),
            EntryState::Published => write!(f, "published"),
            EntryState::Failed => write!(f, "failed"),
        }
    }
}

/// Final counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Modules published successfully.
    pub successes: usize,
    /// Modules that failed to resolve, download or publish.
    pub failures: usize,
    /// Modules scheduled for resolution.
    pub total: usize,
}

impl Summary {
    /// True if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} published, {} failed, {} total",
            self.successes, self.failures, self.total
        )
    }
}

/// Run-scoped record of module identities and publish counters.
#[derive(Debug, Default)]
pub struct PublishLedger {
    entries: Mutex<HashMap<ModuleIdentity, EntryState>>,
    successes: AtomicUsize,
    failures: AtomicUsize,
    total: AtomicUsize,
}

impl PublishLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ModuleIdentity, EntryState>> {
        // A poisoned map is still structurally valid; keep going.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state of an identity, if the run has seen it.
    pub fn state(&self, id: &ModuleIdentity) -> Option<EntryState> {
        self.entries().get(id).copied()
    }

    /// Identities abandoned by this run, sorted.
    pub fn failed(&self) -> Vec<ModuleIdentity> {
        let mut failed: Vec<_> = self
            .entries()
            .iter()
            .filter(|(_, state)| **state == EntryState::Failed)
            .map(|(id, _)| id.clone())
            .collect();
        failed.sort_by_key(|id| id.to_string());
        failed
    }

    /// Atomically record an identity if it is absent.
    ///
    /// Returns `true` if the caller now owns the identity's resolution.
    pub fn claim(&self, id: &ModuleIdentity, state: EntryState) -> bool {
        let mut entries = self.entries();
        if entries.contains_key(id) {
            return false;
        }
        entries.insert(id.clone(), state);
        true
    }

    /// Overwrite the state of an identity the caller already owns.
    ///
    /// `Published` is terminal and is never overwritten.
    pub fn set_state(&self, id: &ModuleIdentity, state: EntryState) {
        let mut entries = self.entries();
        match entries.get(id) {
            Some(EntryState::Published) => {}
            _ => {
                entries.insert(id.clone(), state);
            }
        }
    }

    /// Record that the publish granted by [`claim_publish`](Self::claim_publish)
    /// failed. The identity stays in the ledger and is never retried.
    pub fn mark_failed(&self, id: &ModuleIdentity) {
        self.entries().insert(id.clone(), EntryState::Failed);
    }

    /// Atomically check-and-mark an identity as published.
    ///
    /// Returns `true` if the caller must perform the publish: the identity
    /// is unknown or still pending. Identities already in the repository,
    /// published, or abandoned are never granted.
    pub fn claim_publish(&self, id: &ModuleIdentity) -> bool {
        let mut entries = self.entries();
        match entries.get(id) {
            None | Some(EntryState::Pending) => {
                entries.insert(id.clone(), EntryState::Published);
                true
            }
            Some(_) => false,
        }
    }

    /// Count one successful publish.
    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    /// Count one failure.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Add scheduled modules to the total.
    pub fn add_total(&self, count: usize) {
        self.total.fetch_add(count, Ordering::SeqCst);
    }

    /// Successful publishes so far.
    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    /// Failures so far.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Scheduled modules so far.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Progress label for the next publish: `"<successes + 1>/<total>"`.
    pub fn progress_label(&self) -> String {
        format!("{}/{}", self.successes() + 1, self.total())
    }

    /// Snapshot of the counters.
    pub fn summary(&self) -> Summary {
        Summary {
            successes: self.successes(),
            failures: self.failures(),
            total: self.total(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(s: &str) -> ModuleIdentity {
        s.parse().unwrap()
    }

    #[test]
    fn claim_is_first_come_first_served() {
        let ledger = PublishLedger::new();
        let a = id("example.com/a@v1.0.0");
        assert!(ledger.claim(&a, EntryState::Pending));
        assert!(!ledger.claim(&a, EntryState::InRepository));
        assert_eq!(ledger.state(&a), Some(EntryState::Pending));
    }

    #[test]
    fn claim_publish_skips_repository_copies() {
        let ledger = PublishLedger::new();
        let a = id("example.com/a@v1.0.0");
        ledger.claim(&a, EntryState::InRepository);
        assert!(!ledger.claim_publish(&a));
        assert_eq!(ledger.state(&a), Some(EntryState::InRepository));
    }

    #[test]
    fn claim_publish_on_unknown_identity() {
        let ledger = PublishLedger::new();
        let a = id("example.com/a@v1.0.0");
        assert!(ledger.claim_publish(&a));
        assert!(!ledger.claim_publish(&a));
    }

    #[test]
    fn published_is_terminal() {
        let ledger = PublishLedger::new();
        let a = id("example.com/a@v1.0.0");
        ledger.claim_publish(&a);
        ledger.set_state(&a, EntryState::Failed);
        assert_eq!(ledger.state(&a), Some(EntryState::Published));
    }

    #[test]
    fn failed_publish_is_never_granted_again() {
        let ledger = PublishLedger::new();
        let a = id("example.com/a@v1.0.0");
        ledger.claim(&a, EntryState::Pending);
        assert!(ledger.claim_publish(&a));
        ledger.mark_failed(&a);
        assert_eq!(ledger.state(&a), Some(EntryState::Failed));
        assert!(!ledger.claim_publish(&a));
    }

    #[test]
    fn failed_lists_only_abandoned_identities() {
        let ledger = PublishLedger::new();
        let a = id("example.com/a@v1.0.0");
        let b = id("example.com/b@v1.0.0");
        let c = id("example.com/c@v1.0.0");
        ledger.claim(&c, EntryState::Pending);
        ledger.set_state(&c, EntryState::Failed);
        ledger.claim(&b, EntryState::InRepository);
        ledger.claim(&a, EntryState::Pending);
        ledger.claim_publish(&a);
        ledger.mark_failed(&a);

        assert_eq!(ledger.failed(), vec![a, c]);
    }

    #[test]
    fn counters_and_label() {
        let ledger = PublishLedger::new();
        ledger.add_total(3);
        assert_eq!(ledger.progress_label(), "1/3");
        ledger.record_success();
        ledger.record_failure();
        assert_eq!(ledger.progress_label(), "2/3");
        assert_eq!(
            ledger.summary(),
            Summary {
                successes: 1,
                failures: 1,
                total: 3
            }
        );
        assert!(!ledger.summary().is_clean());
    }

    #[test]
    fn summary_display() {
        let s = Summary {
            successes: 2,
            failures: 0,
            total: 2,
        };
        assert_eq!(s.to_string(), "2 published, 0 failed, 2 total");
    }

    #[test]
    fn concurrent_claim_publish_grants_exactly_once() {
        let ledger = Arc::new(PublishLedger::new());
        let a = id("example.com/diamond@v1.0.0");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let a = a.clone();
                std::thread::spawn(move || ledger.claim_publish(&a))
            })
            .collect();
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|g| *g)
            .count();
        assert_eq!(granted, 1);
    }
}
