//! Process-wide registry of units the engine has emitted or is emitting.
//!
//! Once transformed bytes for a unit have been handed to the host, the unit is *finalized*: a
//! later load of the same name (a retransformation, or a second loader pipeline invoking the
//! engine again) must not rewrite it a second time. A unit that another thread is currently
//! rewriting is treated the same way. Entries are claimed through a [`UnitLease`] that releases
//! the name again if the rewrite does not complete.

use dashmap::{mapref::entry::Entry, DashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitState {
    InProgress,
    Finalized,
}

/// Concurrent registry of finalized and in-progress units, keyed by binary name.
#[derive(Debug, Default)]
pub struct UnitPool {
    units: DashMap<String, UnitState>,
}

impl UnitPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` for rewriting.
    ///
    /// Returns `None` if the unit is finalized or already being rewritten by another caller.
    pub fn try_lease(&self, name: &str) -> Option<UnitLease<'_>> {
        match self.units.entry(name.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                vacant.insert(UnitState::InProgress);
                Some(UnitLease {
                    pool: self,
                    name: name.to_string(),
                    committed: false,
                })
            }
        }
    }

    /// Record `name` as finalized without rewriting it, e.g. for units the host reports as
    /// already defined.
    pub fn mark_finalized(&self, name: &str) {
        self.units.insert(name.to_string(), UnitState::Finalized);
    }

    /// Returns true if `name` has been finalized.
    #[must_use]
    pub fn is_finalized(&self, name: &str) -> bool {
        self.units
            .get(name)
            .is_some_and(|state| *state == UnitState::Finalized)
    }

    /// Returns true if `name` is finalized or in progress.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Forget `name`, allowing it to be rewritten again.
    pub fn forget(&self, name: &str) -> bool {
        self.units.remove(name).is_some()
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if no unit is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Exclusive claim on a unit name. Dropping an uncommitted lease releases the name.
#[derive(Debug)]
pub struct UnitLease<'a> {
    pool: &'a UnitPool,
    name: String,
    committed: bool,
}

impl UnitLease<'_> {
    /// Binary name of the leased unit.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mark the unit finalized.
    pub fn commit(mut self) {
        self.pool
            .units
            .insert(self.name.clone(), UnitState::Finalized);
        self.committed = true;
    }
}

impl Drop for UnitLease<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.pool.units.remove(&self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_lifecycle() {
        let pool = UnitPool::new();
        {
            let lease = pool.try_lease("a.B");
            assert!(lease.is_some());
            assert!(pool.try_lease("a.B").is_none(), "in progress");
            assert!(!pool.is_finalized("a.B"));
        }
        assert!(pool.is_empty(), "dropped lease releases the name");

        if let Some(lease) = pool.try_lease("a.B") {
            assert_eq!(lease.name(), "a.B");
            lease.commit();
        }
        assert!(pool.is_finalized("a.B"));
        assert!(pool.try_lease("a.B").is_none());

        assert!(pool.forget("a.B"));
        assert!(pool.try_lease("a.B").is_some());
    }

    #[test]
    fn externally_finalized() {
        let pool = UnitPool::new();
        pool.mark_finalized("a.B");
        assert!(pool.contains("a.B"));
        assert!(pool.try_lease("a.B").is_none());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn concurrent_claims_are_exclusive() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let pool = UnitPool::new();
        let winners = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    if let Some(lease) = pool.try_lease("a.B") {
                        winners.fetch_add(1, Ordering::SeqCst);
                        lease.commit();
                    }
                });
            }
        });
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(pool.is_finalized("a.B"));
    }
}
