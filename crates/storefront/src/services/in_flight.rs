//! Process-wide registry of per-visitor operations that must not overlap.
//!
//! A checkout submission and a chat send each hold a slot for the visitor
//! until their guard is dropped, so a double-clicked submit or a second chat
//! message sent while the first is pending is rejected instead of racing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::VisitorId;

/// Operations that hold a slot while their network calls run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Checkout,
    Chat,
}

/// Registry of pending operations. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    pending: Arc<Mutex<HashSet<(VisitorId, Action)>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `visitor` and `action`.
    ///
    /// Returns `None` if the same action is already pending for this visitor.
    /// The slot is released when the returned guard drops, including on early
    /// returns and errors.
    #[must_use]
    pub fn try_begin(&self, visitor: VisitorId, action: Action) -> Option<InFlightGuard> {
        let inserted = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((visitor, action));

        inserted.then(|| InFlightGuard {
            registry: self.clone(),
            key: (visitor, action),
        })
    }

    /// Whether `action` is pending for `visitor`.
    #[must_use]
    pub fn is_pending(&self, visitor: VisitorId, action: Action) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(visitor, action))
    }
}

/// Holds an in-flight slot; dropping it releases the slot.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlight,
    key: (VisitorId, Action),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_rejected_until_release() {
        let registry = InFlight::new();
        let visitor = VisitorId::new();

        let guard = registry.try_begin(visitor, Action::Checkout);
        assert!(guard.is_some());
        assert!(registry.is_pending(visitor, Action::Checkout));
        assert!(registry.try_begin(visitor, Action::Checkout).is_none());

        drop(guard);
        assert!(!registry.is_pending(visitor, Action::Checkout));
        assert!(registry.try_begin(visitor, Action::Checkout).is_some());
    }

    #[test]
    fn test_slots_are_per_visitor_and_action() {
        let registry = InFlight::new();
        let ana = VisitorId::new();
        let ben = VisitorId::new();

        let _checkout = registry.try_begin(ana, Action::Checkout);
        assert!(registry.try_begin(ana, Action::Chat).is_some());
        assert!(registry.try_begin(ben, Action::Checkout).is_some());
    }
}
