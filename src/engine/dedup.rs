//! Processed-signature tracking.
//!
//! `is_new` is a single check-and-set on the map entry, so concurrent
//! deliveries of one signature can never both observe it as new.
//! Unbounded by default; a TTL and/or capacity turns it into an
//! eviction-ordered cache with the same contract.

use crate::domain::TxSignature;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Default)]
pub struct EventDeduplicator {
    seen: DashMap<TxSignature, Instant>,
    /// Insertion order, only tracked when bounded.
    order: Mutex<VecDeque<(TxSignature, Instant)>>,
    ttl: Option<Duration>,
    capacity: Option<usize>,
}

impl EventDeduplicator {
    /// Remember every signature for the life of the process.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Forget signatures older than `ttl` and/or beyond `capacity` entries
    /// (oldest first).
    pub fn bounded(ttl: Option<Duration>, capacity: Option<usize>) -> Self {
        Self {
            ttl,
            capacity: capacity.map(|c| c.max(1)),
            ..Self::default()
        }
    }

    fn is_bounded(&self) -> bool {
        self.ttl.is_some() || self.capacity.is_some()
    }

    /// Returns `true` exactly once per signature, marking it seen.
    pub fn is_new(&self, signature: &TxSignature) -> bool {
        self.is_new_at(signature, Instant::now())
    }

    fn is_new_at(&self, signature: &TxSignature, now: Instant) -> bool {
        if self.is_bounded() {
            self.evict(now);
        }

        // The entry guard holds the shard lock; it must be released before
        // eviction touches the map again.
        let inserted = match self.seen.entry(signature.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        };

        if !inserted {
            debug!(signature = %signature, "Duplicate delivery");
            return false;
        }

        if self.is_bounded() {
            self.order().push_back((signature.clone(), now));
            self.evict(now);
        }
        true
    }

    // The queue stays consistent across a panicking holder: every mutation
    // is a single push or pop.
    fn order(&self) -> MutexGuard<'_, VecDeque<(TxSignature, Instant)>> {
        self.order.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn evict(&self, now: Instant) {
        let mut order = self.order();
        while let Some((signature, inserted)) = order.front() {
            let expired = self
                .ttl
                .is_some_and(|ttl| now.saturating_duration_since(*inserted) >= ttl);
            let over_capacity = self.capacity.is_some_and(|cap| order.len() > cap);
            if !expired && !over_capacity {
                break;
            }
            // Only drop the map entry if it is still the one this queue slot
            // recorded.
            self.seen.remove_if(signature, |_, at| at == inserted);
            order.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
