//! Reordering of out-of-order completions.

use std::collections::BTreeMap;

/// Releases items strictly in discovery sequence order.
///
/// Sequence numbers start at 1 and must be unique. A sequence number that
/// will never produce an item is released with [`skip`](Self::skip) so it
/// does not hold back later items.
#[derive(Debug)]
pub struct DiscoveryOrder<T> {
    next: u64,
    pending: BTreeMap<u64, Option<T>>,
}

impl<T> Default for DiscoveryOrder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DiscoveryOrder<T> {
    pub fn new() -> Self {
        Self {
            next: 1,
            pending: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, seq: u64, item: T) {
        self.pending.insert(seq, Some(item));
    }

    /// Mark `seq` as a gap.
    pub fn skip(&mut self, seq: u64) {
        self.pending.insert(seq, None);
    }

    /// Items that are next in sequence, in order.
    pub fn pop_ready(&mut self) -> Vec<T> {
        let mut ready = Vec::new();
        while let Some(slot) = self.pending.remove(&self.next) {
            ready.extend(slot);
            self.next += 1;
        }
        ready
    }

    /// Everything still buffered, in sequence order, regardless of gaps.
    pub fn drain(&mut self) -> Vec<T> {
        let pending = std::mem::take(&mut self.pending);
        if let Some(&last) = pending.keys().next_back() {
            self.next = self.next.max(last + 1);
        }
        pending.into_values().flatten().collect()
    }

    /// Number of buffered items waiting for an earlier one.
    pub fn waiting(&self) -> usize {
        self.pending.values().filter(|slot| slot.is_some()).count()
    }
}
