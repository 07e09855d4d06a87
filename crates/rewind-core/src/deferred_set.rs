//! Staged set with deferred mutations
//!
//! The rewind manager iterates its registered objects while replaying many
//! ticks. Objects spawned or despawned during that sweep must not change the
//! set being iterated, so `add`, `remove` and `clear` only stage a mutation.
//! Staged mutations become visible at a single commit point,
//! [`DeferredMutableSet::acknowledge_mutations`], called once per outer tick.
//!
//! Iteration order is insertion order, which keeps replays deterministic
//! across peers that register objects in the same order.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Summary of what a commit applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedMutations {
    /// Items that became visible
    pub added: usize,
    /// Items that were dropped
    pub removed: usize,
    /// Whether a pending clear emptied the set
    pub cleared: bool,
}

impl AppliedMutations {
    /// Check if the commit changed nothing
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && !self.cleared
    }
}

/// A set whose mutations are staged until acknowledged
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize + Hash + Eq",
    deserialize = "T: Deserialize<'de> + Hash + Eq"
))]
pub struct DeferredMutableSet<T> {
    /// Live items, in insertion order
    items: IndexSet<T>,
    /// Staged additions
    pending_add: IndexSet<T>,
    /// Staged removals
    pending_remove: IndexSet<T>,
    /// Staged clear; wins over any staged addition or removal
    pending_clear: bool,
}

impl<T: Hash + Eq + Clone> DeferredMutableSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            items: IndexSet::new(),
            pending_add: IndexSet::new(),
            pending_remove: IndexSet::new(),
            pending_clear: false,
        }
    }

    /// Stage an item for addition
    pub fn add(&mut self, item: T) {
        self.pending_add.insert(item);
    }

    /// Stage an item for removal
    ///
    /// Returns `false` if the removal was already staged.
    pub fn remove(&mut self, item: T) -> bool {
        self.pending_remove.insert(item)
    }

    /// Withdraw a staged removal
    ///
    /// Returns `false` if no removal was staged for the item.
    pub fn cancel_remove(&mut self, item: &T) -> bool {
        self.pending_remove.shift_remove(item)
    }

    /// Stage removal of every item
    pub fn clear(&mut self) {
        self.pending_clear = true;
    }

    /// Whether the item is live and not staged for removal
    ///
    /// Staged additions are not visible yet.
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item) && !self.pending_remove.contains(item)
    }

    /// Iterate over live items that are not staged for removal
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items
            .iter()
            .filter(move |item| !self.pending_remove.contains(*item))
    }

    /// Number of items visible to iteration
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check if iteration would yield nothing
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Whether any mutation is waiting for a commit
    pub fn has_pending_mutations(&self) -> bool {
        self.pending_clear || !self.pending_add.is_empty() || !self.pending_remove.is_empty()
    }

    /// Whether the item is staged for addition
    pub fn is_pending_add(&self, item: &T) -> bool {
        self.pending_add.contains(item)
    }

    /// Apply every staged mutation
    ///
    /// A staged clear drops everything, including staged additions. Otherwise
    /// additions are merged first, then removals. All staging is reset.
    pub fn acknowledge_mutations(&mut self) -> AppliedMutations {
        let mut applied = AppliedMutations::default();

        if self.pending_clear {
            applied.removed = self.items.len();
            applied.cleared = true;
            self.items.clear();
        } else {
            for item in self.pending_add.drain(..) {
                if self.items.insert(item) {
                    applied.added += 1;
                }
            }
            for item in self.pending_remove.iter() {
                if self.items.shift_remove(item) {
                    applied.removed += 1;
                }
            }
        }

        self.pending_add.clear();
        self.pending_remove.clear();
        self.pending_clear = false;

        applied
    }
}

impl<T: Hash + Eq + Clone> Default for DeferredMutableSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(set: &DeferredMutableSet<u32>) -> Vec<u32> {
        set.iter().copied().collect()
    }

    #[test]
    fn test_add_is_deferred() {
        let mut set = DeferredMutableSet::new();
        set.add(1);

        assert!(collect(&set).is_empty());
        assert!(!set.contains(&1));
        assert!(set.is_pending_add(&1));

        let applied = set.acknowledge_mutations();
        assert_eq!(applied.added, 1);
        assert_eq!(collect(&set), vec![1]);
        assert!(set.contains(&1));
        assert!(!set.has_pending_mutations());
    }

    #[test]
    fn test_remove_hides_item_immediately() {
        let mut set = DeferredMutableSet::new();
        set.add(1);
        set.add(2);
        set.acknowledge_mutations();

        assert!(set.remove(1));
        assert!(!set.remove(1));
        assert!(!set.contains(&1));
        assert_eq!(collect(&set), vec![2]);
        assert_eq!(set.len(), 1);

        let applied = set.acknowledge_mutations();
        assert_eq!(applied.removed, 1);
        assert_eq!(collect(&set), vec![2]);
    }

    #[test]
    fn test_clear_wins_over_pending() {
        let mut set = DeferredMutableSet::new();
        set.add(1);
        set.add(2);
        set.acknowledge_mutations();

        set.add(3);
        set.remove(2);
        set.clear();

        // Clear is staged too
        assert_eq!(collect(&set), vec![1]);

        let applied = set.acknowledge_mutations();
        assert!(applied.cleared);
        assert!(set.is_empty());

        // Nothing staged survives the clear
        set.acknowledge_mutations();
        assert!(set.is_empty());
    }

    #[test]
    fn test_cancel_remove_keeps_item() {
        let mut set = DeferredMutableSet::new();
        set.add(1);
        set.acknowledge_mutations();

        set.remove(1);
        assert!(set.cancel_remove(&1));
        assert!(!set.cancel_remove(&1));
        assert!(set.contains(&1));

        let applied = set.acknowledge_mutations();
        assert_eq!(applied.removed, 0);
        assert_eq!(collect(&set), vec![1]);
    }

    #[test]
    fn test_add_then_remove_in_same_commit() {
        let mut set = DeferredMutableSet::new();
        set.add(7);
        set.remove(7);

        set.acknowledge_mutations();
        assert!(!set.contains(&7));
        assert!(set.is_empty());
    }

    #[test]
    fn test_iteration_keeps_insertion_order() {
        let mut set = DeferredMutableSet::new();
        for item in [5, 3, 9, 1] {
            set.add(item);
        }
        set.acknowledge_mutations();
        set.remove(3);
        set.acknowledge_mutations();
        set.add(4);
        set.acknowledge_mutations();

        assert_eq!(collect(&set), vec![5, 9, 1, 4]);
    }

    #[test]
    fn test_iteration_stable_while_mutating() {
        let mut set = DeferredMutableSet::new();
        for item in 0..4 {
            set.add(item);
        }
        set.acknowledge_mutations();

        let snapshot = collect(&set);
        for item in snapshot.iter() {
            set.add(item + 100);
        }
        assert_eq!(collect(&set), snapshot);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8),
        Remove(u8),
        Clear,
        Commit,
    }

    fn arb_op() -> impl proptest::strategy::Strategy<Value = Op> {
        use proptest::prelude::*;
        prop_oneof![
            4 => any::<u8>().prop_map(|v| Op::Add(v % 16)),
            3 => any::<u8>().prop_map(|v| Op::Remove(v % 16)),
            1 => Just(Op::Clear),
            2 => Just(Op::Commit),
        ]
    }

    proptest::proptest! {
        #[test]
        fn prop_matches_commit_model(ops in proptest::collection::vec(arb_op(), 0..64)) {
            use std::collections::BTreeSet;

            let mut set = DeferredMutableSet::new();
            let mut live: BTreeSet<u8> = BTreeSet::new();
            let mut adds = Vec::new();
            let mut removes = Vec::new();
            let mut clear = false;

            for op in ops {
                match op {
                    Op::Add(v) => { set.add(v); adds.push(v); }
                    Op::Remove(v) => { set.remove(v); removes.push(v); }
                    Op::Clear => { set.clear(); clear = true; }
                    Op::Commit => {
                        set.acknowledge_mutations();
                        if clear {
                            live.clear();
                        } else {
                            live.extend(adds.iter().copied());
                            for v in &removes {
                                live.remove(v);
                            }
                        }
                        adds.clear();
                        removes.clear();
                        clear = false;
                    }
                }

                // Iteration only ever shows committed items minus staged removals
                let visible: BTreeSet<u8> = set.iter().copied().collect();
                let expected: BTreeSet<u8> =
                    live.iter().copied().filter(|v| !removes.contains(v)).collect();
                proptest::prop_assert_eq!(visible, expected);
            }
        }
    }

    #[test]
    fn test_duplicate_add_counts_once() {
        let mut set = DeferredMutableSet::new();
        set.add(1);
        set.add(1);
        let applied = set.acknowledge_mutations();
        assert_eq!(applied.added, 1);

        set.add(1);
        let applied = set.acknowledge_mutations();
        assert!(applied.is_empty());
    }
}
