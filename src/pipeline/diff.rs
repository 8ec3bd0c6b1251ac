//! Diff calculation between the current and previously seen key sets.
//!
//! A key present in the current scrape but absent from the persisted set
//! marks a newly available residence. Removals are deliberately ignored:
//! a residence dropping off the site needs no notification.

use std::collections::BTreeSet;

/// Set of stable keys. A `BTreeSet` keeps iteration (and therefore
/// persistence) deterministic.
pub type KeySet = BTreeSet<String>;

/// Compute `current - previous`: the keys that are new in this run.
///
/// Pure set difference; neither input is mutated. An empty `previous`
/// (first-ever run, or unreadable state) means every current key is new.
pub fn diff(current: &KeySet, previous: &KeySet) -> KeySet {
    current.difference(previous).cloned().collect()
}
