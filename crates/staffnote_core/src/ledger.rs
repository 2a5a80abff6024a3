//! Position-keyed note ledger for one editing surface.
//!
//! # Responsibility
//! - Hold note/rest entries in insertion order.
//! - Enforce one-entry-per-position with replace-in-place semantics.
//! - Notify subscribed observers after every state change.
//!
//! # Invariants
//! - At most one entry occupies a given `position`.
//! - Non-colliding entries keep append order; the ledger never re-sorts.
//! - `add`, `remove` and `clear` are total and never fail.
//! - Entries are not validated here; callers own that precondition.

use crate::model::note::{NoteEntry, NoteId, Position};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Formatter};

/// Handle returned by [`NoteLedger::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// State change delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerChange {
    /// A new entry was appended.
    Added { id: NoteId, position: Position },
    /// An entry at `position` was overwritten in place.
    Replaced {
        previous_id: NoteId,
        id: NoteId,
        position: Position,
    },
    /// An entry was removed by id.
    Removed { id: NoteId, position: Position },
    /// The ledger was emptied. `removed` may be zero.
    Cleared { removed: usize },
}

type Observer = Box<dyn FnMut(&LedgerChange, &[NoteEntry])>;

/// Ordered note/rest collection with insert-or-replace-by-position semantics.
///
/// Observers are runtime wiring only: they are skipped by `Clone`,
/// `PartialEq` and serde.
#[derive(Default)]
pub struct NoteLedger {
    entries: Vec<NoteEntry>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl NoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any entry at the same position.
    ///
    /// A replaced entry keeps its index; otherwise the entry is appended.
    /// The most recent write for a position always wins.
    pub fn add(&mut self, entry: NoteEntry) {
        let position = entry.position;
        let id = entry.id.clone();

        let change = match self.index_of_position(position) {
            Some(index) => {
                let previous = std::mem::replace(&mut self.entries[index], entry);
                debug!(
                    "event=ledger_add module=ledger status=ok outcome=replaced position={} index={} len={}",
                    position,
                    index,
                    self.entries.len()
                );
                LedgerChange::Replaced {
                    previous_id: previous.id,
                    id,
                    position,
                }
            }
            None => {
                self.entries.push(entry);
                debug!(
                    "event=ledger_add module=ledger status=ok outcome=appended position={} len={}",
                    position,
                    self.entries.len()
                );
                LedgerChange::Added { id, position }
            }
        };

        self.notify(change);
    }

    /// Removes the first entry with `id`. Absent ids are a silent no-op.
    pub fn remove(&mut self, id: &str) {
        let Some(index) = self.entries.iter().position(|entry| entry.id == id) else {
            debug!("event=ledger_remove module=ledger status=noop reason=id_absent");
            return;
        };

        let removed = self.entries.remove(index);
        debug!(
            "event=ledger_remove module=ledger status=ok position={} len={}",
            removed.position,
            self.entries.len()
        );
        self.notify(LedgerChange::Removed {
            id: removed.id,
            position: removed.position,
        });
    }

    /// Empties the ledger unconditionally.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        debug!("event=ledger_clear module=ledger status=ok removed={removed}");
        self.notify(LedgerChange::Cleared { removed });
    }

    /// Entries in storage order.
    pub fn entries(&self) -> &[NoteEntry] {
        &self.entries
    }

    /// Owned copy of the current entries, for callers that poll after mutating.
    pub fn snapshot(&self) -> Vec<NoteEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NoteEntry> {
        self.entries.iter()
    }

    /// Returns the first entry with `id`.
    pub fn get(&self, id: &str) -> Option<&NoteEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Returns the entry occupying `position`.
    pub fn at_position(&self, position: Position) -> Option<&NoteEntry> {
        self.entries.iter().find(|entry| entry.position == position)
    }

    /// Entries sorted by position, for left-to-right rendering.
    ///
    /// Storage order is untouched.
    pub fn position_order(&self) -> Vec<&NoteEntry> {
        let mut ordered: Vec<&NoteEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|entry| entry.position);
        ordered
    }

    /// Registers a callback invoked after each state change.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&LedgerChange, &[NoteEntry]) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Drops a subscription. Returns `false` when the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(current, _)| *current != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn index_of_position(&self, position: Position) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.position == position)
    }

    fn notify(&mut self, change: LedgerChange) {
        for (_, observer) in self.observers.iter_mut() {
            observer(&change, &self.entries);
        }
    }
}

impl Clone for NoteLedger {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }
}

impl PartialEq for NoteLedger {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for NoteLedger {}

impl Debug for NoteLedger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteLedger")
            .field("entries", &self.entries)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl FromIterator<NoteEntry> for NoteLedger {
    /// Builds a ledger through `add`, so later position collisions win.
    fn from_iter<I: IntoIterator<Item = NoteEntry>>(iter: I) -> Self {
        let mut ledger = Self::new();
        ledger.extend(iter);
        ledger
    }
}

impl Extend<NoteEntry> for NoteLedger {
    fn extend<I: IntoIterator<Item = NoteEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.add(entry);
        }
    }
}

impl<'a> IntoIterator for &'a NoteLedger {
    type Item = &'a NoteEntry;
    type IntoIter = std::slice::Iter<'a, NoteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for NoteLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}

impl<'de> Deserialize<'de> for NoteLedger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<NoteEntry>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{LedgerChange, NoteLedger};
    use crate::model::note::NoteEntry;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ids(ledger: &NoteLedger) -> Vec<&str> {
        ledger.iter().map(|entry| entry.id.as_str()).collect()
    }

    #[test]
    fn replacement_keeps_storage_index() {
        let mut ledger = NoteLedger::new();
        ledger.add(NoteEntry::note("a", "C4", "quarter", 5));
        ledger.add(NoteEntry::note("b", "D4", "quarter", 1));
        ledger.add(NoteEntry::note("c", "E4", "quarter", 3));

        ledger.add(NoteEntry::rest("d", "half", 1));

        assert_eq!(ids(&ledger), vec!["a", "d", "c"]);
    }

    #[test]
    fn position_order_does_not_touch_storage() {
        let ledger: NoteLedger = vec![
            NoteEntry::note("a", "C4", "quarter", 9),
            NoteEntry::note("b", "D4", "quarter", 2),
        ]
        .into_iter()
        .collect();

        let ordered: Vec<&str> = ledger
            .position_order()
            .into_iter()
            .map(|entry| entry.id.as_str())
            .collect();
        assert_eq!(ordered, vec!["b", "a"]);
        assert_eq!(ids(&ledger), vec!["a", "b"]);
    }

    #[test]
    fn absent_remove_does_not_notify() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut ledger = NoteLedger::new();
        ledger.subscribe(move |change, _| sink.borrow_mut().push(change.clone()));

        ledger.remove("missing");

        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn clone_drops_observers() {
        let mut ledger = NoteLedger::new();
        ledger.subscribe(|_, _| {});
        ledger.add(NoteEntry::note("a", "C4", "quarter", 1));

        let copy = ledger.clone();
        assert_eq!(copy.observer_count(), 0);
        assert_eq!(copy, ledger);
    }

    #[test]
    fn clear_on_empty_still_notifies() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut ledger = NoteLedger::new();
        ledger.subscribe(move |change, _| sink.borrow_mut().push(change.clone()));

        ledger.clear();

        assert_eq!(*seen.borrow(), vec![LedgerChange::Cleared { removed: 0 }]);
    }
}
