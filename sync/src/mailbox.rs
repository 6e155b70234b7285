//! Single-slot-per-kind delivery.
//!
//! Each kind has one slot. A value assigned to a slot is pending until
//! [`Mailbox::next`] takes it; assigning another value to the same slot first
//! overwrites it. Pending values are taken in assignment order across kinds.

use std::collections::BTreeMap;

/// Outcome of [`Mailbox::assign`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Equal to the slot's current value; nothing was queued.
    Unchanged,
    Queued,
    /// Replaced a value that had not been taken yet.
    Superseded,
}

#[derive(Debug, Clone)]
struct Slot<V> {
    current: Option<V>,
    pending: Option<(u64, V)>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            current: None,
            pending: None,
        }
    }
}

/// Capacity-1 slots keyed by kind.
#[derive(Debug, Clone)]
pub struct Mailbox<K, V> {
    slots: BTreeMap<K, Slot<V>>,
    sequence: u64,
}

impl<K, V> Default for Mailbox<K, V> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
            sequence: 0,
        }
    }
}

impl<K: Ord + Copy, V: Clone + PartialEq> Mailbox<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slot's current value, queueing it unless it equals the
    /// current one.
    pub fn assign(&mut self, kind: K, value: V) -> Assignment {
        let slot = self.slots.entry(kind).or_default();
        if slot.current.as_ref() == Some(&value) {
            return Assignment::Unchanged;
        }
        slot.current = Some(value.clone());
        self.sequence += 1;
        match slot.pending.replace((self.sequence, value)) {
            Some(_) => Assignment::Superseded,
            None => Assignment::Queued,
        }
    }

    /// Resets the slot's current value. A pending value stays queued.
    pub fn clear(&mut self, kind: K) {
        if let Some(slot) = self.slots.get_mut(&kind) {
            slot.current = None;
        }
    }

    /// Takes the oldest pending value.
    pub fn next(&mut self) -> Option<(K, V)> {
        let (_, kind) = self
            .slots
            .iter()
            .filter_map(|(kind, slot)| slot.pending.as_ref().map(|(seq, _)| (*seq, *kind)))
            .min()?;
        let (_, value) = self.slots.get_mut(&kind)?.pending.take()?;
        Some((kind, value))
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.pending.is_some())
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending_len() == 0
    }
}
