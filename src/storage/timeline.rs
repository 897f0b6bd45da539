//! The per-entity ordered history.

use crate::time::Tick;

/// Snapshots of one entity, sorted by strictly increasing tick.
///
/// Backed by a sorted vector: forward recording is an amortized push, a
/// lookup is a binary search, and truncation costs the number of entries
/// dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<S> {
    entries: Vec<(Tick, S)>,
}

impl<S> Timeline<S> {
    /// An empty timeline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Drop entries after `tick`, then insert or overwrite the entry at `tick`.
    ///
    /// Returns how many later entries were dropped.
    pub fn record(&mut self, tick: Tick, snapshot: S) -> usize {
        let keep = self.entries.partition_point(|(t, _)| *t <= tick);
        let truncated = self.entries.len() - keep;
        self.entries.truncate(keep);

        match self.entries.last_mut() {
            Some((last, slot)) if *last == tick => *slot = snapshot,
            _ => self.entries.push((tick, snapshot)),
        }
        truncated
    }

    /// Latest entry at or before `tick`.
    #[must_use]
    pub fn at_or_before(&self, tick: Tick) -> Option<(Tick, &S)> {
        let idx = self.entries.partition_point(|(t, _)| *t <= tick);
        idx.checked_sub(1)
            .map(|i| (self.entries[i].0, &self.entries[i].1))
    }

    /// Earliest recorded tick.
    #[must_use]
    pub fn first_tick(&self) -> Option<Tick> {
        self.entries.first().map(|(t, _)| *t)
    }

    /// Latest recorded tick.
    #[must_use]
    pub fn last_tick(&self) -> Option<Tick> {
        self.entries.last().map(|(t, _)| *t)
    }

    /// Number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in tick order.
    pub fn iter(&self) -> impl Iterator<Item = (Tick, &S)> + '_ {
        self.entries.iter().map(|(t, s)| (*t, s))
    }
}

impl<S> Default for Timeline<S> {
    fn default() -> Self {
        Self::new()
    }
}
