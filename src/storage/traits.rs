//! Abstract timeline storage.
//!
//! A timeline store maps `(entity id, tick)` to a snapshot. The contract:
//! - Ticks of one entity are strictly increasing, one snapshot per tick.
//! - `record` drops every entry strictly after the recorded tick before it
//!   inserts, so recording into the past replaces the old future.
//! - `query` resolves the latest entry at or before the requested tick.

use serde::{Deserialize, Serialize};

use crate::time::{Tick, TickClock};

/// Aggregate counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineStats {
    /// Entities with at least one snapshot.
    pub entities: usize,
    /// Snapshots across all entities.
    pub snapshots: usize,
    /// Earliest recorded tick of any entity.
    pub earliest: Option<Tick>,
    /// Latest recorded tick of any entity.
    pub latest: Option<Tick>,
}

/// Storage contract for per-entity timelines of snapshot type `S`.
pub trait TimelineStore<K, S> {
    /// The quantizer used to convert seconds into ticks.
    fn tick_clock(&self) -> TickClock;

    /// Truncate entries of `id` after `tick`, then insert or overwrite `tick`.
    ///
    /// Returns the number of truncated entries (an overwrite at `tick` is not counted).
    fn record_tick(&mut self, id: K, tick: Tick, snapshot: S) -> usize;

    /// Latest snapshot of `id` at or before `tick`, with the tick it was filed under.
    fn query_tick(&self, id: K, tick: Tick) -> Option<(Tick, &S)>;

    /// Drop the whole timeline of one entity. Returns false if it had none.
    fn clear_entity(&mut self, id: K) -> bool;

    /// Drop every timeline.
    fn clear_all(&mut self);

    /// Aggregate counters.
    fn stats(&self) -> TimelineStats;

    /// Record a snapshot taken at `seconds` (floored onto the tick grid).
    fn record(&mut self, id: K, seconds: f64, snapshot: S) -> usize {
        let tick = self.tick_clock().tick_at(seconds);
        self.record_tick(id, tick, snapshot)
    }

    /// Latest snapshot of `id` recorded at or before `seconds`.
    ///
    /// Returns `None` for negative times or when nothing was recorded yet.
    fn query(&self, id: K, seconds: f64) -> Option<&S> {
        let tick = self.tick_clock().tick_floor(seconds)?;
        self.query_tick(id, tick).map(|(_, snapshot)| snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{AgentId, ItemId};
    use crate::snapshot::{AgentSnapshot, ItemSnapshot};

    // Compile-time test: ensure the trait is object-safe for both entity kinds
    fn _assert_agent_store_object_safe(_: &dyn TimelineStore<AgentId, AgentSnapshot>) {}
    fn _assert_item_store_object_safe(_: &dyn TimelineStore<ItemId, ItemSnapshot>) {}

    #[test]
    fn stats_default_is_empty() {
        let stats = TimelineStats::default();
        assert_eq!(stats.entities, 0);
        assert_eq!(stats.snapshots, 0);
        assert!(stats.earliest.is_none());
        assert!(stats.latest.is_none());
    }
}
