//! In-memory storage backend.
//!
//! Timelines live for one play session. The store is single-writer: only
//! the forward recording path calls `record*`, only restoration reads.

use std::collections::HashMap;
use std::hash::Hash;

use crate::entity::{AgentId, ItemId};
use crate::snapshot::{AgentSnapshot, ItemSnapshot};
use crate::storage::timeline::Timeline;
use crate::storage::traits::{TimelineStats, TimelineStore};
use crate::time::{Tick, TickClock};

/// In-memory timeline store, generic over entity id and snapshot type.
#[derive(Debug, Clone)]
pub struct InMemoryTimelineStore<K, S> {
    clock: TickClock,
    timelines: HashMap<K, Timeline<S>>,
}

impl<K, S> InMemoryTimelineStore<K, S>
where
    K: Copy + Eq + Hash,
{
    /// Create an empty store quantizing with `clock`.
    #[must_use]
    pub fn new(clock: TickClock) -> Self {
        Self {
            clock,
            timelines: HashMap::new(),
        }
    }

    /// The full timeline of one entity, if any was recorded.
    #[must_use]
    pub fn timeline(&self, id: K) -> Option<&Timeline<S>> {
        self.timelines.get(&id)
    }
}

impl<K, S> Default for InMemoryTimelineStore<K, S>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new(TickClock::default())
    }
}

impl<K, S> TimelineStore<K, S> for InMemoryTimelineStore<K, S>
where
    K: Copy + Eq + Hash,
{
    fn tick_clock(&self) -> TickClock {
        self.clock
    }

    fn record_tick(&mut self, id: K, tick: Tick, snapshot: S) -> usize {
        self.timelines.entry(id).or_default().record(tick, snapshot)
    }

    fn query_tick(&self, id: K, tick: Tick) -> Option<(Tick, &S)> {
        self.timelines.get(&id)?.at_or_before(tick)
    }

    fn clear_entity(&mut self, id: K) -> bool {
        self.timelines.remove(&id).is_some()
    }

    fn clear_all(&mut self) {
        self.timelines.clear();
    }

    fn stats(&self) -> TimelineStats {
        self.timelines
            .values()
            .filter(|tl| !tl.is_empty())
            .fold(TimelineStats::default(), |mut acc, tl| {
                acc.entities += 1;
                acc.snapshots += tl.len();
                acc.earliest = min_tick(acc.earliest, tl.first_tick());
                acc.latest = acc.latest.max(tl.last_tick());
                acc
            })
    }
}

fn min_tick(a: Option<Tick>, b: Option<Tick>) -> Option<Tick> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Timeline store for agents.
pub type AgentTimelineStore = InMemoryTimelineStore<AgentId, AgentSnapshot>;

/// Timeline store for items.
pub type ItemTimelineStore = InMemoryTimelineStore<ItemId, ItemSnapshot>;

/// Bundle of both stores sharing one quantizer.
#[derive(Debug, Clone, Default)]
pub struct TimelineStores {
    /// Agent timelines.
    pub agents: AgentTimelineStore,
    /// Item timelines.
    pub items: ItemTimelineStore,
}

impl TimelineStores {
    /// Create a bundle.
    #[must_use]
    pub fn new(clock: TickClock) -> Self {
        Self {
            agents: InMemoryTimelineStore::new(clock),
            items: InMemoryTimelineStore::new(clock),
        }
    }

    /// Clear both stores (level reset).
    pub fn clear_all(&mut self) {
        self.agents.clear_all();
        self.items.clear_all();
    }
}
