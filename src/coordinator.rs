//! Cross-entity restoration.
//!
//! The coordinator is the only place where agents and items are brought back
//! into agreement. A pass runs in a fixed order:
//!
//! 1. items, because whether an item is free or held decides where it goes;
//! 2. agents, whose poses the held items depend on;
//! 3. reconciliation: carried references are rebuilt from the item side,
//!    and every held item is snapped to its holder's final hold point.
//!
//! Step 3 is what keeps a held item from being placed against a stale agent
//! pose.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::adapter::{AgentAdapter, ItemAdapter, Restored};
use crate::clock::Clock;
use crate::entity::{AgentId, EntityRegistry, ItemId};
use crate::error::RestoreError;
use crate::snapshot::ItemState;
use crate::storage::{TimelineStore, TimelineStores};
use crate::time::Tick;
use crate::world::World;

/// What a restoration pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestoreReport {
    /// Target time in seconds.
    pub time: f64,
    /// Tick the target resolved to, `None` for a negative target.
    pub tick: Option<Tick>,
    /// Agents that had a snapshot and got it applied.
    pub agents_restored: usize,
    /// Live agents with nothing recorded at or before the target.
    pub agents_without_data: usize,
    /// Items that had a snapshot and got it applied.
    pub items_restored: usize,
    /// Live items with nothing recorded at or before the target.
    pub items_without_data: usize,
    /// Final holder of every held item, keyed by item.
    pub held: BTreeMap<ItemId, AgentId>,
    /// Recovered anomalies, in the order they were found.
    #[serde(serialize_with = "serialize_issues")]
    pub issues: Vec<RestoreError>,
    /// The clock was playing and had to be paused first.
    pub forced_pause: bool,
}

fn serialize_issues<S: serde::Serializer>(issues: &[RestoreError], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(issues.iter().map(ToString::to_string))
}

impl RestoreReport {
    /// True if nothing had to be recovered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn issue(&mut self, issue: RestoreError) {
        tracing::warn!(%issue, "restore anomaly");
        self.issues.push(issue);
    }
}

/// Orders restoration across both adapters.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestoreCoordinator;

impl RestoreCoordinator {
    /// Restore every registered entity to its state at `t`.
    ///
    /// Scrubbing requires a paused clock. A playing clock is paused first
    /// and the report says so.
    pub fn restore_all<W: World + ?Sized>(
        clock: &mut Clock,
        registry: &EntityRegistry,
        stores: &TimelineStores,
        world: &mut W,
        t: f64,
    ) -> RestoreReport {
        let forced_pause = clock.is_playing();
        if forced_pause {
            tracing::warn!(time = t, "scrub requested while playing, pausing first");
            clock.pause();
        }
        let mut report = Self::replay(registry, stores, world, t);
        report.forced_pause = forced_pause;
        report
    }

    /// Restore without touching the clock.
    ///
    /// This is the path used by reverse playback, where the clock keeps
    /// running and nothing is recorded.
    pub fn replay<W: World + ?Sized>(
        registry: &EntityRegistry,
        stores: &TimelineStores,
        world: &mut W,
        t: f64,
    ) -> RestoreReport {
        let mut report = RestoreReport {
            time: t,
            tick: stores.items.tick_clock().tick_floor(t),
            ..RestoreReport::default()
        };
        let Some(tick) = report.tick else {
            tracing::debug!(time = t, "restore target before zero, nothing to do");
            return report;
        };

        // Agent -> item it holds, lowest item id first.
        let mut holders: BTreeMap<AgentId, ItemId> = BTreeMap::new();
        Self::restore_items(registry, stores, world, tick, &mut holders, &mut report);
        Self::restore_agents(registry, stores, world, tick, &holders, &mut report);
        Self::snap_held(world, &holders);

        report.held = holders.into_iter().map(|(agent, item)| (item, agent)).collect();
        tracing::debug!(
            time = t,
            %tick,
            agents = report.agents_restored,
            items = report.items_restored,
            held = report.held.len(),
            issues = report.issues.len(),
            "restored"
        );
        report
    }

    fn restore_items<W: World + ?Sized>(
        registry: &EntityRegistry,
        stores: &TimelineStores,
        world: &mut W,
        tick: Tick,
        holders: &mut BTreeMap<AgentId, ItemId>,
        report: &mut RestoreReport,
    ) {
        for (id, spec) in registry.items() {
            if world.item_pose(id).is_none() {
                report.issue(RestoreError::MissingLiveEntity {
                    kind: "item",
                    id: id.index(),
                });
                continue;
            }

            let Some((_, snapshot)) = ItemAdapter::resolve(&stores.items, id, tick) else {
                // Untouched, but a live holder still has to be kept consistent.
                report.items_without_data += 1;
                let Some(holder) = world.item_parent(id).holder() else {
                    continue;
                };
                if let Some(&kept) = holders.get(&holder) {
                    report.issue(RestoreError::HolderConflict { item: id, holder, kept });
                    if let Some(pose) = world.item_pose(id) {
                        ItemAdapter::apply_free(world, id, pose, &spec.placement);
                    }
                } else {
                    holders.insert(holder, id);
                }
                continue;
            };

            report.items_restored += 1;
            let ItemState::Held { holder } = snapshot.state else {
                ItemAdapter::apply_free(world, id, snapshot.pose, &spec.placement);
                continue;
            };

            let holder_live = registry.contains_agent(holder) && world.agent_pose(holder).is_some();
            if !holder_live {
                report.issue(RestoreError::DanglingHolder { item: id, holder });
                ItemAdapter::apply_free(world, id, snapshot.pose, &spec.placement);
                continue;
            }
            if let Some(&kept) = holders.get(&holder) {
                report.issue(RestoreError::HolderConflict { item: id, holder, kept });
                ItemAdapter::apply_free(world, id, snapshot.pose, &spec.placement);
                continue;
            }

            ItemAdapter::apply_held(world, id, holder);
            holders.insert(holder, id);
        }
    }

    fn restore_agents<W: World + ?Sized>(
        registry: &EntityRegistry,
        stores: &TimelineStores,
        world: &mut W,
        tick: Tick,
        holders: &BTreeMap<AgentId, ItemId>,
        report: &mut RestoreReport,
    ) {
        for id in registry.agents() {
            let carrying = match AgentAdapter::restore(&stores.agents, world, id, tick) {
                Restored::Applied { snapshot, .. } => {
                    report.agents_restored += 1;
                    snapshot.carrying
                }
                Restored::NoData => {
                    report.agents_without_data += 1;
                    false
                }
                Restored::NotLive => {
                    report.issue(RestoreError::MissingLiveEntity {
                        kind: "agent",
                        id: id.index(),
                    });
                    continue;
                }
            };

            let carried = holders.get(&id).copied();
            if carrying && carried.is_none() {
                report.issue(RestoreError::CarryingWithoutItem { agent: id });
            }
            world.set_carried_item(id, carried);
        }
    }

    fn snap_held<W: World + ?Sized>(world: &mut W, holders: &BTreeMap<AgentId, ItemId>) {
        for (&agent, &item) in holders {
            if let Some(hold) = world.hold_point(agent) {
                world.set_item_pose(item, hold);
            }
        }
    }
}
