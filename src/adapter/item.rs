use crate::entity::{AgentId, ItemId, Placement};
use crate::math::Pose;
use crate::snapshot::{ItemSnapshot, ItemState};
use crate::storage::TimelineStore;
use crate::time::Tick;
use crate::world::{AgentHost, ItemHost, ItemParent};

/// Records and restores item pose, possession and placement.
///
/// Restoring happens in two halves so the coordinator can reconcile
/// possession in between: [`ItemAdapter::resolve`] looks the snapshot up,
/// then [`ItemAdapter::apply_free`] or [`ItemAdapter::apply_held`] writes it
/// onto the live item.
#[derive(Debug, Default, Clone, Copy)]
pub struct ItemAdapter;

impl ItemAdapter {
    /// Read the live item and derive its state against `placement`.
    pub fn capture<W: ItemHost + ?Sized>(world: &W, id: ItemId, placement: &Placement) -> Option<ItemSnapshot> {
        let pose = world.item_pose(id)?;
        let holder = world.item_parent(id).holder();
        Some(ItemSnapshot::capture(pose, holder, placement))
    }

    /// Capture an item and record it at `tick`.
    ///
    /// The live completed marker is synced to the derived state. Returns the
    /// recorded snapshot and the number of truncated future entries, or `None`
    /// if the item is not live.
    pub fn record<St, W>(
        store: &mut St,
        world: &mut W,
        id: ItemId,
        placement: &Placement,
        tick: Tick,
    ) -> Option<(ItemSnapshot, usize)>
    where
        St: TimelineStore<ItemId, ItemSnapshot> + ?Sized,
        W: ItemHost + ?Sized,
    {
        let snapshot = Self::capture(world, id, placement)?;
        world.set_item_completed(id, snapshot.state.is_placed());
        let truncated = store.record_tick(id, tick, snapshot);
        tracing::trace!(item = %id, %tick, state = %snapshot.state, "recorded item");
        if truncated > 0 {
            tracing::debug!(item = %id, %tick, truncated, "discarded recorded future of item");
        }
        Some((snapshot, truncated))
    }

    /// Snapshot in effect at `tick`, with the tick it was recorded at.
    pub fn resolve<St>(store: &St, id: ItemId, tick: Tick) -> Option<(Tick, ItemSnapshot)>
    where
        St: TimelineStore<ItemId, ItemSnapshot> + ?Sized,
    {
        store.query_tick(id, tick).map(|(at, snap)| (at, *snap))
    }

    /// Put the item down free-standing at `pose` with physics on.
    ///
    /// Placement is re-derived from the live target, so an item recorded as
    /// placed may come back on the ground if its target moved since.
    pub fn apply_free<W: ItemHost + ?Sized>(world: &mut W, id: ItemId, pose: Pose, placement: &Placement) -> ItemState {
        world.set_item_parent(id, ItemParent::Free);
        world.set_item_pose(id, pose);
        world.set_item_physics(id, true);
        let state = ItemState::derive(None, pose.position, placement);
        world.set_item_completed(id, state.is_placed());
        state
    }

    /// Pin the item to `holder`'s hold point with zero offset and physics off.
    ///
    /// The caller has already checked that `holder` is live. The carried
    /// reference on the agent side is left to the coordinator.
    pub fn apply_held<W>(world: &mut W, id: ItemId, holder: AgentId) -> ItemState
    where
        W: AgentHost + ItemHost + ?Sized,
    {
        world.set_item_parent(id, ItemParent::HoldPoint(holder));
        if let Some(hold) = world.hold_point(holder) {
            world.set_item_pose(id, hold);
        }
        world.set_item_physics(id, false);
        world.set_item_completed(id, false);
        ItemState::Held { holder }
    }
}
