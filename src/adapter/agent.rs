use crate::adapter::Restored;
use crate::entity::AgentId;
use crate::snapshot::AgentSnapshot;
use crate::storage::TimelineStore;
use crate::time::Tick;
use crate::world::AgentHost;

/// Records and restores agent poses.
///
/// Possession is not resolved here: the item timelines are authoritative
/// for who holds what, so the coordinator reconciles carried items after
/// both kinds are restored.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgentAdapter;

impl AgentAdapter {
    /// Read the live pose and carrying flag of an agent.
    pub fn capture<W: AgentHost + ?Sized>(world: &W, id: AgentId) -> Option<AgentSnapshot> {
        let pose = world.agent_pose(id)?;
        Some(AgentSnapshot::new(pose, world.is_carrying(id)))
    }

    /// Capture an agent and record it at `tick`.
    ///
    /// Returns the number of truncated future entries, or `None` if the agent
    /// is not live.
    pub fn record<St, W>(store: &mut St, world: &W, id: AgentId, tick: Tick) -> Option<usize>
    where
        St: TimelineStore<AgentId, AgentSnapshot> + ?Sized,
        W: AgentHost + ?Sized,
    {
        let snapshot = Self::capture(world, id)?;
        let truncated = store.record_tick(id, tick, snapshot);
        tracing::trace!(agent = %id, %tick, carrying = snapshot.carrying, "recorded agent");
        if truncated > 0 {
            tracing::debug!(agent = %id, %tick, truncated, "discarded recorded future of agent");
        }
        Some(truncated)
    }

    /// Overwrite the live pose with the snapshot resolved for `tick`.
    pub fn restore<St, W>(store: &St, world: &mut W, id: AgentId, tick: Tick) -> Restored<AgentSnapshot>
    where
        St: TimelineStore<AgentId, AgentSnapshot> + ?Sized,
        W: AgentHost + ?Sized,
    {
        if world.agent_pose(id).is_none() {
            return Restored::NotLive;
        }
        let Some((at, snapshot)) = store.query_tick(id, tick) else {
            return Restored::NoData;
        };
        world.set_agent_pose(id, snapshot.pose);
        Restored::Applied {
            tick: at,
            snapshot: *snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::Vec3;

    use crate::math::Pose;
    use crate::storage::AgentTimelineStore;
    use crate::world::SimWorld;

    fn setup() -> (AgentTimelineStore, SimWorld, AgentId) {
        let mut world = SimWorld::new(Vec3::Y);
        let id = AgentId::new(0);
        world.add_agent(id, Pose::IDENTITY);
        (AgentTimelineStore::default(), world, id)
    }

    #[test]
    fn record_then_restore_pose() {
        let (mut store, mut world, id) = setup();
        world.move_agent(id, Pose::at(Vec3::new(1.0, 0.0, 0.0))).unwrap();
        assert_eq!(AgentAdapter::record(&mut store, &world, id, Tick::new(10)), Some(0));

        world.move_agent(id, Pose::at(Vec3::new(7.0, 0.0, 0.0))).unwrap();
        let restored = AgentAdapter::restore(&store, &mut world, id, Tick::new(12));
        assert!(restored.is_applied());
        assert_eq!(world.agent_pose(id).unwrap().position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn restore_before_first_record_leaves_pose() {
        let (mut store, mut world, id) = setup();
        AgentAdapter::record(&mut store, &world, id, Tick::new(10));
        world.move_agent(id, Pose::at(Vec3::new(3.0, 0.0, 0.0))).unwrap();

        let restored = AgentAdapter::restore(&store, &mut world, id, Tick::new(5));
        assert_eq!(restored, Restored::NoData);
        assert_eq!(world.agent_pose(id).unwrap().position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn missing_agent_is_not_recorded() {
        let (mut store, mut world, _) = setup();
        let ghost = AgentId::new(9);
        assert_eq!(AgentAdapter::record(&mut store, &world, ghost, Tick::ZERO), None);
        assert_eq!(
            AgentAdapter::restore(&store, &mut world, ghost, Tick::ZERO),
            Restored::NotLive
        );
    }

    #[test]
    fn capture_reads_carrying_flag() {
        let (_, mut world, id) = setup();
        let item = crate::entity::ItemId::new(0);
        world.add_item(item, Pose::IDENTITY);
        world.pick_up(id, item).unwrap();
        assert!(AgentAdapter::capture(&world, id).unwrap().carrying);
    }
}
