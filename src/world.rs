//! The boundary to the live game world.
//!
//! Movement, physics and rendering are owned by the host. The engine only
//! needs to read and overwrite poses, re-parent items, and toggle an item's
//! physics and "completed" marker. [`SimWorld`] is a small host used by the
//! demo binary and the tests.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::entity::{AgentId, ItemId};
use crate::error::ValidationError;
use crate::math::Pose;

/// What an item is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "parent", content = "agent", rename_all = "snake_case")]
pub enum ItemParent {
    /// Free-standing in the world.
    #[default]
    Free,
    /// Pinned to an agent's hold point with zero local offset.
    HoldPoint(AgentId),
}

impl ItemParent {
    /// The agent whose hold point this is, if any.
    #[must_use]
    pub const fn holder(self) -> Option<AgentId> {
        match self {
            Self::Free => None,
            Self::HoldPoint(agent) => Some(agent),
        }
    }
}

/// Live agent access, provided by the movement subsystem.
pub trait AgentHost {
    /// Current world pose, or `None` if the agent is not live.
    fn agent_pose(&self, id: AgentId) -> Option<Pose>;

    /// Teleport a live agent. Unknown ids are ignored.
    fn set_agent_pose(&mut self, id: AgentId, pose: Pose);

    /// World pose of the agent's hold point.
    fn hold_point(&self, id: AgentId) -> Option<Pose>;

    /// The item the agent currently carries.
    fn carried_item(&self, id: AgentId) -> Option<ItemId>;

    /// Overwrite what the agent's hold point is occupied by.
    fn set_carried_item(&mut self, id: AgentId, item: Option<ItemId>);

    /// True if the hold point is occupied.
    fn is_carrying(&self, id: AgentId) -> bool {
        self.carried_item(id).is_some()
    }
}

/// Live item access, provided by the physics/item subsystem.
pub trait ItemHost {
    /// Current world pose, or `None` if the item is not live.
    fn item_pose(&self, id: ItemId) -> Option<Pose>;

    /// Move a live item. Unknown ids are ignored.
    fn set_item_pose(&mut self, id: ItemId, pose: Pose);

    /// Current attachment; `Free` for unknown ids.
    fn item_parent(&self, id: ItemId) -> ItemParent;

    /// Attach the item to a hold point or free it.
    fn set_item_parent(&mut self, id: ItemId, parent: ItemParent);

    /// Enable or disable independent physics and collision.
    fn set_item_physics(&mut self, id: ItemId, enabled: bool);

    /// Marker read by the victory check and by rendering.
    fn set_item_completed(&mut self, id: ItemId, completed: bool);
}

/// A host exposing both entity kinds.
pub trait World: AgentHost + ItemHost {}

impl<T: AgentHost + ItemHost> World for T {}

/// Live state of an agent in [`SimWorld`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimAgent {
    /// World-space pose.
    pub pose: Pose,
    /// Hold point offset in the agent's local frame.
    pub hold_offset: Vec3,
    /// Item pinned to the hold point.
    pub carried: Option<ItemId>,
}

/// Live state of an item in [`SimWorld`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimItem {
    /// Own pose; ignored while attached to a hold point.
    pub pose: Pose,
    /// Hold point the item is pinned to, if any.
    pub parent: ItemParent,
    /// Independent physics and collision; off while held.
    pub physics: bool,
    /// Completed marker read by the victory check.
    pub completed: bool,
}

/// Minimal in-memory host with pick up / drop mechanics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimWorld {
    agents: BTreeMap<AgentId, SimAgent>,
    items: BTreeMap<ItemId, SimItem>,
    hold_offset: Vec3,
}

impl SimWorld {
    /// Create an empty world whose agents hold items at `hold_offset`.
    #[must_use]
    pub fn new(hold_offset: Vec3) -> Self {
        Self {
            agents: BTreeMap::new(),
            items: BTreeMap::new(),
            hold_offset,
        }
    }

    /// Spawn an agent with empty hands. Replaces any agent under `id`.
    pub fn add_agent(&mut self, id: AgentId, pose: Pose) {
        self.agents.insert(
            id,
            SimAgent {
                pose,
                hold_offset: self.hold_offset,
                carried: None,
            },
        );
    }

    /// Spawn a free-standing item with physics on. Replaces any item under `id`.
    pub fn add_item(&mut self, id: ItemId, pose: Pose) {
        self.items.insert(
            id,
            SimItem {
                pose,
                parent: ItemParent::Free,
                physics: true,
                completed: false,
            },
        );
    }

    /// Remove an agent. A carried item is left free-standing where it was.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<SimAgent> {
        let drop_pose = self.hold_point(id);
        let agent = self.agents.remove(&id)?;
        if let (Some(item_id), Some(pose)) = (agent.carried, drop_pose) {
            if let Some(item) = self.items.get_mut(&item_id) {
                item.parent = ItemParent::Free;
                item.pose = pose;
                item.physics = true;
            }
        }
        Some(agent)
    }

    /// Remove an item, detaching it from its carrier.
    pub fn remove_item(&mut self, id: ItemId) -> Option<SimItem> {
        let item = self.items.remove(&id)?;
        if let ItemParent::HoldPoint(agent) = item.parent {
            if let Some(agent) = self.agents.get_mut(&agent) {
                if agent.carried == Some(id) {
                    agent.carried = None;
                }
            }
        }
        Some(item)
    }

    /// Live agent state.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&SimAgent> {
        self.agents.get(&id)
    }

    /// Live item state.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&SimItem> {
        self.items.get(&id)
    }

    /// Teleport an agent (movement itself is out of scope).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownAgent` if the agent is not live.
    pub fn move_agent(&mut self, id: AgentId, pose: Pose) -> Result<(), ValidationError> {
        let agent = self
            .agents
            .get_mut(&id)
            .ok_or(ValidationError::UnknownAgent { id })?;
        agent.pose = pose;
        Ok(())
    }

    /// Attach `item` to `agent`'s hold point.
    ///
    /// # Errors
    ///
    /// Fails if either entity is not live, the agent already carries
    /// something, or another agent holds the item.
    pub fn pick_up(&mut self, agent_id: AgentId, item_id: ItemId) -> Result<(), ValidationError> {
        let agent = self
            .agents
            .get(&agent_id)
            .ok_or(ValidationError::UnknownAgent { id: agent_id })?;
        if let Some(carried) = agent.carried {
            return Err(ValidationError::InvalidAction {
                reason: format!("agent {agent_id} already carries item {carried}"),
            });
        }
        let item = self
            .items
            .get(&item_id)
            .ok_or(ValidationError::UnknownItem { id: item_id })?;
        if let ItemParent::HoldPoint(holder) = item.parent {
            return Err(ValidationError::InvalidAction {
                reason: format!("item {item_id} is already held by agent {holder}"),
            });
        }

        self.set_item_parent(item_id, ItemParent::HoldPoint(agent_id));
        self.set_item_physics(item_id, false);
        self.set_item_completed(item_id, false);
        self.set_carried_item(agent_id, Some(item_id));
        Ok(())
    }

    /// Detach whatever `agent` carries and put it down at `at`.
    ///
    /// Returns the dropped item, or `None` if the agent carried nothing.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownAgent` if the agent is not live.
    pub fn drop_item(&mut self, agent_id: AgentId, at: Pose) -> Result<Option<ItemId>, ValidationError> {
        let agent = self
            .agents
            .get_mut(&agent_id)
            .ok_or(ValidationError::UnknownAgent { id: agent_id })?;
        let Some(item_id) = agent.carried.take() else {
            return Ok(None);
        };
        self.set_item_parent(item_id, ItemParent::Free);
        self.set_item_pose(item_id, at);
        self.set_item_physics(item_id, true);
        Ok(Some(item_id))
    }
}

impl AgentHost for SimWorld {
    fn agent_pose(&self, id: AgentId) -> Option<Pose> {
        self.agents.get(&id).map(|a| a.pose)
    }

    fn set_agent_pose(&mut self, id: AgentId, pose: Pose) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.pose = pose;
        }
    }

    fn hold_point(&self, id: AgentId) -> Option<Pose> {
        self.agents
            .get(&id)
            .map(|a| a.pose.transform(&Pose::at(a.hold_offset)))
    }

    fn carried_item(&self, id: AgentId) -> Option<ItemId> {
        self.agents.get(&id).and_then(|a| a.carried)
    }

    fn set_carried_item(&mut self, id: AgentId, item: Option<ItemId>) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.carried = item;
        }
    }
}

impl ItemHost for SimWorld {
    fn item_pose(&self, id: ItemId) -> Option<Pose> {
        let item = self.items.get(&id)?;
        match item.parent {
            ItemParent::HoldPoint(agent) => self.hold_point(agent).or(Some(item.pose)),
            ItemParent::Free => Some(item.pose),
        }
    }

    fn set_item_pose(&mut self, id: ItemId, pose: Pose) {
        if let Some(item) = self.items.get_mut(&id) {
            item.pose = pose;
        }
    }

    fn item_parent(&self, id: ItemId) -> ItemParent {
        self.items.get(&id).map_or(ItemParent::Free, |i| i.parent)
    }

    fn set_item_parent(&mut self, id: ItemId, parent: ItemParent) {
        if let Some(item) = self.items.get_mut(&id) {
            item.parent = parent;
        }
    }

    fn set_item_physics(&mut self, id: ItemId, enabled: bool) {
        if let Some(item) = self.items.get_mut(&id) {
            item.physics = enabled;
        }
    }

    fn set_item_completed(&mut self, id: ItemId, completed: bool) {
        if let Some(item) = self.items.get_mut(&id) {
            item.completed = completed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (SimWorld, AgentId, ItemId) {
        let mut w = SimWorld::new(Vec3::new(0.0, 1.5, 0.0));
        let a = AgentId::new(0);
        let i = ItemId::new(0);
        w.add_agent(a, Pose::at(Vec3::new(1.0, 0.0, 0.0)));
        w.add_item(i, Pose::at(Vec3::new(2.0, 0.0, 0.0)));
        (w, a, i)
    }

    #[test]
    fn held_item_follows_hold_point() {
        let (mut w, a, i) = world();
        w.pick_up(a, i).unwrap();
        assert!(w.is_carrying(a));
        assert_eq!(w.item_parent(i), ItemParent::HoldPoint(a));
        assert!(!w.item(i).unwrap().physics);
        assert_eq!(w.item_pose(i).unwrap().position, Vec3::new(1.0, 1.5, 0.0));

        w.move_agent(a, Pose::at(Vec3::new(4.0, 0.0, 0.0))).unwrap();
        assert_eq!(w.item_pose(i).unwrap().position, Vec3::new(4.0, 1.5, 0.0));
    }

    #[test]
    fn drop_detaches_and_enables_physics() {
        let (mut w, a, i) = world();
        w.pick_up(a, i).unwrap();
        let dropped = w.drop_item(a, Pose::at(Vec3::new(9.0, 0.0, 0.0))).unwrap();
        assert_eq!(dropped, Some(i));
        assert!(!w.is_carrying(a));
        assert_eq!(w.item_parent(i), ItemParent::Free);
        assert!(w.item(i).unwrap().physics);
        assert_eq!(w.item_pose(i).unwrap().position, Vec3::new(9.0, 0.0, 0.0));
        assert_eq!(w.drop_item(a, Pose::IDENTITY).unwrap(), None);
    }

    #[test]
    fn pick_up_rejects_double_carry_and_double_hold() {
        let (mut w, a, i) = world();
        let b = AgentId::new(1);
        let j = ItemId::new(1);
        w.add_agent(b, Pose::IDENTITY);
        w.add_item(j, Pose::IDENTITY);

        w.pick_up(a, i).unwrap();
        assert!(matches!(w.pick_up(a, j), Err(ValidationError::InvalidAction { .. })));
        assert!(matches!(w.pick_up(b, i), Err(ValidationError::InvalidAction { .. })));
        assert!(matches!(
            w.pick_up(AgentId::new(9), j),
            Err(ValidationError::UnknownAgent { .. })
        ));
    }

    #[test]
    fn removing_carrier_leaves_item_in_place() {
        let (mut w, a, i) = world();
        w.pick_up(a, i).unwrap();
        w.remove_agent(a).unwrap();
        assert_eq!(w.item_parent(i), ItemParent::Free);
        assert_eq!(w.item_pose(i).unwrap().position, Vec3::new(1.0, 1.5, 0.0));
    }

    #[test]
    fn removing_held_item_clears_carrier() {
        let (mut w, a, i) = world();
        w.pick_up(a, i).unwrap();
        w.remove_item(i).unwrap();
        assert!(!w.is_carrying(a));
        assert_eq!(w.item_pose(i), None);
    }
}
