//! Recorded per-entity state.
//!
//! Snapshots are small, fixed-shape values. They are captured from the live
//! world once per forward tick and applied back when the player scrubs.

use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::entity::{AgentId, Placement};
use crate::math::Pose;

/// Recorded state of one agent at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent pose at capture time.
    pub pose: Pose,
    /// Whether the agent's hold point was occupied.
    pub carrying: bool,
}

impl AgentSnapshot {
    /// A snapshot from its parts.
    #[must_use]
    pub const fn new(pose: Pose, carrying: bool) -> Self {
        Self { pose, carrying }
    }

    /// Recorded position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.pose.position
    }

    /// Recorded rotation.
    #[must_use]
    pub const fn orientation(&self) -> Quat {
        self.pose.orientation
    }
}

/// Possession and placement state of an item.
///
/// `Held` carries its holder, so a held item without a holder cannot be
/// represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemState {
    /// Free-standing, away from its target.
    OnGround,
    /// Pinned to an agent's hold point.
    Held {
        /// The agent whose hold point the item is pinned to.
        holder: AgentId,
    },
    /// Free-standing and within tolerance of its target.
    PlacedCorrectly,
}

impl ItemState {
    /// Derive the state from possession and live placement.
    ///
    /// Placement only matters for free-standing items.
    #[must_use]
    pub fn derive(holder: Option<AgentId>, position: Vec3, placement: &Placement) -> Self {
        match holder {
            Some(holder) => Self::Held { holder },
            None if placement.contains(position) => Self::PlacedCorrectly,
            None => Self::OnGround,
        }
    }

    /// The holder, if held.
    #[must_use]
    pub const fn holder(&self) -> Option<AgentId> {
        match self {
            Self::Held { holder } => Some(*holder),
            Self::OnGround | Self::PlacedCorrectly => None,
        }
    }

    /// True for `Held`.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        matches!(self, Self::Held { .. })
    }

    /// True for `PlacedCorrectly`.
    #[must_use]
    pub const fn is_placed(&self) -> bool {
        matches!(self, Self::PlacedCorrectly)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnGround => write!(f, "on_ground"),
            Self::Held { holder } => write!(f, "held_by({holder})"),
            Self::PlacedCorrectly => write!(f, "placed"),
        }
    }
}

/// Recorded state of one item at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Item pose at capture time, in world space.
    pub pose: Pose,
    /// Possession and placement at capture time.
    #[serde(flatten)]
    pub state: ItemState,
}

impl ItemSnapshot {
    /// A snapshot from its parts.
    #[must_use]
    pub const fn new(pose: Pose, state: ItemState) -> Self {
        Self { pose, state }
    }

    /// Capture an item, deriving its state from possession and placement
    /// rather than trusting a flag kept elsewhere.
    #[must_use]
    pub fn capture(pose: Pose, holder: Option<AgentId>, placement: &Placement) -> Self {
        Self {
            pose,
            state: ItemState::derive(holder, pose.position, placement),
        }
    }

    /// The holder, if held.
    #[must_use]
    pub const fn holder(&self) -> Option<AgentId> {
        self.state.holder()
    }
}
