//! Rigid poses.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World-space position and orientation of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World-space position.
    pub position: Vec3,
    /// World-space rotation.
    pub orientation: Quat,
}

impl Pose {
    /// At the origin with no rotation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// A pose from its parts.
    #[must_use]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// A pose at `position` with identity orientation.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Compose a child pose given in this pose's local frame.
    ///
    /// Used to place a hold point (or a held item with zero local offset)
    /// relative to its agent.
    #[must_use]
    pub fn transform(&self, local: &Self) -> Self {
        Self {
            position: self.position + self.orientation * local.position,
            orientation: (self.orientation * local.orientation).normalize(),
        }
    }

    /// True when every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}
