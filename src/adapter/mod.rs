//! Adapters between live entities and their timelines.
//!
//! Each adapter does two things for one entity kind: capture live state into
//! a store while time runs forward, and write a resolved snapshot back onto
//! the live entity when time is scrubbed.

mod agent;
mod item;

pub use agent::AgentAdapter;
pub use item::ItemAdapter;

use crate::time::Tick;

/// Outcome of restoring one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Restored<S> {
    /// A snapshot was found and applied.
    Applied {
        /// Tick the applied snapshot was filed under.
        tick: Tick,
        /// The snapshot written onto the live entity.
        snapshot: S,
    },
    /// Nothing recorded at or before the target; live state left untouched.
    NoData,
    /// The entity has no live representation.
    NotLive,
}

impl<S> Restored<S> {
    /// True if a snapshot was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
