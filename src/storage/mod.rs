//! Timeline storage.
//!
//! One generic store, instantiated once per entity kind, holds every
//! recorded snapshot keyed by entity and tick.

mod memory;
mod timeline;
mod traits;

pub use memory::{AgentTimelineStore, InMemoryTimelineStore, ItemTimelineStore, TimelineStores};
pub use timeline::Timeline;
pub use traits::{TimelineStats, TimelineStore};
