//! # rewindable - time-indexed recording and restoration for a sorting puzzle
//!
//! A player directs warehouse robots that pick up items and carry them to
//! target slots. Every robot and item is recorded on a timeline while time
//! plays forward; the player can pause, scrub back, and play again from any
//! earlier moment, which discards the old future.
//!
//! ## Core Concepts
//!
//! - **Clock**: the single authority for "now", play/pause and speed
//! - **Timeline store**: per-entity snapshots keyed by quantized [`Tick`],
//!   with nearest-at-or-before lookup and truncation on record
//! - **Adapters**: capture live entities into snapshots and write them back
//! - **Coordinator**: restores items, then agents, then reconciles who holds
//!   what, so the world is consistent after every scrub
//! - **Session**: owns all of the above and is driven once per frame
//!
//! ## Usage
//!
//! ```rust
//! use glam::Vec3;
//! use rewindable::{ItemKind, Pose, Session, SessionConfig, SimWorld};
//!
//! let config = SessionConfig::default();
//! let mut session = Session::new(config)?;
//! let mut world = SimWorld::new(config.hold_offset);
//!
//! let robot = session.register_agent()?;
//! let crate_box = session.register_item(ItemKind::Box, Vec3::new(4.0, 0.0, 0.0))?;
//! world.add_agent(robot, Pose::IDENTITY);
//! world.add_item(crate_box, Pose::at(Vec3::new(1.0, 0.0, 0.0)));
//!
//! session.play(1.0);
//! session.tick(&mut world, 0.5);
//! world.pick_up(robot, crate_box)?;
//! session.tick(&mut world, 0.5);
//!
//! // Scrub back to before the pickup.
//! let report = session.jump_to(&mut world, 0.5);
//! assert!(report.held.is_empty());
//! assert!(world.agent(robot).unwrap().carried.is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

// Core types
pub mod entity;
pub mod error;
pub mod math;
pub mod snapshot;
pub mod time;

// Storage and time control
pub mod clock;
pub mod storage;

// Restoration
pub mod adapter;
pub mod coordinator;
pub mod world;

// Session
pub mod config;
pub mod session;

pub use adapter::{AgentAdapter, ItemAdapter, Restored};
pub use clock::{Advance, Clock, ClockEvent, PlayState, SubscriptionId};
pub use config::SessionConfig;
pub use coordinator::{RestoreCoordinator, RestoreReport};
pub use entity::{AgentId, EntityRegistry, ItemId, ItemKind, ItemSpec, Placement};
pub use error::{RestoreError, RewindError, RewindResult, ValidationError};
pub use math::Pose;
pub use session::{GameStatus, ItemEvent, RecordPass, Session, SessionStats, TickOutcome};
pub use snapshot::{AgentSnapshot, ItemSnapshot, ItemState};
pub use storage::{
    AgentTimelineStore, InMemoryTimelineStore, ItemTimelineStore, Timeline, TimelineStats, TimelineStore,
    TimelineStores,
};
pub use time::{Tick, TickClock};
pub use world::{AgentHost, ItemHost, ItemParent, SimAgent, SimItem, SimWorld, World};
