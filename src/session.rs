//! A play session: the clock, the registry and both timelines, driven once
//! per frame by the host.
//!
//! The session owns every piece of mutable engine state and hands it to the
//! adapters and the coordinator by reference. The live world stays with the
//! host and is passed into each call that needs it.
//!
//! ```
//! use glam::Vec3;
//! use rewindable::{Pose, Session, SessionConfig, SimWorld};
//!
//! let config = SessionConfig::default();
//! let mut session = Session::new(config).unwrap();
//! let mut world = SimWorld::new(config.hold_offset);
//!
//! let robot = session.register_agent().unwrap();
//! world.add_agent(robot, Pose::IDENTITY);
//!
//! session.play(1.0);
//! session.tick(&mut world, 1.0);
//! world.move_agent(robot, Pose::at(Vec3::X)).unwrap();
//! session.tick(&mut world, 1.0);
//!
//! session.jump_to(&mut world, 1.5);
//! assert_eq!(world.agent(robot).unwrap().pose.position, Vec3::ZERO);
//! ```

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::adapter::{AgentAdapter, ItemAdapter};
use crate::clock::{Advance, Clock, ClockEvent, SubscriptionId};
use crate::config::SessionConfig;
use crate::coordinator::{RestoreCoordinator, RestoreReport};
use crate::entity::{AgentId, EntityRegistry, ItemId, ItemKind, ItemSpec, Placement};
use crate::error::{RewindResult, ValidationError};
use crate::snapshot::{AgentSnapshot, ItemSnapshot, ItemState};
use crate::storage::{TimelineStats, TimelineStore, TimelineStores};
use crate::time::{Tick, TickClock};
use crate::world::World;

/// Possession and placement changes seen between two forward recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ItemEvent {
    /// An agent took hold of the item.
    PickedUp {
        /// The item that changed hands.
        item: ItemId,
        /// The agent now holding it.
        agent: AgentId,
    },
    /// The item left an agent's hold point.
    Dropped {
        /// The item that was let go.
        item: ItemId,
        /// The agent that held it.
        agent: AgentId,
    },
    /// The item came to rest within tolerance of its target.
    PlacedCorrectly {
        /// The placed item.
        item: ItemId,
    },
}

/// Level progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Nothing has been played yet.
    #[default]
    Waiting,
    /// Time has run at least once and not every item is placed.
    Playing,
    /// Every item sits within tolerance of its target.
    Victory,
}

/// One recording pass over all registered entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPass {
    /// Tick every snapshot of this pass was filed under.
    pub tick: Tick,
    /// Entities that were live and got a snapshot.
    pub recorded: usize,
    /// Future snapshots discarded across all entities.
    pub truncated: usize,
    /// Item transitions since the previous forward recording.
    pub events: Vec<ItemEvent>,
}

/// What one [`Session::tick`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickOutcome {
    /// Time before and after, if the clock moved.
    #[serde(skip)]
    pub advance: Option<Advance>,
    /// Set while playing forward.
    pub record: Option<RecordPass>,
    /// Set while playing backward.
    pub replay: Option<RestoreReport>,
    /// Level progress after the tick.
    pub status: GameStatus,
}

/// Snapshot counts for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionStats {
    /// Current time in seconds.
    pub now: f64,
    /// Upper bound of the timeline.
    pub max_time: f64,
    /// True if the clock is playing in either direction.
    pub playing: bool,
    /// Agent timeline counters.
    pub agents: TimelineStats,
    /// Item timeline counters.
    pub items: TimelineStats,
}

/// Record/restore engine for one level.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    quantizer: TickClock,
    clock: Clock,
    registry: EntityRegistry,
    stores: TimelineStores,
    // State of each item at its last forward recording, for event detection.
    last_states: BTreeMap<ItemId, ItemState>,
    status: GameStatus,
}

impl Session {
    /// Create a session from a configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if the configuration does not
    /// validate.
    pub fn new(config: SessionConfig) -> RewindResult<Self> {
        let config = config.validate()?;
        let quantizer = config.tick_clock()?;
        let mut session = Self {
            config,
            quantizer,
            clock: Clock::new(config.max_time),
            registry: EntityRegistry::new(),
            stores: TimelineStores::new(quantizer),
            last_states: BTreeMap::new(),
            status: GameStatus::Waiting,
        };
        tracing::info!(
            max_time = session.clock.max_time(),
            interval = quantizer.interval(),
            "session created"
        );
        if config.auto_play {
            session.play(1.0);
        }
        Ok(session)
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session clock. Commands go through the session.
    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Registered agents and items.
    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Both timeline stores, read-only.
    #[must_use]
    pub const fn stores(&self) -> &TimelineStores {
        &self.stores
    }

    /// Quantizer shared by both stores.
    #[must_use]
    pub const fn tick_clock(&self) -> TickClock {
        self.quantizer
    }

    /// Level progress as of the last tick or restore.
    #[must_use]
    pub const fn status(&self) -> GameStatus {
        self.status
    }

    /// Current time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Listen to clock transitions (play state and time changes).
    pub fn subscribe(&mut self, listener: impl FnMut(&ClockEvent) + Send + 'static) -> SubscriptionId {
        self.clock.subscribe(listener)
    }

    /// Drop a listener. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.clock.unsubscribe(id)
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Register a new agent. It is recorded from the next forward tick on.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::IdSpaceExhausted` when no agent id is left.
    pub fn register_agent(&mut self) -> RewindResult<AgentId> {
        let id = self.registry.register_agent()?;
        tracing::info!(agent = %id, "agent registered");
        Ok(id)
    }

    /// Register an agent under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DuplicateEntity` if the id is taken and
    /// `ValidationError::IdSpaceExhausted` for `u32::MAX`.
    pub fn insert_agent(&mut self, id: AgentId) -> RewindResult<()> {
        self.registry.insert_agent(id)?;
        tracing::info!(agent = %id, "agent registered");
        Ok(())
    }

    /// Register an item with the default tolerance.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonFinite` for a non-finite target and
    /// `ValidationError::IdSpaceExhausted` when no item id is left.
    pub fn register_item(&mut self, kind: ItemKind, target: Vec3) -> RewindResult<ItemId> {
        let placement = Placement::new(finite_target(target)?, self.config.default_tolerance)?;
        self.register_item_spec(ItemSpec { kind, placement })
    }

    /// Register an item with an explicit placement.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::IdSpaceExhausted` when no item id is left.
    pub fn register_item_spec(&mut self, spec: ItemSpec) -> RewindResult<ItemId> {
        let id = self.registry.register_item(spec)?;
        tracing::info!(item = %id, kind = %spec.kind, "item registered");
        Ok(id)
    }

    /// Register an item under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DuplicateEntity` if the id is taken and
    /// `ValidationError::IdSpaceExhausted` for `u32::MAX`.
    pub fn insert_item(&mut self, id: ItemId, spec: ItemSpec) -> RewindResult<()> {
        self.registry.insert_item(id, spec)?;
        tracing::info!(item = %id, kind = %spec.kind, "item registered");
        Ok(())
    }

    /// Forget an agent and its whole timeline.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownAgent` if the agent is not registered.
    pub fn unregister_agent(&mut self, id: AgentId) -> RewindResult<()> {
        if !self.registry.remove_agent(id) {
            return Err(ValidationError::UnknownAgent { id }.into());
        }
        self.stores.agents.clear_entity(id);
        tracing::info!(agent = %id, "agent unregistered");
        Ok(())
    }

    /// Forget an item and its whole timeline.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownItem` if the item is not registered.
    pub fn unregister_item(&mut self, id: ItemId) -> RewindResult<ItemSpec> {
        let spec = self
            .registry
            .remove_item(id)
            .ok_or(ValidationError::UnknownItem { id })?;
        self.stores.items.clear_entity(id);
        self.last_states.remove(&id);
        tracing::info!(item = %id, "item unregistered");
        Ok(spec)
    }

    /// Move an item's target slot. Takes effect at the next record or restore.
    ///
    /// # Errors
    ///
    /// Fails for an unknown item or a non-finite target.
    pub fn set_item_target(&mut self, id: ItemId, target: Vec3) -> RewindResult<()> {
        let target = finite_target(target)?;
        self.registry.item_spec_mut(id)?.placement.target = target;
        Ok(())
    }

    /// Change an item's placement tolerance.
    ///
    /// # Errors
    ///
    /// Fails for an unknown item or a negative tolerance.
    pub fn set_item_tolerance(&mut self, id: ItemId, tolerance: f32) -> RewindResult<()> {
        let spec = self.registry.item_spec_mut(id)?;
        spec.placement = Placement::new(spec.placement.target, tolerance)?;
        Ok(())
    }

    /// Number of registered items of one kind.
    #[must_use]
    pub fn count_items_by_kind(&self, kind: ItemKind) -> usize {
        self.registry.count_items_by_kind(kind)
    }

    // ---------------------------------------------------------------------
    // Clock commands
    // ---------------------------------------------------------------------

    /// Start playing. A negative speed plays backward as a replay.
    pub fn play(&mut self, speed: f64) {
        self.clock.play(speed);
        if self.status == GameStatus::Waiting {
            self.status = GameStatus::Playing;
        }
        tracing::debug!(speed, now = self.clock.now(), "play");
    }

    /// Returns false if already paused.
    pub fn pause(&mut self) -> bool {
        self.clock.pause()
    }

    /// Change the timeline length; `now` is clamped into it.
    pub fn set_max_time(&mut self, max_time: f64) {
        self.clock.set_max_time(max_time);
        tracing::info!(max_time = self.clock.max_time(), "timeline length changed");
    }

    /// Pause, move the clock to `t`, and restore the world to it.
    pub fn jump_to<W: World + ?Sized>(&mut self, world: &mut W, t: f64) -> RestoreReport {
        let now = self.clock.jump_to(t);
        self.restore_all(world, now)
    }

    /// Like [`Session::jump_to`], but only if `t` lies before the current time.
    pub fn rewind_to<W: World + ?Sized>(&mut self, world: &mut W, t: f64) -> Option<RestoreReport> {
        let now = self.clock.rewind_to(t)?;
        Some(self.restore_all(world, now))
    }

    /// Pause at zero and restore the opening state.
    pub fn reset_to_zero<W: World + ?Sized>(&mut self, world: &mut W) -> RestoreReport {
        self.clock.reset_to_zero();
        self.restore_all(world, 0.0)
    }

    /// Restore the world to `t` without moving the clock.
    ///
    /// Pauses the clock first if it is playing.
    pub fn restore_all<W: World + ?Sized>(&mut self, world: &mut W, t: f64) -> RestoreReport {
        let report = RestoreCoordinator::restore_all(&mut self.clock, &self.registry, &self.stores, world, t);
        self.after_restore(&*world);
        report
    }

    /// Drop every entity and recording and return to a paused clock at zero.
    pub fn reset_level(&mut self) {
        self.stores.clear_all();
        self.registry.clear();
        self.last_states.clear();
        self.clock.reset_to_zero();
        self.status = GameStatus::Waiting;
        tracing::info!("level reset");
    }

    // ---------------------------------------------------------------------
    // Per-frame driving
    // ---------------------------------------------------------------------

    /// Advance the clock by `delta` wall seconds and record or replay.
    ///
    /// Forward playback records every registered entity at the new time,
    /// discarding whatever future it had. Backward playback restores the
    /// state at the new time and records nothing.
    pub fn tick<W: World + ?Sized>(&mut self, world: &mut W, delta: f64) -> TickOutcome {
        let forward = self.clock.is_playing_forward();
        let backward = self.clock.is_playing_backward();
        let advance = self.clock.advance(delta);

        let mut outcome = TickOutcome {
            advance,
            record: None,
            replay: None,
            status: self.status,
        };
        let Some(step) = advance else {
            return outcome;
        };

        if forward {
            outcome.record = Some(self.record_pass(world, step.now));
        } else if backward {
            let report = RestoreCoordinator::replay(&self.registry, &self.stores, world, step.now);
            self.after_restore(&*world);
            outcome.replay = Some(report);
        }
        if step.paused_at_bound {
            tracing::debug!(now = step.now, "reached end of timeline");
        }

        self.update_status(&*world);
        outcome.status = self.status;
        outcome
    }

    /// Record every entity at the current time, outside the frame cadence.
    ///
    /// Only allowed while playing forward; returns `None` otherwise.
    pub fn record_now<W: World + ?Sized>(&mut self, world: &mut W) -> Option<RecordPass> {
        if !self.clock.is_playing_forward() {
            tracing::debug!(now = self.clock.now(), "record_now ignored, not playing forward");
            return None;
        }
        let pass = self.record_pass(world, self.clock.now());
        self.update_status(&*world);
        Some(pass)
    }

    fn record_pass<W: World + ?Sized>(&mut self, world: &mut W, now: f64) -> RecordPass {
        let tick = self.quantizer.tick_at(now);
        let mut pass = RecordPass {
            tick,
            recorded: 0,
            truncated: 0,
            events: Vec::new(),
        };

        for id in self.registry.agents() {
            if let Some(truncated) = AgentAdapter::record(&mut self.stores.agents, &*world, id, tick) {
                pass.recorded += 1;
                pass.truncated += truncated;
            }
        }
        for (id, spec) in self.registry.items() {
            let Some((snapshot, truncated)) =
                ItemAdapter::record(&mut self.stores.items, world, id, &spec.placement, tick)
            else {
                continue;
            };
            pass.recorded += 1;
            pass.truncated += truncated;
            let previous = self.last_states.insert(id, snapshot.state);
            if let Some(previous) = previous {
                transitions(id, previous, snapshot.state, &mut pass.events);
            }
        }

        for event in &pass.events {
            tracing::debug!(?event, %tick, "item event");
        }
        pass
    }

    fn after_restore<W: World + ?Sized>(&mut self, world: &W) {
        self.last_states = self
            .registry
            .items()
            .filter_map(|(id, spec)| Some((id, ItemAdapter::capture(world, id, &spec.placement)?.state)))
            .collect();
        self.update_status(world);
    }

    fn update_status<W: World + ?Sized>(&mut self, world: &W) {
        if self.status == GameStatus::Waiting {
            return;
        }
        let next = if self.all_items_placed(world) {
            GameStatus::Victory
        } else {
            GameStatus::Playing
        };
        if next != self.status {
            if next == GameStatus::Victory {
                tracing::info!(now = self.clock.now(), "all items placed");
            } else {
                tracing::info!(now = self.clock.now(), "left victory state");
            }
            self.status = next;
        }
    }

    /// True when at least one item is registered and every item is live,
    /// free-standing, and within tolerance of its target.
    #[must_use]
    pub fn all_items_placed<W: World + ?Sized>(&self, world: &W) -> bool {
        self.registry.item_count() > 0
            && self.registry.items().all(|(id, spec)| {
                ItemAdapter::capture(world, id, &spec.placement).is_some_and(|snap| snap.state.is_placed())
            })
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// The agent snapshot in effect at `t`.
    #[must_use]
    pub fn agent_snapshot_at(&self, id: AgentId, t: f64) -> Option<&AgentSnapshot> {
        self.stores.agents.query(id, t)
    }

    /// The item snapshot in effect at `t`.
    #[must_use]
    pub fn item_snapshot_at(&self, id: ItemId, t: f64) -> Option<&ItemSnapshot> {
        self.stores.items.query(id, t)
    }

    /// Clock position and snapshot counts.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            now: self.clock.now(),
            max_time: self.clock.max_time(),
            playing: self.clock.is_playing(),
            agents: self.stores.agents.stats(),
            items: self.stores.items.stats(),
        }
    }
}

fn finite_target(target: Vec3) -> Result<Vec3, ValidationError> {
    match target.to_array().into_iter().find(|c| !c.is_finite()) {
        None => Ok(target),
        Some(value) => Err(ValidationError::NonFinite {
            field: "target",
            value: f64::from(value),
        }),
    }
}

fn transitions(item: ItemId, previous: ItemState, next: ItemState, events: &mut Vec<ItemEvent>) {
    if previous == next {
        return;
    }
    if let Some(agent) = previous.holder() {
        if next.holder() != Some(agent) {
            events.push(ItemEvent::Dropped { item, agent });
        }
    }
    if let Some(agent) = next.holder() {
        if previous.holder() != Some(agent) {
            events.push(ItemEvent::PickedUp { item, agent });
        }
    }
    if next.is_placed() && !previous.is_placed() {
        events.push(ItemEvent::PlacedCorrectly { item });
    }
}
