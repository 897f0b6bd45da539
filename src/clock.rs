//! The simulation clock.
//!
//! The clock is the single authority for "now" and for whether time is
//! advancing. Subscribers are notified synchronously, inside the call that
//! caused the transition.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether time advances, and how fast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayState {
    /// Time is frozen.
    Paused,
    /// Advancing at a signed speed (negative plays backward).
    Playing {
        /// Seconds of simulation time per second of wall time.
        speed: f64,
    },
}

/// Notification emitted by the clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClockEvent {
    /// The clock started or stopped.
    PlayStateChanged {
        /// True if the clock is now playing.
        playing: bool,
    },
    /// `now` moved by a tick, jump or reset.
    TimeChanged {
        /// The new current time in seconds.
        now: f64,
    },
}

/// Handle returned by [`Clock::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Result of one [`Clock::advance`] call that moved time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    /// Time before the call.
    pub previous: f64,
    /// Time after the call, clamped into bounds.
    pub now: f64,
    /// The clock reached the bound it was heading to and paused itself.
    pub paused_at_bound: bool,
}

type Listener = Box<dyn FnMut(&ClockEvent) + Send>;

/// Time authority with play/pause state and `[0, max_time]` bounds.
pub struct Clock {
    now: f64,
    max_time: f64,
    state: PlayState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

fn sanitize_bound(max_time: f64) -> f64 {
    if max_time.is_nan() {
        0.0
    } else {
        max_time.max(0.0)
    }
}

impl Clock {
    /// Create a paused clock at zero. A negative or NaN `max_time` clamps to zero.
    #[must_use]
    pub fn new(max_time: f64) -> Self {
        Self {
            now: 0.0,
            max_time: sanitize_bound(max_time),
            state: PlayState::Paused,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Current time in seconds.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Upper bound of the timeline.
    #[must_use]
    pub const fn max_time(&self) -> f64 {
        self.max_time
    }

    /// Current play state.
    #[must_use]
    pub const fn state(&self) -> PlayState {
        self.state
    }

    /// Playing in either direction.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.state, PlayState::Playing { .. })
    }

    /// Playing with a positive speed: the only state in which recording happens.
    #[must_use]
    pub fn is_playing_forward(&self) -> bool {
        matches!(self.state, PlayState::Playing { speed } if speed > 0.0)
    }

    /// Playing with a negative speed.
    #[must_use]
    pub fn is_playing_backward(&self) -> bool {
        matches!(self.state, PlayState::Playing { speed } if speed < 0.0)
    }

    /// Register a listener called synchronously on every transition.
    pub fn subscribe(&mut self, listener: impl FnMut(&ClockEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: ClockEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    /// Start advancing at `speed` (1.0 is real time, negative plays backward).
    ///
    /// A non-finite speed falls back to 1.0.
    pub fn play(&mut self, speed: f64) {
        let speed = if speed.is_finite() {
            speed
        } else {
            tracing::warn!(speed, "non-finite playback speed, using 1.0");
            1.0
        };
        self.state = PlayState::Playing { speed };
        self.emit(ClockEvent::PlayStateChanged { playing: true });
    }

    /// Stop advancing. Returns false if the clock was already paused.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state = PlayState::Paused;
        self.emit(ClockEvent::PlayStateChanged { playing: false });
        true
    }

    /// Move time by `delta` wall seconds scaled by the playback speed.
    ///
    /// Does nothing while paused, or for a negative or non-finite `delta`.
    /// When the clock reaches the bound it is heading to, the new time is
    /// reported first and the clock pauses afterwards.
    pub fn advance(&mut self, delta: f64) -> Option<Advance> {
        let PlayState::Playing { speed } = self.state else {
            return None;
        };
        if !delta.is_finite() || delta < 0.0 {
            tracing::warn!(delta, "ignoring invalid frame delta");
            return None;
        }

        let previous = self.now;
        let now = (previous + delta * speed).clamp(0.0, self.max_time);
        self.now = now;
        self.emit(ClockEvent::TimeChanged { now });

        let at_bound = (speed > 0.0 && now >= self.max_time) || (speed < 0.0 && now <= 0.0);
        if at_bound {
            self.pause();
        }

        Some(Advance {
            previous,
            now,
            paused_at_bound: at_bound,
        })
    }

    /// Pause and move to `target`, clamped into `[0, max_time]`.
    ///
    /// A NaN target keeps the current time. Returns the new time.
    pub fn jump_to(&mut self, target: f64) -> f64 {
        self.pause();
        if !target.is_nan() {
            self.now = target.clamp(0.0, self.max_time);
        }
        let now = self.now;
        self.emit(ClockEvent::TimeChanged { now });
        now
    }

    /// Jump only if `target` lies before the current time.
    pub fn rewind_to(&mut self, target: f64) -> Option<f64> {
        (target < self.now).then(|| self.jump_to(target))
    }

    /// Pause and return to zero.
    pub fn reset_to_zero(&mut self) {
        self.pause();
        self.now = 0.0;
        self.emit(ClockEvent::TimeChanged { now: 0.0 });
    }

    /// Change the upper bound, re-clamping the current time into it.
    pub fn set_max_time(&mut self, max_time: f64) {
        self.max_time = sanitize_bound(max_time);
        if self.now > self.max_time {
            self.now = self.max_time;
            let now = self.now;
            self.emit(ClockEvent::TimeChanged { now });
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("now", &self.now)
            .field("max_time", &self.max_time)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    fn recording_clock(max_time: f64) -> (Clock, Arc<Mutex<Vec<ClockEvent>>>) {
        let mut clock = Clock::new(max_time);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        clock.subscribe(move |e| sink.lock().unwrap().push(*e));
        (clock, events)
    }

    #[test]
    fn negative_max_time_clamps_to_zero() {
        assert_eq!(Clock::new(-3.0).max_time(), 0.0);
        assert_eq!(Clock::new(f64::NAN).max_time(), 0.0);
    }

    #[test]
    fn advance_only_while_playing() {
        let mut clock = Clock::new(10.0);
        assert_eq!(clock.advance(1.0), None);
        assert_eq!(clock.now(), 0.0);

        clock.play(1.0);
        let adv = clock.advance(0.5).unwrap();
        assert_eq!(adv.previous, 0.0);
        assert_eq!(adv.now, 0.5);
        assert!(!adv.paused_at_bound);
    }

    #[test]
    fn advance_scales_by_speed() {
        let mut clock = Clock::new(10.0);
        clock.play(2.0);
        clock.advance(1.0);
        assert_eq!(clock.now(), 2.0);

        clock.play(-0.5);
        clock.advance(1.0);
        assert_eq!(clock.now(), 1.5);
    }

    #[test]
    fn reaching_max_reports_time_then_pauses() {
        let (mut clock, events) = recording_clock(1.0);
        clock.play(1.0);
        let adv = clock.advance(5.0).unwrap();
        assert_eq!(adv.now, 1.0);
        assert!(adv.paused_at_bound);
        assert!(!clock.is_playing());

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                ClockEvent::PlayStateChanged { playing: true },
                ClockEvent::TimeChanged { now: 1.0 },
                ClockEvent::PlayStateChanged { playing: false },
            ]
        );
    }

    #[test]
    fn backward_play_pauses_at_zero() {
        let mut clock = Clock::new(5.0);
        clock.jump_to(1.0);
        clock.play(-1.0);
        assert!(clock.is_playing_backward());
        let adv = clock.advance(3.0).unwrap();
        assert_eq!(adv.now, 0.0);
        assert!(adv.paused_at_bound);
    }

    #[test]
    fn forward_play_from_zero_is_not_a_bound_hit() {
        let mut clock = Clock::new(5.0);
        clock.play(1.0);
        let adv = clock.advance(0.0).unwrap();
        assert!(!adv.paused_at_bound);
        assert!(clock.is_playing_forward());
    }

    #[test]
    fn jump_to_clamps_and_pauses() {
        let mut clock = Clock::new(10.0);
        clock.play(1.0);
        assert_eq!(clock.jump_to(60.0), 10.0);
        assert!(!clock.is_playing());
        clock.play(1.0);
        assert_eq!(clock.jump_to(-50.0), 0.0);
        assert!(!clock.is_playing());
        assert_eq!(clock.jump_to(f64::NAN), 0.0);
    }

    #[test]
    fn rewind_only_moves_backward() {
        let mut clock = Clock::new(10.0);
        clock.jump_to(5.0);
        assert_eq!(clock.rewind_to(7.0), None);
        assert_eq!(clock.now(), 5.0);
        assert_eq!(clock.rewind_to(2.0), Some(2.0));
    }

    #[test]
    fn reset_pauses_at_zero() {
        let (mut clock, events) = recording_clock(10.0);
        clock.play(1.0);
        clock.advance(3.0);
        clock.reset_to_zero();
        assert_eq!(clock.now(), 0.0);
        assert!(!clock.is_playing());
        assert_eq!(
            events.lock().unwrap().last(),
            Some(&ClockEvent::TimeChanged { now: 0.0 })
        );
    }

    #[test]
    fn pause_when_paused_is_silent() {
        let (mut clock, events) = recording_clock(10.0);
        assert!(!clock.pause());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn invalid_inputs_are_sanitized() {
        let mut clock = Clock::new(10.0);
        clock.play(f64::NAN);
        assert_eq!(clock.state(), PlayState::Playing { speed: 1.0 });
        assert_eq!(clock.advance(f64::INFINITY), None);
        assert_eq!(clock.advance(-1.0), None);
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn shrinking_max_time_reclamps_now() {
        let mut clock = Clock::new(10.0);
        clock.jump_to(8.0);
        clock.set_max_time(4.0);
        assert_eq!(clock.now(), 4.0);
        clock.set_max_time(-1.0);
        assert_eq!(clock.max_time(), 0.0);
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let (mut clock, events) = recording_clock(10.0);
        let extra = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&extra);
        let id = clock.subscribe(move |_| *counter.lock().unwrap() += 1);
        clock.play(1.0);
        assert!(clock.unsubscribe(id));
        assert!(!clock.unsubscribe(id));
        clock.pause();
        assert_eq!(*extra.lock().unwrap(), 1);
        assert_eq!(events.lock().unwrap().len(), 2);
    }
}
