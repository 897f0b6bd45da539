//! Quantized simulation time.
//!
//! Simulation time is kept in floating-point seconds by the [`Clock`](crate::Clock),
//! but timelines are keyed by [`Tick`]: an integer count of recording
//! intervals. Records and queries share one floor rule, so a snapshot is
//! never filed under a tick later than the time it was taken at, and every
//! frame inside one interval lands on the same tick.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Slack applied when flooring a time onto the tick grid, so that
/// `1.0 / 0.1` (which is `9.999…` in binary) still resolves to tick 10.
const FLOOR_EPSILON: f64 = 1e-6;

/// A quantized point on the timeline.
///
/// # Examples
///
/// ```
/// use rewindable::{Tick, TickClock};
///
/// let q = TickClock::new(0.1).unwrap();
/// assert_eq!(q.tick_at(1.0), Tick::new(10));
/// assert_eq!(q.tick_at(1.04), Tick::new(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(u64);

impl Tick {
    /// The tick at time zero.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw tick index.
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Number of recording intervals since time zero.
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Converts between seconds and ticks for a fixed recording interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickClock {
    interval: f64,
}

impl TickClock {
    /// Creates a quantizer with the given recording interval in seconds.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if the interval is not finite
    /// and strictly positive.
    pub fn new(interval: f64) -> Result<Self, ValidationError> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ValidationError::InvalidConfig {
                reason: format!("record_interval must be finite and > 0, got {interval}"),
            });
        }
        Ok(Self { interval })
    }

    /// Recording interval in seconds.
    #[must_use]
    pub const fn interval(&self) -> f64 {
        self.interval
    }

    /// The tick a recording made at `seconds` is filed under.
    ///
    /// Same grid as [`tick_floor`](Self::tick_floor), so the tick never lies
    /// after `seconds`. Negative and NaN times map to tick zero.
    #[must_use]
    pub fn tick_at(&self, seconds: f64) -> Tick {
        self.tick_floor(seconds).unwrap_or(Tick::ZERO)
    }

    /// The latest tick whose time does not exceed `seconds`.
    ///
    /// Returns `None` for times before zero, where no tick can exist.
    #[must_use]
    pub fn tick_floor(&self, seconds: f64) -> Option<Tick> {
        if seconds.is_nan() || seconds < 0.0 {
            return None;
        }
        Some(Tick(Self::to_index(
            (seconds / self.interval + FLOOR_EPSILON).floor(),
        )))
    }

    /// The time in seconds a tick stands for.
    #[must_use]
    pub fn seconds(&self, tick: Tick) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let index = tick.0 as f64;
        index * self.interval
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn to_index(value: f64) -> u64 {
        if value.is_nan() || value <= 0.0 {
            0
        } else {
            // Saturating float-to-int cast.
            value as u64
        }
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self { interval: 0.1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_intervals() {
        assert!(TickClock::new(0.0).is_err());
        assert!(TickClock::new(-0.1).is_err());
        assert!(TickClock::new(f64::NAN).is_err());
        assert!(TickClock::new(f64::INFINITY).is_err());
        assert!(TickClock::new(0.02).is_ok());
    }

    #[test]
    fn tick_at_never_lies_after_the_time() {
        let q = TickClock::new(0.1).unwrap();
        assert_eq!(q.tick_at(0.0), Tick::new(0));
        assert_eq!(q.tick_at(0.149), Tick::new(1));
        assert_eq!(q.tick_at(0.151), Tick::new(1));
        assert_eq!(q.tick_at(1.46), Tick::new(14));
        assert_eq!(q.tick_at(2.0), Tick::new(20));
        for t in [0.016_667, 0.466_667, 1.46, 3.999, 7.05] {
            assert!(q.seconds(q.tick_at(t)) <= t + 1e-9, "tick for {t} lies after it");
            assert_eq!(Some(q.tick_at(t)), q.tick_floor(t));
        }
    }

    #[test]
    fn jitter_collapses_onto_one_tick() {
        let q = TickClock::new(0.1).unwrap();
        let a = q.tick_at(0.1 + 0.2);
        let b = q.tick_at(0.3);
        let c = q.tick_at(0.300_000_1);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn negative_and_nan_map_to_zero() {
        let q = TickClock::default();
        assert_eq!(q.tick_at(-5.0), Tick::ZERO);
        assert_eq!(q.tick_at(f64::NAN), Tick::ZERO);
        assert_eq!(q.tick_floor(-0.01), None);
        assert_eq!(q.tick_floor(f64::NAN), None);
    }

    #[test]
    fn tick_floor_survives_binary_fractions() {
        let q = TickClock::new(0.1).unwrap();
        assert_eq!(q.tick_floor(1.0), Some(Tick::new(10)));
        assert_eq!(q.tick_floor(1.5), Some(Tick::new(15)));
        assert_eq!(q.tick_floor(1.59), Some(Tick::new(15)));
        assert_eq!(q.tick_floor(0.05), Some(Tick::new(0)));
    }

    #[test]
    fn seconds_round_trips_ticks() {
        let q = TickClock::new(0.25).unwrap();
        assert!((q.seconds(Tick::new(6)) - 1.5).abs() < 1e-12);
        assert_eq!(q.tick_at(q.seconds(Tick::new(6))), Tick::new(6));
    }

    #[test]
    fn tick_serializes_transparently() {
        let json = serde_json::to_string(&Tick::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
