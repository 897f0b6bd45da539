//! Session configuration.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::entity::validate_tolerance;
use crate::error::ValidationError;
use crate::time::TickClock;

/// Configuration for a rewind session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Timeline length in seconds.
    pub max_time: f64,
    /// Spacing between recorded snapshots, in seconds.
    pub record_interval: f64,
    /// Placement tolerance for items registered without one.
    pub default_tolerance: f32,
    /// Hold point offset in the agent's local frame.
    pub hold_offset: Vec3,
    /// Start playing forward at speed 1.0 as soon as the session is built.
    pub auto_play: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_time: 10.0,
            record_interval: 0.1,
            default_tolerance: 1.0,
            hold_offset: Vec3::new(0.0, 1.5, 0.0),
            auto_play: false,
        }
    }
}

impl SessionConfig {
    // Below this a 10 s timeline would already hold a million ticks per entity.
    const MIN_RECORD_INTERVAL: f64 = 1e-5;

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` naming the first bad field.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if !self.max_time.is_finite() {
            return Err(invalid(format!("max_time must be finite (got {})", self.max_time)));
        }
        if !self.record_interval.is_finite() || self.record_interval < Self::MIN_RECORD_INTERVAL {
            return Err(invalid(format!(
                "record_interval must be at least {} seconds (got {})",
                Self::MIN_RECORD_INTERVAL,
                self.record_interval
            )));
        }
        validate_tolerance(self.default_tolerance)
            .map_err(|err| invalid(format!("default_tolerance: {err}")))?;
        if !self.hold_offset.is_finite() {
            return Err(invalid(format!("hold_offset must be finite (got {})", self.hold_offset)));
        }
        Ok(self)
    }

    /// Parse a JSON document and validate it. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ConfigParse` for malformed JSON and
    /// `ValidationError::InvalidConfig` for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json).map_err(|err| ValidationError::ConfigParse {
            message: err.to_string(),
        })?;
        config.validate()
    }

    /// Quantizer for this configuration's record interval.
    ///
    /// # Errors
    ///
    /// Fails for the same intervals `validate` rejects.
    pub fn tick_clock(&self) -> Result<TickClock, ValidationError> {
        TickClock::new(self.record_interval)
    }
}

fn invalid(reason: String) -> ValidationError {
    ValidationError::InvalidConfig { reason }
}
