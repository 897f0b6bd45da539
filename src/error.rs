//! Error types for the rewind engine.
//!
//! Most anomalies the engine meets at runtime (out-of-range times, missing
//! snapshots, dangling holders) are normal player actions and are recovered
//! locally. The types here cover what is left: invalid configuration,
//! registration mistakes, and the diagnostics a restoration pass reports.

use thiserror::Error;

use crate::entity::{AgentId, ItemId};

/// Validation errors that occur on input or registration.
#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
    },

    #[error("{kind} {id} is already registered")]
    DuplicateEntity {
        kind: &'static str,
        id: u32,
    },

    #[error("No {kind} ids left to assign")]
    IdSpaceExhausted {
        kind: &'static str,
    },

    #[error("Agent not registered: {id}")]
    UnknownAgent {
        id: AgentId,
    },

    #[error("Item not registered: {id}")]
    UnknownItem {
        id: ItemId,
    },

    #[error("Value for '{field}' must be finite, got {value}")]
    NonFinite {
        field: &'static str,
        value: f64,
    },

    #[error("Placement tolerance must be >= 0, got {value}")]
    NegativeTolerance {
        value: f32,
    },

    #[error("Invalid action: {reason}")]
    InvalidAction {
        reason: String,
    },
}

/// Recoverable anomalies found while restoring a time.
///
/// These never abort a restoration pass. They are collected into a
/// [`RestoreReport`](crate::coordinator::RestoreReport) and logged.
#[allow(missing_docs)]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RestoreError {
    #[error("Item {item} was held by agent {holder}, which is no longer live; restored on ground")]
    DanglingHolder {
        item: ItemId,
        holder: AgentId,
    },

    #[error("Agent {holder} already holds item {kept}; item {item} restored on ground")]
    HolderConflict {
        item: ItemId,
        holder: AgentId,
        kept: ItemId,
    },

    #[error("Agent {agent} was recorded carrying, but no item resolves to it")]
    CarryingWithoutItem {
        agent: AgentId,
    },

    #[error("Live representation missing for {kind} {id}")]
    MissingLiveEntity {
        kind: &'static str,
        id: u32,
    },
}

/// Top-level error type.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RewindError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl RewindError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for engine operations.
pub type RewindResult<T> = Result<T, RewindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_duplicate() {
        let err = ValidationError::DuplicateEntity { kind: "agent", id: 3 };
        let msg = format!("{err}");
        assert!(msg.contains("agent 3"));
        assert!(msg.contains("already registered"));
    }

    #[test]
    fn test_validation_error_non_finite() {
        let err = ValidationError::NonFinite {
            field: "delta",
            value: f64::NAN,
        };
        assert!(err.to_string().contains("delta"));
    }

    #[test]
    fn test_restore_error_dangling_holder() {
        let err = RestoreError::DanglingHolder {
            item: ItemId::new(2),
            holder: AgentId::new(7),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Item 2"));
        assert!(msg.contains("agent 7"));
        assert!(msg.contains("on ground"));
    }

    #[test]
    fn test_rewind_error_from_validation() {
        let err: RewindError = ValidationError::UnknownAgent { id: AgentId::new(1) }.into();
        assert!(err.is_validation());
        assert!(!err.is_internal());
    }

    #[test]
    fn test_rewind_error_internal() {
        let err = RewindError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(err.to_string().contains("unexpected state"));
    }
}
