//! Unified error type for the whole engine
//!
//! Errors are values. Every repository, resolver, and handler returns
//! `GameResult<T>`; callers match on the variant instead of panicking.

use thiserror::Error;

/// Unified error type for game operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Target missing
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Duplicate or singleton violation
    #[error("Conflict on {kind}: {id}")]
    Conflict { kind: &'static str, id: String },

    /// Structural validation failed (e.g., slot mismatch)
    #[error("Invalid: {0}")]
    Invalid(String),

    /// Gameplay predicate false (missing item, failed roll, gated exit)
    #[error("Condition not met: {0}")]
    ConditionNotMet(String),

    /// Inventory weight capacity exceeded
    #[error("Carrying too much weight")]
    Overweight,

    /// Container or pool capacity exceeded
    #[error("Capacity exceeded")]
    Overcapacity,

    /// LLM or embedding service down; caller substitutes a deterministic fallback
    #[error("External service unavailable: {0}")]
    ExternalUnavailable(&'static str),

    /// Persisted data failed schema validation
    #[error("Corrupt {kind}: {id}")]
    Corrupt { kind: &'static str, id: String },

    /// Cooperative cancellation
    #[error("Cancelled")]
    Cancelled,

    /// Programming bug; logged and converted to a player-visible generic error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Create a not found error
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Create a conflict error
    pub fn conflict(kind: &'static str, id: impl ToString) -> Self {
        Self::Conflict {
            kind,
            id: id.to_string(),
        }
    }

    /// Create a validation error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    /// Create a gameplay-predicate error
    pub fn condition(reason: impl Into<String>) -> Self {
        Self::ConditionNotMet(reason.into())
    }

    /// Create a corrupt-data error
    pub fn corrupt(kind: &'static str, id: impl ToString) -> Self {
        Self::Corrupt {
            kind,
            id: id.to_string(),
        }
    }

    /// Create an internal error
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// True for errors a handler reports to the player and swallows
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::Internal(_) | Self::Corrupt { .. })
    }
}

/// Result alias used across the engine
pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = GameError::not_found("Space", "123e4567-e89b-12d3-a456-426614174000");
        assert!(err.to_string().contains("Space"));
        assert!(err.to_string().contains("123e4567"));
    }

    #[test]
    fn test_conflict_display() {
        let err = GameError::conflict("WorldSeed", "default");
        assert_eq!(err.to_string(), "Conflict on WorldSeed: default");
    }

    #[test]
    fn test_domain_classification() {
        assert!(GameError::Overweight.is_domain());
        assert!(GameError::condition("door is locked").is_domain());
        assert!(!GameError::internal("index out of bounds").is_domain());
        assert!(!GameError::corrupt("Chunk", "x").is_domain());
    }
}
