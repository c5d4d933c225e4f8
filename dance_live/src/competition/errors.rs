//! Competition error types.

use super::models::{BracketId, EventId, UserId};
use thiserror::Error;

/// Competition engine errors
#[derive(Debug, Error)]
pub enum CompetitionError {
    /// Entity not in the state the operation requires
    #[error("{entity} not in correct state: expected {expected}, got {actual}")]
    InvalidState {
        entity: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("Bracket not found: {0}")]
    BracketNotFound(BracketId),

    #[error("Heat {index} not found in bracket {bracket_id}")]
    HeatNotFound { bracket_id: BracketId, index: u32 },

    #[error("Event {0} has no registered participants")]
    NoParticipants(EventId),

    #[error("Heats already generated for bracket {0}")]
    AlreadyGenerated(BracketId),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Caller lacks the permission for a mutating call
    #[error("User {user_id} is not allowed to {action}")]
    Forbidden { user_id: UserId, action: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Non-SQL store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CompetitionError {
    pub(crate) fn invalid_state(
        entity: &'static str,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        CompetitionError::InvalidState {
            entity,
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    /// Event, bracket or heat missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CompetitionError::EventNotFound(_)
                | CompetitionError::BracketNotFound(_)
                | CompetitionError::HeatNotFound { .. }
        )
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            CompetitionError::Database(_) | CompetitionError::Storage(_) => {
                "Internal server error".to_string()
            }
            CompetitionError::Serialization(_) => "Corrupted competition document".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for competition operations
pub type CompetitionResult<T> = Result<T, CompetitionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competition::models::EventStatus;

    #[test]
    fn test_invalid_state_message() {
        let err = CompetitionError::invalid_state("Event", EventStatus::Pending, EventStatus::Active);
        assert_eq!(
            err.to_string(),
            "Event not in correct state: expected Pending, got Active"
        );
    }

    #[test]
    fn test_not_found_grouping() {
        assert!(CompetitionError::EventNotFound("e".into()).is_not_found());
        assert!(
            CompetitionError::HeatNotFound {
                bracket_id: "b".into(),
                index: 0
            }
            .is_not_found()
        );
        assert!(!CompetitionError::NoParticipants("e".into()).is_not_found());
    }

    #[test]
    fn test_client_message_sanitizes_storage() {
        let err = CompetitionError::Storage("disk on fire at /var/lib/pg".to_string());
        assert_eq!(err.client_message(), "Internal server error");

        let err = CompetitionError::AlreadyGenerated("Salsa_Adult_Mixed".to_string());
        assert!(err.client_message().contains("Salsa_Adult_Mixed"));
    }
}
