use crate::defense::DefenseError;
use thiserror::Error;

/// Why an inbound action did not apply.
///
/// Everything except [`ActionError::Ignored`] is reported back to the user who
/// sent the action. Out-of-turn or out-of-phase actions are dropped silently.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("{0}")]
    Defense(#[from] DefenseError),
    #[error("select a placement rule first")]
    RuleNotLocked,
    #[error("strategy does not match the placement rule")]
    IncompatibleStrategy,
    #[error("select exactly {0} boxes")]
    WrongPickCount(usize),
    #[error("at least two players are required")]
    NotEnoughPlayers,
    #[error("room already exists")]
    RoomExists,
    #[error("room does not exist")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("action ignored")]
    Ignored,
}

impl ActionError {
    pub fn is_silent(&self) -> bool {
        matches!(self, ActionError::Ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_ignored_is_silent() {
        assert!(ActionError::Ignored.is_silent());
        assert!(!ActionError::RuleNotLocked.is_silent());
        assert!(!ActionError::Defense(DefenseError::Empty).is_silent());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ActionError::WrongPickCount(5).to_string(), "select exactly 5 boxes");
        assert_eq!(
            ActionError::from(DefenseError::InsufficientBalance).to_string(),
            DefenseError::InsufficientBalance.to_string()
        );
    }
}
