//! State machine trait for enumerated state types.
//!
//! Gives the turn state a validated transition path instead of free
//! assignment, so an impossible hop is caught where it happens.

use super::ValidationError;

/// Trait for enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// let mut state = TurnState::Start;
/// state.advance(TurnState::GuardChecked)?;
/// assert!(state.advance(TurnState::Finalizing).is_err());
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Validates and applies a transition in place.
    ///
    /// On error the state is left unchanged.
    fn advance(&mut self, target: Self) -> Result<(), ValidationError> {
        *self = self.transition_to(target)?;
        Ok(())
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
