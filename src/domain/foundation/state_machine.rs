//! State machine trait for status enums.
//!
//! Gives lifecycle statuses (cancellation status, refund status) one way to
//! declare and check their allowed transitions.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors list their valid transitions and get a validated
/// `transition_to` for free.
///
/// ```ignore
/// let next = CancellationStatus::Pending.transition_to(CancellationStatus::Confirmed)?;
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

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Settlement {
        Open,
        Submitted,
        Settled,
        Voided,
    }

    impl StateMachine for Settlement {
        fn can_transition_to(&self, target: &Self) -> bool {
            self.valid_transitions().contains(target)
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Settlement::*;
            match self {
                Open => vec![Submitted, Voided],
                Submitted => vec![Settled, Voided],
                Settled | Voided => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(
            Settlement::Open.transition_to(Settlement::Submitted),
            Ok(Settlement::Submitted)
        );
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        let err = Settlement::Open.transition_to(Settlement::Settled).unwrap_err();
        assert_eq!(err.field(), "state_transition");
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(Settlement::Settled.is_terminal());
        assert!(Settlement::Voided.is_terminal());
        assert!(!Settlement::Open.is_terminal());
    }
}
