//! States a single turn moves through.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Progress of one turn through the router.
///
/// ```text
/// Start -> GuardChecked -> Classified -> Extracting  -> AwaitingClarification -> Done
///                |              |             |      -> Finalizing            -> Done
///                |              |             |      -> Chitchatting          -> Done
///                |              |-> Querying ------------------------------------> Done
///                |              |-> Chitchatting --------------------------------> Done
///                +-> Done (refused)   any of Classified/Extracting -> Done (error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Start,
    GuardChecked,
    Classified,
    Extracting,
    Querying,
    Chitchatting,
    AwaitingClarification,
    Finalizing,
    Done,
}

impl StateMachine for TurnState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TurnState::*;
        matches!(
            (self, target),
            (Start, GuardChecked)
                | (GuardChecked, Classified)
                | (GuardChecked, Done)
                | (Classified, Extracting)
                | (Classified, Querying)
                | (Classified, Chitchatting)
                | (Classified, Done)
                | (Extracting, AwaitingClarification)
                | (Extracting, Finalizing)
                | (Extracting, Chitchatting)
                | (Extracting, Done)
                | (Querying, Done)
                | (Chitchatting, Done)
                | (AwaitingClarification, Done)
                | (Finalizing, Done)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TurnState::*;
        match self {
            Start => vec![GuardChecked],
            GuardChecked => vec![Classified, Done],
            Classified => vec![Extracting, Querying, Chitchatting, Done],
            Extracting => vec![AwaitingClarification, Finalizing, Chitchatting, Done],
            Querying | Chitchatting | AwaitingClarification | Finalizing => vec![Done],
            Done => vec![],
        }
    }
}
