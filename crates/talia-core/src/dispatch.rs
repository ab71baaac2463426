// Single-flight guard for player decisions.
//
// The dispatcher never touches game state. It only tracks whether a
// submission is outstanding so a second one can be refused, and releases the
// guard either on failure or on the first snapshot accepted after success.

use thiserror::Error;
use tracing::debug;

use crate::game::action::{ActionKind, PlayerAction};
use crate::game::phase::SelectionRule;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("an action is already pending")]
    Busy,

    #[error("select exactly {required} cards (selected {selected})")]
    InvalidSelection { required: usize, selected: usize },
}

/// Identifies one submission so late completions can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    /// Request sent, no response yet.
    InFlight { ticket: Ticket, kind: ActionKind },
    /// Server accepted; waiting for a snapshot to reflect it.
    AwaitingSnapshot { kind: ActionKind },
}

/// Result of matching a completion against the outstanding submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Accepted,
    /// The server refused the action; show this message to the user.
    Failed(String),
    /// Not the outstanding ticket; ignore.
    Stale,
}

#[derive(Debug)]
pub struct ActionDispatcher {
    state: DispatchState,
    next_ticket: u64,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        ActionDispatcher {
            state: DispatchState::Idle,
            next_ticket: 1,
        }
    }
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state != DispatchState::Idle
    }

    /// Claim the guard for `action`.
    ///
    /// Returns [`DispatchError::Busy`] while anything is pending; the caller
    /// treats that as a no-op. Fixed-size selections are count-checked here as
    /// well as in the UI.
    pub fn begin(
        &mut self,
        action: &PlayerAction,
        selection: Option<SelectionRule>,
    ) -> Result<Ticket, DispatchError> {
        if self.is_pending() {
            return Err(DispatchError::Busy);
        }
        if let (PlayerAction::ExchangeMusik { cards }, Some(rule)) = (action, selection) {
            if !rule.accepts(cards.len()) {
                return Err(DispatchError::InvalidSelection {
                    required: rule.required(),
                    selected: cards.len(),
                });
            }
        }

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.state = DispatchState::InFlight {
            ticket,
            kind: action.kind(),
        };
        debug!(kind = ?action.kind(), "action submitted");
        Ok(ticket)
    }

    /// Record the server's answer for `ticket`.
    pub fn complete(&mut self, ticket: Ticket, result: Result<(), String>) -> Completion {
        let DispatchState::InFlight {
            ticket: outstanding,
            kind,
        } = self.state
        else {
            return Completion::Stale;
        };
        if outstanding != ticket {
            return Completion::Stale;
        }

        match result {
            Ok(()) => {
                self.state = DispatchState::AwaitingSnapshot { kind };
                Completion::Accepted
            }
            Err(message) => {
                self.state = DispatchState::Idle;
                Completion::Failed(message)
            }
        }
    }

    /// An authoritative snapshot was accepted.
    pub fn on_snapshot(&mut self) {
        if let DispatchState::AwaitingSnapshot { kind } = self.state {
            debug!(?kind, "action reflected in snapshot, guard released");
            self.state = DispatchState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::snapshot::Card;

    fn declare() -> PlayerAction {
        PlayerAction::Declare {
            contract: "NORMALNA".into(),
            trump: Some("HEARTS".into()),
        }
    }

    #[test]
    fn second_submit_while_in_flight_is_refused() {
        let mut dispatcher = ActionDispatcher::new();
        dispatcher.begin(&declare(), None).unwrap();
        assert_eq!(dispatcher.begin(&PlayerAction::Pass, None), Err(DispatchError::Busy));
    }

    #[test]
    fn success_waits_for_next_snapshot() {
        let mut dispatcher = ActionDispatcher::new();
        let ticket = dispatcher.begin(&declare(), None).unwrap();
        assert_eq!(dispatcher.complete(ticket, Ok(())), Completion::Accepted);
        assert!(dispatcher.is_pending());
        assert_eq!(dispatcher.begin(&PlayerAction::Pass, None), Err(DispatchError::Busy));

        dispatcher.on_snapshot();
        assert!(!dispatcher.is_pending());
        assert!(dispatcher.begin(&PlayerAction::Pass, None).is_ok());
    }

    #[test]
    fn failure_releases_guard_and_reports_message() {
        let mut dispatcher = ActionDispatcher::new();
        let ticket = dispatcher.begin(&declare(), None).unwrap();
        let outcome = dispatcher.complete(ticket, Err("Not your turn".into()));
        assert_eq!(outcome, Completion::Failed("Not your turn".into()));
        assert_eq!(dispatcher.state(), DispatchState::Idle);
        assert!(dispatcher.begin(&declare(), None).is_ok());
    }

    #[test]
    fn snapshot_during_flight_does_not_release() {
        let mut dispatcher = ActionDispatcher::new();
        dispatcher.begin(&declare(), None).unwrap();
        dispatcher.on_snapshot();
        assert!(dispatcher.is_pending());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut dispatcher = ActionDispatcher::new();
        let first = dispatcher.begin(&declare(), None).unwrap();
        dispatcher.complete(first, Err("rejected".into()));
        let _second = dispatcher.begin(&PlayerAction::Pass, None).unwrap();
        assert_eq!(dispatcher.complete(first, Ok(())), Completion::Stale);
        assert!(matches!(dispatcher.state(), DispatchState::InFlight { .. }));
    }

    #[test]
    fn exchange_requires_exact_selection() {
        let mut dispatcher = ActionDispatcher::new();
        let action = PlayerAction::ExchangeMusik {
            cards: vec![Card::new("9", "CLUBS")],
        };
        let err = dispatcher
            .begin(&action, Some(SelectionRule::Exactly(2)))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::InvalidSelection {
                required: 2,
                selected: 1
            }
        );
        assert!(!dispatcher.is_pending());
    }
}
