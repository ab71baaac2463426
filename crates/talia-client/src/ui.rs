// Messages between the session task and whatever renders it.
//
// The renderer sends `UserCommand`s and receives a stream of `UiUpdate`s.
// Views are complete: the renderer never has to merge them.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use talia_core::consensus::{LobbyChoice, LobbyTally, NextRoundTally, Route};
use talia_core::ephemeral::{ActionBubble, DisconnectCountdown, SeatPosition};
use talia_core::game::action::{ActionKind, PlayerAction};
use talia_core::game::phase::PhaseView;
use talia_core::game::snapshot::GameSnapshot;

use crate::connection::ConnectionState;

// ---------------------------------------------------------------------------
// Inbound (renderer -> session)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Submit(PlayerAction),
    VoteNextRound,
    VoteReturnToLobby(LobbyChoice),
    ManualReconnect,
    FinalizeTrick,
    /// Leave the game for the dashboard.
    Leave,
    /// Tear the session down without navigating anywhere.
    Shutdown,
}

// ---------------------------------------------------------------------------
// Outbound (session -> renderer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum UiUpdate {
    View(Box<SessionView>),
    Alert(Alert),
    /// Leave the game view. The session tears itself down after sending this.
    Navigate(Route),
}

/// One-shot user message, e.g. a rejected action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self {
        Alert {
            at: Utc::now(),
            message: message.into(),
        }
    }
}

/// Persistent connectivity indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionBanner {
    pub state: ConnectionState,
    pub attempt: u32,
    pub retry_in_ms: Option<u64>,
}

impl ConnectionBanner {
    pub fn new(state: ConnectionState, attempt: u32, retry_in: Option<Duration>) -> Self {
        ConnectionBanner {
            state,
            attempt,
            retry_in_ms: retry_in.map(|d| d.as_millis() as u64),
        }
    }

    /// Whether the manual retry control is shown.
    pub fn can_retry(&self) -> bool {
        self.state == ConnectionState::Disconnected
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BubbleView {
    pub player: String,
    pub kind: ActionKind,
    pub label: String,
    pub position: SeatPosition,
}

impl From<&ActionBubble> for BubbleView {
    fn from(bubble: &ActionBubble) -> Self {
        BubbleView {
            player: bubble.player.clone(),
            kind: bubble.kind,
            label: bubble.label.clone(),
            position: bubble.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownView {
    pub player: String,
    pub remaining_secs: u64,
}

impl From<&DisconnectCountdown> for CountdownView {
    fn from(countdown: &DisconnectCountdown) -> Self {
        CountdownView {
            player: countdown.player.clone(),
            remaining_secs: countdown.remaining,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Forfeit {
    pub disconnected_player: String,
    pub reason: Option<String>,
}

/// Final-score view contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalResult {
    pub winners: Vec<String>,
    pub scores: BTreeMap<String, i64>,
    pub forfeit: Option<Forfeit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub connection: ConnectionBanner,
    /// Derived from the snapshot; `interactive` is cleared while an action is
    /// pending.
    pub phase: PhaseView,
    pub action_pending: bool,
    pub snapshot: Option<GameSnapshot>,
    pub bubbles: Vec<BubbleView>,
    pub countdown: Option<CountdownView>,
    pub next_round: NextRoundTally,
    pub voted_next_round: bool,
    pub lobby: LobbyTally,
    pub lobby_choice: Option<LobbyChoice>,
    pub final_result: Option<FinalResult>,
}
