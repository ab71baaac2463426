// Group-vote tracking: "ready for next round" and "return to lobby vs. leave".
//
// Tallies are replaced wholesale from server broadcasts; the local flags only
// gate whether this participant may cast again in the current epoch.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::protocol::VoteList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyChoice {
    Stay,
    Leave,
}

/// Where the participant goes once the lobby vote resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Lobby,
    Dashboard,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NextRoundTally {
    pub voters: BTreeSet<String>,
    pub total: usize,
}

impl NextRoundTally {
    pub fn ready_count(&self) -> usize {
        self.voters.len()
    }

    /// All expected participants have voted.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.voters.len() >= self.total
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LobbyTally {
    pub staying: BTreeSet<String>,
    pub leaving: BTreeSet<String>,
    pub total: usize,
}

impl LobbyTally {
    pub fn decided_count(&self) -> usize {
        self.staying.len() + self.leaving.len()
    }
}

#[derive(Debug)]
pub struct ConsensusTracker {
    local: String,
    next_round: NextRoundTally,
    voted_next_round: bool,
    lobby: LobbyTally,
    lobby_choice: Option<LobbyChoice>,
}

impl ConsensusTracker {
    pub fn new(local: impl Into<String>) -> Self {
        ConsensusTracker {
            local: local.into(),
            next_round: NextRoundTally::default(),
            voted_next_round: false,
            lobby: LobbyTally::default(),
            lobby_choice: None,
        }
    }

    pub fn next_round(&self) -> &NextRoundTally {
        &self.next_round
    }

    pub fn lobby(&self) -> &LobbyTally {
        &self.lobby
    }

    pub fn has_voted_next_round(&self) -> bool {
        self.voted_next_round
    }

    pub fn lobby_choice(&self) -> Option<LobbyChoice> {
        self.lobby_choice
    }

    // -- next round ---------------------------------------------------------

    /// Claim the local next-round vote. Returns `false` if already cast this
    /// epoch, in which case the caller sends nothing.
    pub fn cast_next_round(&mut self) -> bool {
        if self.voted_next_round {
            return false;
        }
        self.voted_next_round = true;
        true
    }

    /// The vote request failed; allow casting again.
    pub fn retract_next_round(&mut self) {
        self.voted_next_round = false;
    }

    pub fn apply_next_round_vote(&mut self, votes: &VoteList, total: usize) {
        self.next_round = NextRoundTally {
            voters: votes.iter().cloned().collect(),
            total,
        };
        if votes.contains(&self.local) {
            self.voted_next_round = true;
        }
        debug!(
            ready = self.next_round.ready_count(),
            total, "next-round tally updated"
        );
    }

    pub fn reset_next_round(&mut self) {
        self.next_round = NextRoundTally::default();
        self.voted_next_round = false;
    }

    // -- return to lobby ----------------------------------------------------

    /// Claim the local lobby decision. Returns `false` if a decision was
    /// already cast this epoch.
    pub fn cast_lobby(&mut self, choice: LobbyChoice) -> bool {
        if self.lobby_choice.is_some() {
            return false;
        }
        self.lobby_choice = Some(choice);
        true
    }

    pub fn retract_lobby(&mut self) {
        self.lobby_choice = None;
    }

    pub fn apply_lobby_vote(&mut self, staying: &VoteList, leaving: &VoteList, total: usize) {
        self.lobby = LobbyTally {
            staying: staying.iter().cloned().collect(),
            leaving: leaving.iter().cloned().collect(),
            total,
        };
        self.sync_local_choice();
    }

    pub fn player_staying(&mut self, player: &str) {
        self.lobby.leaving.remove(player);
        self.lobby.staying.insert(player.to_string());
        self.sync_local_choice();
    }

    pub fn player_leaving(&mut self, player: &str) {
        self.lobby.staying.remove(player);
        self.lobby.leaving.insert(player.to_string());
        self.sync_local_choice();
    }

    fn sync_local_choice(&mut self) {
        if self.lobby.staying.contains(&self.local) {
            self.lobby_choice = Some(LobbyChoice::Stay);
        } else if self.lobby.leaving.contains(&self.local) {
            self.lobby_choice = Some(LobbyChoice::Leave);
        }
    }

    /// Resolve the local route from the terminal broadcast.
    ///
    /// Returns the route and whether it was reached by the neither-set
    /// fallback.
    pub fn route_for(&self, staying: &VoteList, leaving: &VoteList) -> (Route, bool) {
        if staying.contains(&self.local) {
            (Route::Lobby, false)
        } else if leaving.contains(&self.local) {
            (Route::Dashboard, false)
        } else {
            warn!(
                participant = %self.local,
                staying = staying.len(),
                leaving = leaving.len(),
                "participant in neither lobby set, defaulting to lobby"
            );
            (Route::Lobby, true)
        }
    }

    /// Start a new epoch for both flows.
    pub fn reset_epoch(&mut self) {
        self.reset_next_round();
        self.lobby = LobbyTally::default();
        self.lobby_choice = None;
    }
}
