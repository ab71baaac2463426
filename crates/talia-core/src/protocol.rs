// Realtime wire protocol: inbound notices from the game server and the
// outbound heartbeat.
//
// Every frame is a JSON object tagged by `"type"`. Kinds the client does not
// know decode to `InboundMessage::Unknown` and are ignored by the session.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Connected,
    /// Full authoritative snapshot.
    StateUpdate {
        data: Value,
    },
    ActionPerformed(ActionNotice),
    BotAction(ActionNotice),
    TrickFinalized,
    NextRoundStarted,
    NextRoundVote {
        #[serde(default)]
        votes: VoteList,
        #[serde(default)]
        total_players: usize,
        #[serde(default)]
        ready_players: Option<usize>,
    },
    ReturnToLobbyVote {
        #[serde(default)]
        votes_stay: VoteList,
        #[serde(default)]
        votes_leave: VoteList,
        #[serde(default)]
        total_players: usize,
    },
    ReturnedToLobby {
        #[serde(default)]
        staying_players: VoteList,
        #[serde(default)]
        leaving_players: VoteList,
    },
    LobbyClosed,
    PlayerStaying {
        player: String,
    },
    PlayerLeaving {
        player: String,
    },
    PlayerDisconnected {
        player: String,
        /// Seconds the server waits before declaring a forfeit.
        #[serde(default)]
        reconnect_timeout: Option<u64>,
    },
    PlayerReconnected {
        player: String,
    },
    PlayerLeft {
        #[serde(default)]
        player: Option<String>,
    },
    GameForfeit {
        disconnected_player: String,
        #[serde(default)]
        winners: Vec<String>,
        #[serde(default)]
        reason: Option<String>,
    },
    GameEnded {
        #[serde(default)]
        winner: Option<Winner>,
        #[serde(default)]
        final_scores: BTreeMap<String, i64>,
    },
    Pong,
    #[serde(other)]
    Unknown,
}

/// Someone else made a move. The embedded `state` is informational only and
/// never reconciled; the session pulls a fresh snapshot instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionNotice {
    pub player: String,
    pub action: Value,
    #[serde(default)]
    pub state: Option<Value>,
}

/// Match winner: a single participant, or a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Winner {
    One(String),
    Many(Vec<String>),
}

impl Winner {
    pub fn participants(&self) -> Vec<String> {
        match self {
            Winner::One(id) => vec![id.clone()],
            Winner::Many(ids) => ids.clone(),
        }
    }
}

/// A set of participant ids.
///
/// The server sends vote sets either as a list of ids or as an id -> bool map;
/// in the map form only ids mapped to `true` count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawVotes", into = "Vec<String>")]
pub struct VoteList(BTreeSet<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVotes {
    List(Vec<String>),
    Map(BTreeMap<String, bool>),
}

impl From<RawVotes> for VoteList {
    fn from(raw: RawVotes) -> Self {
        match raw {
            RawVotes::List(ids) => ids.into_iter().collect(),
            RawVotes::Map(votes) => votes
                .into_iter()
                .filter_map(|(id, voted)| voted.then_some(id))
                .collect(),
        }
    }
}

impl From<VoteList> for Vec<String> {
    fn from(votes: VoteList) -> Self {
        votes.0.into_iter().collect()
    }
}

impl FromIterator<String> for VoteList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        VoteList(iter.into_iter().collect())
    }
}

impl VoteList {
    pub fn contains(&self, participant: &str) -> bool {
        self.0.contains(participant)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn into_set(self) -> BTreeSet<String> {
        self.0
    }
}

impl InboundMessage {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Connected => "connected",
            InboundMessage::StateUpdate { .. } => "state_update",
            InboundMessage::ActionPerformed(_) => "action_performed",
            InboundMessage::BotAction(_) => "bot_action",
            InboundMessage::TrickFinalized => "trick_finalized",
            InboundMessage::NextRoundStarted => "next_round_started",
            InboundMessage::NextRoundVote { .. } => "next_round_vote",
            InboundMessage::ReturnToLobbyVote { .. } => "return_to_lobby_vote",
            InboundMessage::ReturnedToLobby { .. } => "returned_to_lobby",
            InboundMessage::LobbyClosed => "lobby_closed",
            InboundMessage::PlayerStaying { .. } => "player_staying",
            InboundMessage::PlayerLeaving { .. } => "player_leaving",
            InboundMessage::PlayerDisconnected { .. } => "player_disconnected",
            InboundMessage::PlayerReconnected { .. } => "player_reconnected",
            InboundMessage::PlayerLeft { .. } => "player_left",
            InboundMessage::GameForfeit { .. } => "game_forfeit",
            InboundMessage::GameEnded { .. } => "game_ended",
            InboundMessage::Pong => "pong",
            InboundMessage::Unknown => "unknown",
        }
    }
}

/// Decode one text frame.
pub fn decode(text: &str) -> serde_json::Result<InboundMessage> {
    serde_json::from_str(text)
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Ping,
}

impl OutboundMessage {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_state_update() {
        let msg = decode(r#"{"type":"state_update","data":{"phase":"bidding"}}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::StateUpdate {
                data: json!({"phase": "bidding"})
            }
        );
    }

    #[test]
    fn decodes_action_notice_with_embedded_state() {
        let msg = decode(concat!(
            r#"{"type":"bot_action","player":"bot-1","#,
            r#""action":{"action":"bid","value":110},"state":{"phase":"bidding"}}"#,
        ))
        .unwrap();
        let InboundMessage::BotAction(notice) = msg else {
            panic!("expected bot_action, got {msg:?}");
        };
        assert_eq!(notice.player, "bot-1");
        assert_eq!(notice.action["value"], 110);
        assert!(notice.state.is_some());
    }

    #[test]
    fn votes_accept_list_or_map() {
        let msg = decode(r#"{"type":"next_round_vote","votes":["a","b","a"],"total_players":4}"#)
            .unwrap();
        let InboundMessage::NextRoundVote { votes, total_players, ready_players } = msg else {
            panic!("expected next_round_vote");
        };
        assert_eq!(votes.len(), 2);
        assert_eq!(total_players, 4);
        assert_eq!(ready_players, None);

        let msg = decode(concat!(
            r#"{"type":"return_to_lobby_vote","votes_stay":{"a":true,"b":false},"#,
            r#""votes_leave":["c"],"total_players":3}"#,
        ))
        .unwrap();
        let InboundMessage::ReturnToLobbyVote { votes_stay, votes_leave, .. } = msg else {
            panic!("expected return_to_lobby_vote");
        };
        assert!(votes_stay.contains("a"));
        assert!(!votes_stay.contains("b"));
        assert!(votes_leave.contains("c"));
    }

    #[test]
    fn decodes_disconnect_with_optional_timeout() {
        let msg = decode(r#"{"type":"player_disconnected","player":"p2"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::PlayerDisconnected {
                player: "p2".into(),
                reconnect_timeout: None
            }
        );
    }

    #[test]
    fn decodes_game_ended_winner_shapes() {
        let single = decode(r#"{"type":"game_ended","winner":"p1","final_scores":{"p1":1000}}"#)
            .unwrap();
        let InboundMessage::GameEnded { winner, final_scores } = single else {
            panic!("expected game_ended");
        };
        assert_eq!(winner.unwrap().participants(), vec!["p1".to_string()]);
        assert_eq!(final_scores["p1"], 1000);

        let team = decode(r#"{"type":"game_ended","winner":["p1","p3"]}"#).unwrap();
        let InboundMessage::GameEnded { winner, .. } = team else {
            panic!("expected game_ended");
        };
        assert_eq!(winner, Some(Winner::Many(vec!["p1".into(), "p3".into()])));
    }

    #[test]
    fn unknown_type_is_explicit() {
        let msg = decode(r#"{"type":"chat_message","text":"hi"}"#).unwrap();
        assert_eq!(msg, InboundMessage::Unknown);
        assert_eq!(msg.kind(), "unknown");
    }

    #[test]
    fn malformed_frames_fail_to_decode() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"data":{}}"#).is_err());
        assert!(decode(r#"{"type":"player_staying"}"#).is_err());
    }

    #[test]
    fn ping_payload_is_fixed() {
        let encoded = OutboundMessage::Ping.encode().unwrap();
        assert_eq!(encoded, r#"{"type":"ping"}"#);
    }
}
