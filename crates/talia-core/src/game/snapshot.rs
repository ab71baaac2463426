// Authoritative game snapshot as declared by the server.
//
// Every field is optional on the wire: the reconciler decides whether a
// candidate carries enough to be accepted. Unknown fields are ignored.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A server-declared stage of a round.
///
/// The client never computes the phase; it only follows whatever the latest
/// accepted snapshot says. Names the client does not know are kept verbatim in
/// [`Phase::Other`] so they can be logged and rendered as a waiting state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    // Sixty-six bidding chain
    InitialDeclaration,
    Question,
    CounterBid,
    LufaChallenge,
    PostPassDecision,
    // Tysiac bidding chain
    Bidding,
    MusikExchange,
    PostMusikDecision,
    // Shared
    TrickInProgress,
    RoundSummary,
    MatchEnded,
    Other(String),
}

/// Which rule family a phase belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseFamily {
    SixtySix,
    Tysiac,
    Shared,
    Unknown,
}

impl Phase {
    /// Wire name of the phase.
    pub fn as_str(&self) -> &str {
        match self {
            Phase::InitialDeclaration => "initial_declaration",
            Phase::Question => "question",
            Phase::CounterBid => "counter_bid",
            Phase::LufaChallenge => "lufa_challenge",
            Phase::PostPassDecision => "post_pass_decision",
            Phase::Bidding => "bidding",
            Phase::MusikExchange => "musik_exchange",
            Phase::PostMusikDecision => "post_musik_decision",
            Phase::TrickInProgress => "trick_in_progress",
            Phase::RoundSummary => "round_summary",
            Phase::MatchEnded => "match_ended",
            Phase::Other(name) => name,
        }
    }

    pub fn family(&self) -> PhaseFamily {
        match self {
            Phase::InitialDeclaration
            | Phase::Question
            | Phase::CounterBid
            | Phase::LufaChallenge
            | Phase::PostPassDecision => PhaseFamily::SixtySix,
            Phase::Bidding | Phase::MusikExchange | Phase::PostMusikDecision => {
                PhaseFamily::Tysiac
            }
            Phase::TrickInProgress | Phase::RoundSummary | Phase::MatchEnded => {
                PhaseFamily::Shared
            }
            Phase::Other(_) => PhaseFamily::Unknown,
        }
    }
}

impl From<String> for Phase {
    fn from(name: String) -> Self {
        match name.as_str() {
            "initial_declaration" => Phase::InitialDeclaration,
            "question" => Phase::Question,
            "counter_bid" => Phase::CounterBid,
            "lufa_challenge" => Phase::LufaChallenge,
            "post_pass_decision" => Phase::PostPassDecision,
            "bidding" => Phase::Bidding,
            "musik_exchange" => Phase::MusikExchange,
            "post_musik_decision" => Phase::PostMusikDecision,
            "trick_in_progress" => Phase::TrickInProgress,
            "round_summary" => Phase::RoundSummary,
            "match_ended" => Phase::MatchEnded,
            _ => Phase::Other(name),
        }
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Cards and hands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    SixtySix,
    Tysiac,
}

/// A single card as the server names it (e.g. rank "A", suit "HEARTS").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub rank: String,
    pub suit: String,
}

impl Card {
    pub fn new(rank: impl Into<String>, suit: impl Into<String>) -> Self {
        Card {
            rank: rank.into(),
            suit: suit.into(),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rank, self.suit)
    }
}

/// One participant's hand as visible to the local participant: the full card
/// list for the local hand, a bare count for everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandView {
    Cards(Vec<Card>),
    Count(u32),
}

impl HandView {
    pub fn card_count(&self) -> usize {
        match self {
            HandView::Cards(cards) => cards.len(),
            HandView::Count(n) => *n as usize,
        }
    }
}

/// A card lying on the table, tagged with who played it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedCard {
    pub player: String,
    pub card: Card,
}

/// Declared contract / winning bid for the current round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contract {
    pub contract: Option<String>,
    pub trump: Option<String>,
    pub declarer: Option<String>,
    pub bid: Option<u32>,
    /// Current stake multiplier (raised by lufa challenges).
    pub stake: Option<u32>,
}

/// Points awarded at the end of a round. `round` identifies the summary
/// instance; a new number means a new consensus epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u32,
    #[serde(default)]
    pub points: BTreeMap<String, i64>,
}

// ---------------------------------------------------------------------------
// GameSnapshot
// ---------------------------------------------------------------------------

/// The complete server-declared state of one game instance.
///
/// Replaced wholesale on every accepted update; never merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSnapshot {
    /// Optional monotonic version stamped by the server.
    pub version: Option<u64>,
    pub phase: Option<Phase>,
    pub game: Option<GameKind>,
    /// Participant ids in seat order.
    pub players: Vec<String>,
    pub hands: Option<BTreeMap<String, HandView>>,
    pub table: Option<Vec<PlayedCard>>,
    /// Participant whose turn it is, if any.
    pub turn: Option<String>,
    pub contract: Option<Contract>,
    pub scores: BTreeMap<String, i64>,
    pub round_summary: Option<RoundSummary>,
    /// Set while a full trick is lying on the table awaiting finalization.
    pub trick_complete: bool,
}

impl GameSnapshot {
    /// True if the snapshot carries a phase indicator or hand/table data.
    pub fn has_discriminator(&self) -> bool {
        self.phase.is_some() || self.hands.is_some() || self.table.is_some()
    }

    pub fn is_turn_of(&self, participant: &str) -> bool {
        self.turn.as_deref() == Some(participant)
    }

    pub fn seat_of(&self, participant: &str) -> Option<usize> {
        self.players.iter().position(|p| p == participant)
    }

    /// The local participant's own cards, if the server sent them.
    pub fn hand_of(&self, participant: &str) -> Option<&[Card]> {
        match self.hands.as_ref()?.get(participant)? {
            HandView::Cards(cards) => Some(cards),
            HandView::Count(_) => None,
        }
    }

    pub fn summary_round(&self) -> Option<u32> {
        self.round_summary.as_ref().map(|s| s.round)
    }
}
