// Phase state machine: which panel to show and which actions are open,
// derived from the authoritative snapshot on every update.

use serde::Serialize;

use super::action::{ActionKind, PlayerAction, MUSIK_EXCHANGE_CARDS};
use super::snapshot::{Card, GameSnapshot, Phase};

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

/// The interaction panel the local participant should see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    /// Someone else is acting, or the phase is unknown.
    Waiting,
    Declaration,
    Question,
    CounterBid,
    LufaChallenge,
    PostPassDecision,
    Bidding,
    MusikExchange,
    PostMusikDecision,
    PlayCard,
    RoundSummary,
    FinalScore,
}

/// Client-side count check for actions that take a fixed card selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionRule {
    Exactly(usize),
}

impl SelectionRule {
    pub fn accepts(self, selected: usize) -> bool {
        match self {
            SelectionRule::Exactly(n) => selected == n,
        }
    }

    pub fn required(self) -> usize {
        match self {
            SelectionRule::Exactly(n) => n,
        }
    }
}

/// Everything the UI needs to know about the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseView {
    pub phase: Option<Phase>,
    pub panel: Panel,
    pub is_my_turn: bool,
    /// Whether the panel accepts input. The session additionally clears this
    /// while an action is pending.
    pub interactive: bool,
    pub turn_holder: Option<String>,
    pub actions: Vec<ActionKind>,
    pub selection: Option<SelectionRule>,
}

/// Actions the turn holder may choose from in a given phase.
pub fn phase_actions(phase: &Phase) -> &'static [ActionKind] {
    use ActionKind::*;
    match phase {
        Phase::InitialDeclaration => &[Declare],
        Phase::Question => &[Pass, CounterBid, Lufa],
        Phase::CounterBid => &[CounterBid, Pass],
        Phase::LufaChallenge => &[Lufa, Pass],
        Phase::PostPassDecision | Phase::PostMusikDecision => &[Decide],
        Phase::Bidding => &[Bid, Pass],
        Phase::MusikExchange => &[ExchangeMusik],
        Phase::TrickInProgress => &[PlayCard],
        Phase::RoundSummary | Phase::MatchEnded | Phase::Other(_) => &[],
    }
}

fn turn_panel(phase: &Phase) -> Panel {
    match phase {
        Phase::InitialDeclaration => Panel::Declaration,
        Phase::Question => Panel::Question,
        Phase::CounterBid => Panel::CounterBid,
        Phase::LufaChallenge => Panel::LufaChallenge,
        Phase::PostPassDecision => Panel::PostPassDecision,
        Phase::Bidding => Panel::Bidding,
        Phase::MusikExchange => Panel::MusikExchange,
        Phase::PostMusikDecision => Panel::PostMusikDecision,
        Phase::TrickInProgress => Panel::PlayCard,
        Phase::RoundSummary => Panel::RoundSummary,
        Phase::MatchEnded => Panel::FinalScore,
        Phase::Other(_) => Panel::Waiting,
    }
}

/// Derive the phase view for `local` from `snapshot`.
///
/// Pure function of (phase, turn holder, local id); callers recompute it on
/// every snapshot rather than caching it.
pub fn derive_view(snapshot: &GameSnapshot, local: &str) -> PhaseView {
    let is_my_turn = snapshot.is_turn_of(local);
    let turn_holder = snapshot.turn.clone();

    let Some(phase) = snapshot.phase.clone() else {
        return PhaseView {
            phase: None,
            panel: Panel::Waiting,
            is_my_turn,
            interactive: false,
            turn_holder,
            actions: Vec::new(),
            selection: None,
        };
    };

    let (panel, interactive) = match phase {
        // Summary and final views are shown to everyone regardless of turn.
        Phase::RoundSummary => (Panel::RoundSummary, true),
        Phase::MatchEnded => (Panel::FinalScore, false),
        Phase::Other(_) => (Panel::Waiting, false),
        Phase::TrickInProgress => {
            let can_play = is_my_turn && !snapshot.trick_complete;
            (Panel::PlayCard, can_play)
        }
        ref turn_phase if is_my_turn => (turn_panel(turn_phase), true),
        _ => (Panel::Waiting, false),
    };

    let actions = if interactive {
        phase_actions(&phase).to_vec()
    } else {
        Vec::new()
    };
    let selection = (panel == Panel::MusikExchange)
        .then_some(SelectionRule::Exactly(MUSIK_EXCHANGE_CARDS));

    PhaseView {
        phase: Some(phase),
        panel,
        is_my_turn,
        interactive,
        turn_holder,
        actions,
        selection,
    }
}

// ---------------------------------------------------------------------------
// Phase entry detection
// ---------------------------------------------------------------------------

/// Side effects the session must run when a phase is entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEntry {
    /// A new round-summary instance began: start a new consensus epoch.
    RoundSummary { round: Option<u32> },
    /// The match is over: surface the final-score view.
    MatchEnded,
}

/// Remembers the last observed phase so entries can be detected.
#[derive(Debug, Default)]
pub struct PhaseTracker {
    last_phase: Option<Phase>,
    last_summary_round: Option<u32>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_phase(&self) -> Option<&Phase> {
        self.last_phase.as_ref()
    }

    /// Record `snapshot` and report any phase entries it causes.
    ///
    /// Round summary counts as a new entry either when coming from another
    /// phase or when the summary's round number changes while staying in it.
    pub fn observe(&mut self, snapshot: &GameSnapshot) -> Vec<PhaseEntry> {
        let mut entries = Vec::new();
        let phase = snapshot.phase.clone();

        if phase != self.last_phase {
            tracing::debug!(from = ?self.last_phase, to = ?phase, "phase changed");
        }

        match &phase {
            Some(Phase::RoundSummary) => {
                let round = snapshot.summary_round();
                let entered = self.last_phase != Some(Phase::RoundSummary)
                    || round != self.last_summary_round;
                if entered {
                    entries.push(PhaseEntry::RoundSummary { round });
                }
                self.last_summary_round = round;
            }
            Some(Phase::MatchEnded) if self.last_phase != Some(Phase::MatchEnded) => {
                entries.push(PhaseEntry::MatchEnded);
            }
            _ => {}
        }

        if phase.is_some() {
            self.last_phase = phase;
        }
        entries
    }
}

// ---------------------------------------------------------------------------
// Card selection
// ---------------------------------------------------------------------------

/// Cards picked for a fixed-size action such as the musik exchange.
#[derive(Debug, Clone)]
pub struct CardSelection {
    rule: SelectionRule,
    cards: Vec<Card>,
}

impl CardSelection {
    pub fn new(rule: SelectionRule) -> Self {
        CardSelection {
            rule,
            cards: Vec::new(),
        }
    }

    /// Select `card`, or deselect it if already selected. Selecting beyond
    /// the required count is refused.
    pub fn toggle(&mut self, card: Card) -> bool {
        if let Some(idx) = self.cards.iter().position(|c| *c == card) {
            self.cards.remove(idx);
            return true;
        }
        if self.cards.len() >= self.rule.required() {
            return false;
        }
        self.cards.push(card);
        true
    }

    pub fn selected(&self) -> &[Card] {
        &self.cards
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.rule.accepts(self.cards.len())
    }

    /// Build the exchange action once the selection is complete.
    pub fn into_exchange(self) -> Option<PlayerAction> {
        self.can_submit()
            .then(|| PlayerAction::ExchangeMusik { cards: self.cards })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::snapshot::RoundSummary;

    fn four_players(phase: Phase, turn: &str) -> GameSnapshot {
        GameSnapshot {
            phase: Some(phase),
            players: vec!["p1".into(), "p2".into(), "p3".into(), "p4".into()],
            turn: Some(turn.into()),
            ..Default::default()
        }
    }

    #[test]
    fn declaration_panel_is_interactive_for_turn_holder() {
        let view = derive_view(&four_players(Phase::InitialDeclaration, "p1"), "p1");
        assert_eq!(view.panel, Panel::Declaration);
        assert!(view.is_my_turn);
        assert!(view.interactive);
        assert_eq!(view.actions, vec![ActionKind::Declare]);
    }

    #[test]
    fn other_participants_wait_during_declaration() {
        let view = derive_view(&four_players(Phase::InitialDeclaration, "p1"), "p3");
        assert_eq!(view.panel, Panel::Waiting);
        assert!(!view.interactive);
        assert!(view.actions.is_empty());
        assert_eq!(view.turn_holder.as_deref(), Some("p1"));
    }

    #[test]
    fn round_summary_and_final_views_ignore_turn() {
        let summary = derive_view(&four_players(Phase::RoundSummary, "p2"), "p1");
        assert_eq!(summary.panel, Panel::RoundSummary);
        assert!(summary.interactive);

        let ended = derive_view(&four_players(Phase::MatchEnded, "p2"), "p1");
        assert_eq!(ended.panel, Panel::FinalScore);
        assert!(!ended.interactive);
    }

    #[test]
    fn completed_trick_blocks_card_play() {
        let mut snapshot = four_players(Phase::TrickInProgress, "p1");
        assert!(derive_view(&snapshot, "p1").interactive);
        snapshot.trick_complete = true;
        let view = derive_view(&snapshot, "p1");
        assert_eq!(view.panel, Panel::PlayCard);
        assert!(!view.interactive);
    }

    #[test]
    fn musik_exchange_requires_two_cards() {
        let view = derive_view(&four_players(Phase::MusikExchange, "p2"), "p2");
        assert_eq!(view.selection, Some(SelectionRule::Exactly(2)));
    }

    #[test]
    fn unknown_or_missing_phase_waits() {
        let view = derive_view(&four_players(Phase::Other("dealing".into()), "p1"), "p1");
        assert_eq!(view.panel, Panel::Waiting);
        assert!(!view.interactive);

        let bare = GameSnapshot {
            table: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(derive_view(&bare, "p1").panel, Panel::Waiting);
    }

    #[test]
    fn tracker_reports_round_summary_once_per_instance() {
        let mut tracker = PhaseTracker::new();
        let mut snapshot = four_players(Phase::TrickInProgress, "p1");
        assert!(tracker.observe(&snapshot).is_empty());

        snapshot.phase = Some(Phase::RoundSummary);
        snapshot.round_summary = Some(RoundSummary {
            round: 3,
            points: Default::default(),
        });
        assert_eq!(
            tracker.observe(&snapshot),
            vec![PhaseEntry::RoundSummary { round: Some(3) }]
        );
        // Re-delivery of the same summary is not a new epoch.
        assert!(tracker.observe(&snapshot).is_empty());

        snapshot.round_summary = Some(RoundSummary {
            round: 4,
            points: Default::default(),
        });
        assert_eq!(
            tracker.observe(&snapshot),
            vec![PhaseEntry::RoundSummary { round: Some(4) }]
        );
    }

    #[test]
    fn tracker_reports_match_end() {
        let mut tracker = PhaseTracker::new();
        let snapshot = four_players(Phase::MatchEnded, "p1");
        assert_eq!(tracker.observe(&snapshot), vec![PhaseEntry::MatchEnded]);
        assert!(tracker.observe(&snapshot).is_empty());
    }

    #[test]
    fn selection_enforces_exact_count() {
        let mut selection = CardSelection::new(SelectionRule::Exactly(2));
        assert!(!selection.can_submit());
        assert!(selection.toggle(Card::new("9", "CLUBS")));
        assert!(!selection.can_submit());
        assert!(selection.toggle(Card::new("K", "HEARTS")));
        assert!(selection.can_submit());
        assert!(!selection.toggle(Card::new("A", "SPADES")));

        // Deselect and reselect.
        assert!(selection.toggle(Card::new("9", "CLUBS")));
        assert!(!selection.can_submit());
        assert!(selection.clone().into_exchange().is_none());
        selection.toggle(Card::new("A", "SPADES"));

        match selection.into_exchange() {
            Some(PlayerAction::ExchangeMusik { cards }) => assert_eq!(cards.len(), 2),
            other => panic!("expected exchange action, got {other:?}"),
        }
    }
}
