// Self-expiring notifications derived from push notices: action bubbles
// next to a seat, and the countdown for a disconnected participant.
//
// Nothing here feeds back into the authoritative snapshot. Bubbles expire on
// their own clock regardless of how often the game state changes.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::game::action::{describe_action, ActionKind};
use crate::game::snapshot::Phase;

/// Default forfeit window when a disconnect notice carries no timeout.
pub const DEFAULT_RECONNECT_TIMEOUT_SECS: u64 = 60;

/// Upper bound on any forfeit window, whatever the server announces.
pub const MAX_RECONNECT_TIMEOUT_SECS: u64 = 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Seats
// ---------------------------------------------------------------------------

/// Screen position relative to the local participant, who always sits at the
/// bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatPosition {
    Bottom,
    Left,
    Top,
    Right,
}

/// Map a clockwise seat offset from the local participant to a position.
/// Only 2, 3 and 4 player tables are supported.
pub fn seat_position(offset: usize, table_size: usize) -> Option<SeatPosition> {
    use SeatPosition::*;
    let layout: &[SeatPosition] = match table_size {
        2 => &[Bottom, Top],
        3 => &[Bottom, Left, Right],
        4 => &[Bottom, Left, Top, Right],
        _ => return None,
    };
    layout.get(offset).copied()
}

/// Seat offset of `actor` relative to `local` in seat order.
pub fn seat_offset(players: &[String], actor: &str, local: &str) -> Option<usize> {
    let n = players.len();
    let actor_seat = players.iter().position(|p| p == actor)?;
    let local_seat = players.iter().position(|p| p == local)?;
    Some((actor_seat + n - local_seat) % n)
}

// ---------------------------------------------------------------------------
// Bubbles
// ---------------------------------------------------------------------------

/// Whether an action announced during `phase` gets a bubble.
///
/// Only bidding and declaration phases qualify. Card plays never do, and
/// neither does a pass during a lufa challenge.
pub fn bubble_allowed(phase: &Phase, kind: ActionKind) -> bool {
    if kind == ActionKind::PlayCard {
        return false;
    }
    match phase {
        Phase::LufaChallenge => kind != ActionKind::Pass,
        Phase::InitialDeclaration
        | Phase::Question
        | Phase::CounterBid
        | Phase::PostPassDecision
        | Phase::Bidding
        | Phase::PostMusikDecision => true,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBubble {
    pub player: String,
    pub kind: ActionKind,
    pub label: String,
    pub position: SeatPosition,
    pub expires_at: Instant,
}

// ---------------------------------------------------------------------------
// Disconnect countdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectCountdown {
    pub player: String,
    pub deadline: Instant,
    /// Whole seconds left, as last reported.
    pub remaining: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { player: String, remaining: u64 },
    Expired { player: String },
}

// ---------------------------------------------------------------------------
// EphemeralEventBus
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct EphemeralEventBus {
    bubble_ttl: Duration,
    default_timeout_secs: u64,
    bubbles: Vec<ActionBubble>,
    countdown: Option<DisconnectCountdown>,
}

impl EphemeralEventBus {
    pub fn new(bubble_ttl: Duration, default_timeout_secs: u64) -> Self {
        EphemeralEventBus {
            bubble_ttl,
            default_timeout_secs,
            bubbles: Vec::new(),
            countdown: None,
        }
    }

    pub fn bubbles(&self) -> &[ActionBubble] {
        &self.bubbles
    }

    pub fn countdown(&self) -> Option<&DisconnectCountdown> {
        self.countdown.as_ref()
    }

    /// Show a bubble for an announced action, if the phase allows it.
    ///
    /// A new bubble for the same actor replaces the old one.
    pub fn on_action(
        &mut self,
        actor: &str,
        action: &Value,
        phase: Option<&Phase>,
        players: &[String],
        local: &str,
        now: Instant,
    ) -> Option<&ActionBubble> {
        let (kind, label) = describe_action(action)?;
        if !bubble_allowed(phase?, kind) {
            return None;
        }
        let offset = seat_offset(players, actor, local)?;
        let position = seat_position(offset, players.len())?;

        self.bubbles.retain(|b| b.player != actor);
        debug!(player = actor, %label, ?position, "action bubble");
        self.bubbles.push(ActionBubble {
            player: actor.to_string(),
            kind,
            label,
            position,
            expires_at: now + self.bubble_ttl,
        });
        self.bubbles.last()
    }

    /// Drop expired bubbles. Returns whether anything was removed.
    pub fn sweep(&mut self, now: Instant) -> bool {
        let before = self.bubbles.len();
        self.bubbles.retain(|b| b.expires_at > now);
        self.bubbles.len() != before
    }

    /// Earliest bubble expiry, for scheduling the next sweep.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.bubbles.iter().map(|b| b.expires_at).min()
    }

    /// Start counting down for a disconnected remote participant.
    ///
    /// Ignored for the local participant. Any running countdown is replaced.
    pub fn start_countdown(
        &mut self,
        player: &str,
        timeout_secs: Option<u64>,
        local: &str,
        now: Instant,
    ) -> bool {
        if player == local {
            return false;
        }
        let requested = timeout_secs.unwrap_or(self.default_timeout_secs);
        let secs = requested.min(MAX_RECONNECT_TIMEOUT_SECS);
        if secs != requested {
            warn!(player, requested, "reconnect timeout out of range, clamped");
        }
        self.countdown = Some(DisconnectCountdown {
            player: player.to_string(),
            deadline: now + Duration::from_secs(secs),
            remaining: secs,
        });
        debug!(player, secs, "disconnect countdown started");
        true
    }

    /// Advance the countdown to `now`. Expiry clears it.
    pub fn tick_countdown(&mut self, now: Instant) -> Option<CountdownEvent> {
        let countdown = self.countdown.as_mut()?;
        if now >= countdown.deadline {
            let player = countdown.player.clone();
            self.countdown = None;
            debug!(%player, "disconnect countdown expired");
            return Some(CountdownEvent::Expired { player });
        }
        let left = countdown.deadline - now;
        countdown.remaining = left.as_millis().div_ceil(1000) as u64;
        Some(CountdownEvent::Tick {
            player: countdown.player.clone(),
            remaining: countdown.remaining,
        })
    }

    /// Clear the countdown if it belongs to `player` (a reconnect notice).
    pub fn clear_countdown_for(&mut self, player: &str) -> bool {
        if self.countdown.as_ref().is_some_and(|c| c.player == player) {
            self.countdown = None;
            debug!(player, "disconnect countdown cleared");
            return true;
        }
        false
    }

    /// Cancel whatever countdown is running (superseded by a forfeit).
    pub fn cancel_countdown(&mut self) -> Option<DisconnectCountdown> {
        self.countdown.take()
    }
}
