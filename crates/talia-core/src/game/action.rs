// Player decisions submitted to the server, and how announced actions of
// other participants are described.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::snapshot::Card;

/// Number of cards handed off during the musik exchange.
pub const MUSIK_EXCHANGE_CARDS: usize = 2;

/// A single decision the local participant can submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    Declare {
        contract: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trump: Option<String>,
    },
    CounterBid {
        contract: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trump: Option<String>,
    },
    Bid {
        value: u32,
    },
    Pass,
    Lufa,
    Decide {
        choice: String,
    },
    ExchangeMusik {
        cards: Vec<Card>,
    },
    PlayCard {
        card: Card,
    },
}

/// Payload-free discriminant of [`PlayerAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Declare,
    CounterBid,
    Bid,
    Pass,
    Lufa,
    Decide,
    ExchangeMusik,
    PlayCard,
}

impl ActionKind {
    pub fn from_wire(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "declare" | "declaration" => ActionKind::Declare,
            "counter_bid" => ActionKind::CounterBid,
            "bid" => ActionKind::Bid,
            "pass" => ActionKind::Pass,
            "lufa" => ActionKind::Lufa,
            "decide" | "decision" => ActionKind::Decide,
            "exchange_musik" => ActionKind::ExchangeMusik,
            "play_card" | "play" => ActionKind::PlayCard,
            _ => return None,
        };
        Some(kind)
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Declare => "Declare",
            ActionKind::CounterBid => "Counter",
            ActionKind::Bid => "Bid",
            ActionKind::Pass => "Pass",
            ActionKind::Lufa => "Lufa!",
            ActionKind::Decide => "Decide",
            ActionKind::ExchangeMusik => "Musik",
            ActionKind::PlayCard => "Play",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl PlayerAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PlayerAction::Declare { .. } => ActionKind::Declare,
            PlayerAction::CounterBid { .. } => ActionKind::CounterBid,
            PlayerAction::Bid { .. } => ActionKind::Bid,
            PlayerAction::Pass => ActionKind::Pass,
            PlayerAction::Lufa => ActionKind::Lufa,
            PlayerAction::Decide { .. } => ActionKind::Decide,
            PlayerAction::ExchangeMusik { .. } => ActionKind::ExchangeMusik,
            PlayerAction::PlayCard { .. } => ActionKind::PlayCard,
        }
    }
}

/// Describe an action announced by the server as a kind plus a short
/// human-readable label.
///
/// The server sends either a bare action name (`"pass"`) or an object in the
/// same shape as [`PlayerAction`] (`{"action": "declare", "contract": ...}`).
/// Older payloads use `"type"` instead of `"action"`; both are accepted.
pub fn describe_action(action: &Value) -> Option<(ActionKind, String)> {
    match action {
        Value::String(name) => {
            let kind = ActionKind::from_wire(name)?;
            Some((kind, kind.label().to_string()))
        }
        Value::Object(fields) => {
            let name = fields
                .get("action")
                .or_else(|| fields.get("type"))
                .and_then(Value::as_str)?;
            let kind = ActionKind::from_wire(name)?;
            let text = |key: &str| fields.get(key).and_then(Value::as_str);
            let label = match kind {
                ActionKind::Declare | ActionKind::CounterBid => {
                    match (text("contract"), text("trump")) {
                        (Some(contract), Some(trump)) => format!("{contract} {trump}"),
                        (Some(contract), None) => contract.to_string(),
                        _ => kind.label().to_string(),
                    }
                }
                ActionKind::Bid => match fields.get("value").and_then(Value::as_u64) {
                    Some(value) => format!("Bid {value}"),
                    None => kind.label().to_string(),
                },
                ActionKind::Decide => text("choice").unwrap_or(kind.label()).to_string(),
                _ => kind.label().to_string(),
            };
            Some((kind, label))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn declaration_serializes_with_action_tag() {
        let action = PlayerAction::Declare {
            contract: "NORMALNA".into(),
            trump: Some("HEARTS".into()),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"action": "declare", "contract": "NORMALNA", "trump": "HEARTS"})
        );
        assert_eq!(action.kind(), ActionKind::Declare);
    }

    #[test]
    fn unit_actions_serialize_as_bare_tag() {
        assert_eq!(
            serde_json::to_value(PlayerAction::Pass).unwrap(),
            json!({"action": "pass"})
        );
    }

    #[test]
    fn describe_bare_name() {
        let (kind, label) = describe_action(&json!("pass")).unwrap();
        assert_eq!(kind, ActionKind::Pass);
        assert_eq!(label, "Pass");
    }

    #[test]
    fn describe_declaration_object() {
        let (kind, label) = describe_action(&json!({
            "action": "declare",
            "contract": "NORMALNA",
            "trump": "HEARTS"
        }))
        .unwrap();
        assert_eq!(kind, ActionKind::Declare);
        assert_eq!(label, "NORMALNA HEARTS");
    }

    #[test]
    fn describe_accepts_type_key_and_bid_value() {
        let (kind, label) = describe_action(&json!({"type": "bid", "value": 120})).unwrap();
        assert_eq!(kind, ActionKind::Bid);
        assert_eq!(label, "Bid 120");
    }

    #[test]
    fn describe_rejects_unknown_shapes() {
        assert!(describe_action(&json!("shuffle")).is_none());
        assert!(describe_action(&json!(42)).is_none());
        assert!(describe_action(&json!({"card": "AH"})).is_none());
    }
}
