// Game model: snapshot types, submitted actions, reconciliation and the
// phase state machine.

pub mod action;
pub mod phase;
pub mod reconcile;
pub mod snapshot;

pub use action::{ActionKind, PlayerAction};
pub use phase::{
    derive_view, CardSelection, Panel, PhaseEntry, PhaseTracker, PhaseView, SelectionRule,
};
pub use reconcile::{SnapshotRejected, SnapshotSource, StateReconciler};
pub use snapshot::{Card, GameSnapshot, Phase};
