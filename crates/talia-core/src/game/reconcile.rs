// Reconciliation of pushed and polled snapshots into one authoritative state.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::snapshot::GameSnapshot;

/// Where a candidate snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Realtime `state_update` push.
    Push,
    /// Periodic or on-demand fetch of the full state.
    Poll,
}

#[derive(Debug, Error)]
pub enum SnapshotRejected {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("snapshot carries neither a phase nor hand/table data")]
    MissingDiscriminator,

    #[error("stale snapshot version {incoming} (current {current})")]
    Stale { incoming: u64, current: u64 },
}

/// Sole owner of the current [`GameSnapshot`].
///
/// Candidates are applied in receipt order by total replacement. A candidate
/// is dropped, leaving the previous state untouched, when it fails to parse,
/// lacks both a phase and hand/table data, or carries a version lower than
/// the current one. Snapshots without a version are always ordered by arrival.
#[derive(Debug, Default)]
pub struct StateReconciler {
    current: Option<GameSnapshot>,
    accepted: u64,
    rejected: u64,
}

impl StateReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&GameSnapshot> {
        self.current.as_ref()
    }

    /// Number of snapshots accepted so far.
    pub fn accepted_count(&self) -> u64 {
        self.accepted
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    /// Parse a raw JSON payload and offer it as a candidate.
    pub fn offer_value(
        &mut self,
        raw: Value,
        source: SnapshotSource,
    ) -> Result<&GameSnapshot, SnapshotRejected> {
        match serde_json::from_value::<GameSnapshot>(raw) {
            Ok(candidate) => self.offer(candidate, source),
            Err(e) => {
                self.rejected += 1;
                Err(SnapshotRejected::Malformed(e))
            }
        }
    }

    /// Offer an already-parsed candidate.
    pub fn offer(
        &mut self,
        candidate: GameSnapshot,
        source: SnapshotSource,
    ) -> Result<&GameSnapshot, SnapshotRejected> {
        if let Err(reason) = self.check(&candidate) {
            self.rejected += 1;
            return Err(reason);
        }

        self.accepted += 1;
        debug!(
            ?source,
            phase = ?candidate.phase,
            version = ?candidate.version,
            "accepted snapshot #{}",
            self.accepted
        );
        Ok(self.current.insert(candidate))
    }

    fn check(&self, candidate: &GameSnapshot) -> Result<(), SnapshotRejected> {
        if !candidate.has_discriminator() {
            return Err(SnapshotRejected::MissingDiscriminator);
        }
        let current_version = self.current.as_ref().and_then(|s| s.version);
        if let (Some(incoming), Some(current)) = (candidate.version, current_version) {
            if incoming < current {
                return Err(SnapshotRejected::Stale { incoming, current });
            }
        }
        Ok(())
    }
}
