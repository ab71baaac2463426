// Per-session event loop.
//
// One task owns every piece of session state: the connection, the
// authoritative snapshot, the action guard, vote tallies, ephemeral
// notifications and all timers. Network calls run in spawned tasks and report
// back over a channel, so the loop keeps handling pushes while a request is
// outstanding. Every handler is synchronous; UI output is queued and flushed
// between events.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use talia_core::consensus::{ConsensusTracker, LobbyChoice, Route};
use talia_core::dispatch::{ActionDispatcher, Completion, DispatchError, Ticket};
use talia_core::ephemeral::{CountdownEvent, EphemeralEventBus};
use talia_core::game::action::PlayerAction;
use talia_core::game::phase::{derive_view, PhaseEntry, PhaseTracker, PhaseView};
use talia_core::game::reconcile::{SnapshotSource, StateReconciler};
use talia_core::game::snapshot::{GameSnapshot, Phase};
use talia_core::protocol::{self, InboundMessage, VoteList};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiError, GameApi};
use crate::config::ClientConfig;
use crate::connection::{
    sleep_until_opt, tick_opt, ConnectionManager, ConnectionSignal, ConnectionState,
};
use crate::transport::Connector;
use crate::ui::{
    Alert, BubbleView, ConnectionBanner, CountdownView, FinalResult, Forfeit, SessionView,
    UiUpdate, UserCommand,
};

const COMMAND_QUEUE: usize = 32;
const UPDATE_QUEUE: usize = 256;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Results of spawned collaborator calls.
#[derive(Debug)]
enum ApiCompletion {
    State {
        seq: u64,
        result: Result<Value, ApiError>,
    },
    Action {
        ticket: Ticket,
        result: Result<(), ApiError>,
    },
    NextRoundVote(Result<(), ApiError>),
    LobbyVote(Result<(), ApiError>),
    Lobby(Result<Value, ApiError>),
    TrickFinalized(Result<(), ApiError>),
    Leave(Result<(), ApiError>),
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// The renderer's end of a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<UserCommand>,
    updates: mpsc::Receiver<UiUpdate>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl SessionHandle {
    pub async fn send(&self, command: UserCommand) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .await
            .ok()
            .context("session has ended")
    }

    /// Next update, or `None` once the session has ended.
    pub async fn next_update(&mut self) -> Option<UiUpdate> {
        self.updates.recv().await
    }

    pub fn try_next_update(&mut self) -> Option<UiUpdate> {
        self.updates.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Tear the session down and wait for it to finish.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let SessionHandle {
            commands,
            updates,
            task,
        } = self;
        let _ = commands.send(UserCommand::Shutdown).await;
        // A session blocked on a full update queue must not stall shutdown.
        drop(updates);

        let abort = task.abort_handle();
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
            Ok(joined) => joined.context("session task panicked")?,
            Err(_) => {
                warn!("session did not shut down within {SHUTDOWN_TIMEOUT:?}, aborting");
                abort.abort();
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

pub struct GameSession {
    config: ClientConfig,
    api: Arc<dyn GameApi>,
    session_id: String,
    participant_id: String,
    /// Cleared at teardown; late completions become no-ops.
    active: bool,

    conn: ConnectionManager,
    reconciler: StateReconciler,
    phases: PhaseTracker,
    dispatcher: ActionDispatcher,
    consensus: ConsensusTracker,
    ephemeral: EphemeralEventBus,

    poll: Option<Interval>,
    countdown_tick: Option<Interval>,
    trick_timer: Option<Instant>,
    finalize_requested: bool,

    pull_in_flight: bool,
    pull_queued: bool,
    /// Number of state pulls started so far.
    pulls_started: u64,
    /// Pulls numbered at or below this were started before the outstanding
    /// action was accepted and cannot reflect it.
    release_after: u64,

    banner: ConnectionBanner,
    final_result: Option<FinalResult>,

    commands: mpsc::Receiver<UserCommand>,
    updates: mpsc::Sender<UiUpdate>,
    completions_tx: mpsc::UnboundedSender<ApiCompletion>,
    completions_rx: mpsc::UnboundedReceiver<ApiCompletion>,
    outbox: Vec<UiUpdate>,
    dirty: bool,
    navigate_to: Option<Route>,
}

impl GameSession {
    /// Spawn a session for `participant_id` in `session_id`.
    pub fn start(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        api: Arc<dyn GameApi>,
        session_id: impl Into<String>,
        participant_id: impl Into<String>,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (update_tx, update_rx) = mpsc::channel(UPDATE_QUEUE);
        let session = GameSession::new(
            config,
            connector,
            api,
            session_id.into(),
            participant_id.into(),
            command_rx,
            update_tx,
        );
        let task = tokio::spawn(session.run());
        SessionHandle {
            commands: command_tx,
            updates: update_rx,
            task,
        }
    }

    fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        api: Arc<dyn GameApi>,
        session_id: String,
        participant_id: String,
        commands: mpsc::Receiver<UserCommand>,
        updates: mpsc::Sender<UiUpdate>,
    ) -> Self {
        let conn = ConnectionManager::new(
            connector,
            &config.connection,
            session_id.clone(),
            participant_id.clone(),
        );
        let ephemeral =
            EphemeralEventBus::new(config.ui.bubble_ttl(), config.ui.disconnect_timeout_secs);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        GameSession {
            consensus: ConsensusTracker::new(participant_id.clone()),
            config,
            api,
            session_id,
            participant_id,
            active: true,
            conn,
            reconciler: StateReconciler::new(),
            phases: PhaseTracker::new(),
            dispatcher: ActionDispatcher::new(),
            ephemeral,
            poll: None,
            countdown_tick: None,
            trick_timer: None,
            finalize_requested: false,
            pull_in_flight: false,
            pull_queued: false,
            pulls_started: 0,
            release_after: 0,
            banner: ConnectionBanner::new(ConnectionState::Disconnected, 0, None),
            final_result: None,
            commands,
            updates,
            completions_tx,
            completions_rx,
            outbox: Vec::new(),
            dirty: true,
            navigate_to: None,
        }
    }

    /// Run until the renderer leaves, a navigation happens, or the handle is
    /// dropped. Always finishes with the ordered teardown.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            session = %self.session_id,
            participant = %self.participant_id,
            "session started"
        );

        if let Some(signal) = self.conn.connect() {
            self.on_connection_signal(signal);
        }
        self.request_pull();
        self.poll = Some(repeating(self.config.sync.poll_interval()));

        loop {
            if !self.flush().await {
                debug!("renderer gone");
                break;
            }
            if let Some(route) = self.navigate_to {
                info!(?route, "navigating away from game");
                break;
            }

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(UserCommand::Shutdown) | None => {
                        info!("shutdown requested");
                        break;
                    }
                    Some(command) => self.on_command(command),
                },
                signal = self.conn.next_signal() => self.on_connection_signal(signal),
                Some(done) = self.completions_rx.recv() => self.on_completion(done),
                _ = tick_opt(&mut self.poll) => self.request_pull(),
                _ = tick_opt(&mut self.countdown_tick) => self.on_countdown_tick(),
                _ = sleep_until_opt(self.trick_timer) => self.on_trick_timer(),
                _ = sleep_until_opt(self.ephemeral.next_expiry()) => self.on_bubble_expiry(),
            }
        }

        self.teardown().await;
        Ok(())
    }

    /// Ordered teardown: inactive scope, reconnect and heartbeat timers, poll
    /// and other session timers, then detach and close.
    async fn teardown(&mut self) {
        self.active = false;
        self.conn.deactivate();
        self.conn.cancel_timers();
        self.poll = None;
        self.countdown_tick = None;
        self.trick_timer = None;
        self.conn.disconnect().await;
        info!(session = %self.session_id, "session torn down");
    }

    // -- output -------------------------------------------------------------

    fn alert(&mut self, message: impl Into<String>) {
        self.outbox.push(UiUpdate::Alert(Alert::new(message)));
    }

    fn navigate(&mut self, route: Route) {
        if self.navigate_to.is_some() {
            return;
        }
        self.active = false;
        self.conn.deactivate();
        self.navigate_to = Some(route);
        self.outbox.push(UiUpdate::Navigate(route));
    }

    /// Send queued alerts/navigation, then the latest view if anything changed.
    /// Returns `false` once the renderer has gone away.
    async fn flush(&mut self) -> bool {
        if self.dirty && self.navigate_to.is_none() {
            self.dirty = false;
            match self.updates.try_send(UiUpdate::View(Box::new(self.view()))) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!("update queue full, view deferred");
                    self.dirty = true;
                }
                Err(TrySendError::Closed(_)) => return false,
            }
        }
        for update in std::mem::take(&mut self.outbox) {
            if self.updates.send(update).await.is_err() {
                return false;
            }
        }
        true
    }

    fn current_phase_view(&self) -> PhaseView {
        let empty = GameSnapshot::default();
        let snapshot = self.reconciler.current().unwrap_or(&empty);
        let mut view = derive_view(snapshot, &self.participant_id);
        if self.dispatcher.is_pending() {
            view.interactive = false;
        }
        view
    }

    fn view(&self) -> SessionView {
        SessionView {
            connection: self.banner.clone(),
            phase: self.current_phase_view(),
            action_pending: self.dispatcher.is_pending(),
            snapshot: self.reconciler.current().cloned(),
            bubbles: self.ephemeral.bubbles().iter().map(BubbleView::from).collect(),
            countdown: self.ephemeral.countdown().map(CountdownView::from),
            next_round: self.consensus.next_round().clone(),
            voted_next_round: self.consensus.has_voted_next_round(),
            lobby: self.consensus.lobby().clone(),
            lobby_choice: self.consensus.lobby_choice(),
            final_result: self.final_result.clone(),
        }
    }

    // -- collaborator calls -------------------------------------------------

    /// Run a collaborator call in its own task, bounded by the request
    /// timeout, and report the outcome as a completion.
    fn spawn_call<T, F, Fut, C>(&self, operation: &'static str, call: F, complete: C)
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn GameApi>, String) -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        C: FnOnce(Result<T, ApiError>) -> ApiCompletion + Send + 'static,
    {
        let limit = self.config.sync.request_timeout();
        let fut = call(Arc::clone(&self.api), self.session_id.clone());
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(ApiError::Timeout {
                    operation,
                    after: limit,
                }),
            };
            // The session may be gone by now; nothing to report to.
            let _ = tx.send(complete(result));
        });
    }

    /// Fetch the full state, coalescing with a pull already in flight.
    fn request_pull(&mut self) {
        if !self.active {
            return;
        }
        if self.pull_in_flight {
            self.pull_queued = true;
            return;
        }
        self.pull_in_flight = true;
        self.pulls_started += 1;
        let seq = self.pulls_started;
        self.spawn_call(
            "fetch_state",
            |api, sid| async move { api.fetch_state(&sid).await },
            move |result| ApiCompletion::State { seq, result },
        );
    }

    // -- connection ---------------------------------------------------------

    fn on_connection_signal(&mut self, signal: ConnectionSignal) {
        match signal {
            ConnectionSignal::Connecting { attempt } => {
                self.banner = ConnectionBanner::new(self.conn.state(), attempt, None);
            }
            ConnectionSignal::Opened => {
                self.banner = ConnectionBanner::new(self.conn.state(), 0, None);
                // Cover anything missed while offline.
                self.request_pull();
            }
            ConnectionSignal::Lost { attempt, retry_in } => {
                self.banner = ConnectionBanner::new(self.conn.state(), attempt, retry_in);
            }
            ConnectionSignal::Frame(text) => {
                self.on_frame(&text);
                return;
            }
        }
        self.dirty = true;
    }

    fn on_frame(&mut self, text: &str) {
        let message = match protocol::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("dropping unparseable frame: {e}");
                return;
            }
        };
        debug!(kind = message.kind(), "inbound");

        match message {
            InboundMessage::Pong => {
                self.conn.record_pong();
                return;
            }
            InboundMessage::Connected => {}
            InboundMessage::StateUpdate { data } => {
                self.apply_snapshot(data, SnapshotSource::Push, None)
            }
            InboundMessage::ActionPerformed(notice) | InboundMessage::BotAction(notice) => {
                let now = Instant::now();
                let (phase, players) = match self.reconciler.current() {
                    Some(s) => (s.phase.as_ref(), s.players.as_slice()),
                    None => (None, &[][..]),
                };
                self.ephemeral.on_action(
                    &notice.player,
                    &notice.action,
                    phase,
                    players,
                    &self.participant_id,
                    now,
                );
                self.request_pull();
            }
            InboundMessage::TrickFinalized | InboundMessage::PlayerLeft { .. } => {
                self.request_pull();
            }
            InboundMessage::NextRoundStarted => {
                self.consensus.reset_next_round();
                self.request_pull();
            }
            InboundMessage::NextRoundVote {
                votes,
                total_players,
                ready_players,
            } => {
                if ready_players.is_some_and(|n| n != votes.len()) {
                    debug!(
                        ?ready_players,
                        voters = votes.len(),
                        "ready count differs from vote set"
                    );
                }
                self.consensus.apply_next_round_vote(&votes, total_players);
            }
            InboundMessage::ReturnToLobbyVote {
                votes_stay,
                votes_leave,
                total_players,
            } => self
                .consensus
                .apply_lobby_vote(&votes_stay, &votes_leave, total_players),
            InboundMessage::ReturnedToLobby {
                staying_players,
                leaving_players,
            } => self.on_returned_to_lobby(&staying_players, &leaving_players),
            InboundMessage::LobbyClosed => {
                self.alert("The lobby has been closed");
                self.navigate(Route::Dashboard);
            }
            InboundMessage::PlayerStaying { player } => self.consensus.player_staying(&player),
            InboundMessage::PlayerLeaving { player } => self.consensus.player_leaving(&player),
            InboundMessage::PlayerDisconnected {
                player,
                reconnect_timeout,
            } => {
                let started = self.ephemeral.start_countdown(
                    &player,
                    reconnect_timeout,
                    &self.participant_id,
                    Instant::now(),
                );
                if started {
                    self.countdown_tick = Some(repeating(Duration::from_secs(1)));
                }
            }
            InboundMessage::PlayerReconnected { player } => {
                if self.ephemeral.clear_countdown_for(&player) {
                    self.countdown_tick = None;
                }
            }
            InboundMessage::GameForfeit {
                disconnected_player,
                winners,
                reason,
            } => {
                self.ephemeral.cancel_countdown();
                self.countdown_tick = None;
                info!(%disconnected_player, ?winners, "game forfeited");
                self.final_result = Some(FinalResult {
                    winners,
                    scores: self.current_scores(),
                    forfeit: Some(Forfeit {
                        disconnected_player,
                        reason,
                    }),
                });
                self.request_pull();
            }
            InboundMessage::GameEnded {
                winner,
                final_scores,
            } => {
                let scores = if final_scores.is_empty() {
                    self.current_scores()
                } else {
                    final_scores
                };
                self.final_result = Some(FinalResult {
                    winners: winner.map(|w| w.participants()).unwrap_or_default(),
                    scores,
                    forfeit: None,
                });
            }
            InboundMessage::Unknown => {
                debug!("ignoring unknown message type");
                return;
            }
        }
        self.dirty = true;
    }

    fn current_scores(&self) -> std::collections::BTreeMap<String, i64> {
        self.reconciler
            .current()
            .map(|s| s.scores.clone())
            .unwrap_or_default()
    }

    fn on_returned_to_lobby(&mut self, staying: &VoteList, leaving: &VoteList) {
        match self.consensus.route_for(staying, leaving) {
            (Route::Lobby, _) => {
                // Make sure the lobby still exists before sending anyone there.
                self.spawn_call(
                    "fetch_lobby",
                    |api, sid| async move { api.fetch_lobby(&sid).await },
                    ApiCompletion::Lobby,
                );
            }
            (Route::Dashboard, _) => self.navigate(Route::Dashboard),
        }
    }

    // -- snapshots ----------------------------------------------------------

    /// Offer a snapshot to the reconciler. `pull_seq` numbers snapshots that
    /// came from a state pull.
    fn apply_snapshot(&mut self, raw: Value, source: SnapshotSource, pull_seq: Option<u64>) {
        let snapshot = match self.reconciler.offer_value(raw, source) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(?source, "snapshot rejected: {e}");
                return;
            }
        };

        let entries = self.phases.observe(snapshot);
        let trick_complete =
            snapshot.phase == Some(Phase::TrickInProgress) && snapshot.trick_complete;
        let fallback_scores = snapshot.scores.clone();

        if pull_seq.map_or(true, |seq| seq > self.release_after) {
            self.dispatcher.on_snapshot();
        }

        for entry in entries {
            match entry {
                PhaseEntry::RoundSummary { round } => {
                    debug!(?round, "round summary entered, new vote epoch");
                    self.consensus.reset_epoch();
                }
                PhaseEntry::MatchEnded => {
                    info!("match ended");
                    if self.final_result.is_none() {
                        self.final_result = Some(FinalResult {
                            winners: Vec::new(),
                            scores: fallback_scores.clone(),
                            forfeit: None,
                        });
                    }
                }
            }
        }

        if trick_complete {
            if self.trick_timer.is_none() && !self.finalize_requested {
                self.trick_timer = Some(Instant::now() + self.config.ui.trick_display());
            }
        } else {
            self.trick_timer = None;
            self.finalize_requested = false;
        }
        self.dirty = true;
    }

    // -- commands -----------------------------------------------------------

    fn on_command(&mut self, command: UserCommand) {
        match command {
            UserCommand::Submit(action) => self.submit(action),
            UserCommand::VoteNextRound => {
                if self.consensus.cast_next_round() {
                    self.spawn_call(
                        "vote_next_round",
                        |api, sid| async move { api.vote_next_round(&sid).await },
                        ApiCompletion::NextRoundVote,
                    );
                } else {
                    debug!("next-round vote already cast");
                }
            }
            UserCommand::VoteReturnToLobby(choice) => self.vote_lobby(choice),
            UserCommand::ManualReconnect => {
                self.conn.manual_reconnect();
                self.banner = ConnectionBanner::new(
                    self.conn.state(),
                    self.conn.attempt(),
                    self.conn.retry_in(),
                );
            }
            UserCommand::FinalizeTrick => self.finalize_trick(),
            UserCommand::Leave => {
                self.spawn_call(
                    "leave_to_dashboard",
                    |api, sid| async move { api.leave_to_dashboard(&sid).await },
                    ApiCompletion::Leave,
                );
            }
            // Handled by the run loop.
            UserCommand::Shutdown => {}
        }
        self.dirty = true;
    }

    fn submit(&mut self, action: PlayerAction) {
        let view = self.current_phase_view();
        if !self.dispatcher.is_pending() && !view.actions.contains(&action.kind()) {
            warn!(
                kind = ?action.kind(),
                panel = ?view.panel,
                "action not open in this phase, ignored"
            );
            return;
        }

        match self.dispatcher.begin(&action, view.selection) {
            Ok(ticket) => {
                self.spawn_call(
                    "submit_action",
                    move |api, sid| async move { api.submit_action(&sid, &action).await },
                    move |result| ApiCompletion::Action { ticket, result },
                );
            }
            Err(DispatchError::Busy) => debug!("action already in flight, submit ignored"),
            Err(e @ DispatchError::InvalidSelection { .. }) => self.alert(e.to_string()),
        }
    }

    fn vote_lobby(&mut self, choice: LobbyChoice) {
        if !self.consensus.cast_lobby(choice) {
            debug!(?choice, "lobby decision already cast");
            return;
        }
        self.spawn_call(
            "vote_return_to_lobby",
            move |api, sid| async move { api.vote_return_to_lobby(&sid, choice).await },
            ApiCompletion::LobbyVote,
        );
    }

    fn finalize_trick(&mut self) {
        self.trick_timer = None;
        self.finalize_requested = true;
        self.spawn_call(
            "finalize_trick",
            |api, sid| async move { api.finalize_trick(&sid).await },
            ApiCompletion::TrickFinalized,
        );
    }

    // -- timers -------------------------------------------------------------

    fn on_countdown_tick(&mut self) {
        match self.ephemeral.tick_countdown(Instant::now()) {
            Some(CountdownEvent::Tick { .. }) => {}
            Some(CountdownEvent::Expired { player }) => {
                info!(%player, "reconnect window elapsed");
                self.countdown_tick = None;
                self.request_pull();
            }
            None => self.countdown_tick = None,
        }
        self.dirty = true;
    }

    fn on_trick_timer(&mut self) {
        debug!("trick display elapsed, finalizing");
        self.finalize_trick();
    }

    fn on_bubble_expiry(&mut self) {
        if self.ephemeral.sweep(Instant::now()) {
            self.dirty = true;
        }
    }

    // -- completions --------------------------------------------------------

    fn on_completion(&mut self, done: ApiCompletion) {
        if !self.active {
            debug!(?done, "completion after teardown ignored");
            return;
        }
        match done {
            ApiCompletion::State { seq, result } => {
                self.pull_in_flight = false;
                match result {
                    Ok(raw) => self.apply_snapshot(raw, SnapshotSource::Poll, Some(seq)),
                    Err(e) => warn!("state pull failed: {e}"),
                }
                if self.pull_queued {
                    self.pull_queued = false;
                    self.request_pull();
                }
            }
            ApiCompletion::Action { ticket, result } => {
                match self
                    .dispatcher
                    .complete(ticket, result.map_err(|e| e.user_message()))
                {
                    Completion::Accepted => {
                        self.release_after = self.pulls_started;
                        self.request_pull();
                    }
                    Completion::Failed(message) => {
                        warn!(%message, "action rejected");
                        self.alert(message);
                    }
                    Completion::Stale => debug!("stale action completion ignored"),
                }
            }
            ApiCompletion::NextRoundVote(Err(e)) => {
                warn!("next-round vote failed: {e}");
                self.consensus.retract_next_round();
                self.alert(e.user_message());
            }
            ApiCompletion::LobbyVote(Err(e)) => {
                warn!("lobby vote failed: {e}");
                self.consensus.retract_lobby();
                self.alert(e.user_message());
            }
            ApiCompletion::NextRoundVote(Ok(())) | ApiCompletion::LobbyVote(Ok(())) => {}
            ApiCompletion::Lobby(Ok(_)) => self.navigate(Route::Lobby),
            ApiCompletion::Lobby(Err(e)) => {
                warn!("lobby unavailable: {e}");
                self.alert("The lobby is no longer available");
                self.navigate(Route::Dashboard);
            }
            ApiCompletion::TrickFinalized(result) => {
                if let Err(e) = result {
                    warn!("finalize trick failed: {e}");
                    // Let the next snapshot that still shows the trick retry.
                    self.finalize_requested = false;
                }
                self.request_pull();
            }
            ApiCompletion::Leave(Ok(())) => self.navigate(Route::Dashboard),
            ApiCompletion::Leave(Err(e)) => {
                warn!("leave failed: {e}");
                self.alert(e.user_message());
            }
        }
        self.dirty = true;
    }
}

/// Interval whose first tick is one period from now.
fn repeating(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
