// Realtime channel lifecycle: connect, heartbeat, pong watchdog, reconnect
// backoff and deliberate teardown.
//
// Each open channel lives in its own link task that forwards frames back to
// the manager tagged with a generation number. Detaching bumps the
// generation, so anything an old link still reports is ignored and can never
// schedule a reconnect after teardown.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use talia_core::backoff::Backoff;
use talia_core::protocol::OutboundMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::transport::Connector;

const LINK_QUEUE: usize = 32;
const CLOSE_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Only Disconnected -> Connecting -> Connected -> Disconnected moves are
    /// legal, plus Connecting -> Disconnected when an open attempt fails.
    fn can_move_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
        )
    }
}

/// What the manager reports to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSignal {
    /// An open attempt started.
    Connecting { attempt: u32 },
    /// The channel is open. The session pulls a full snapshot.
    Opened,
    /// A text frame from the server.
    Frame(String),
    /// The channel closed without being asked to. `retry_in` is the scheduled
    /// reconnect delay, or `None` when the session is no longer active.
    Lost {
        attempt: u32,
        retry_in: Option<Duration>,
    },
}

// ---------------------------------------------------------------------------
// Link task
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum LinkCommand {
    Send(String),
    Close,
}

#[derive(Debug)]
enum LinkEvent {
    Opened,
    Frame(String),
    Closed { reason: Option<String> },
}

#[derive(Debug)]
struct LinkSignal {
    generation: u64,
    event: LinkEvent,
}

struct ActiveLink {
    generation: u64,
    outbound: mpsc::Sender<LinkCommand>,
    task: JoinHandle<()>,
}

async fn run_link(
    connector: Arc<dyn Connector>,
    session_id: String,
    participant_id: String,
    generation: u64,
    mut commands: mpsc::Receiver<LinkCommand>,
    signals: mpsc::UnboundedSender<LinkSignal>,
) {
    let emit = |event: LinkEvent| {
        let _ = signals.send(LinkSignal { generation, event });
    };

    let mut channel = match connector.open(&session_id, &participant_id).await {
        Ok(channel) => channel,
        Err(e) => {
            warn!(generation, "open failed: {e}");
            emit(LinkEvent::Closed {
                reason: Some(e.to_string()),
            });
            return;
        }
    };
    emit(LinkEvent::Opened);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(LinkCommand::Send(text)) => {
                    if let Err(e) = channel.send(text).await {
                        emit(LinkEvent::Closed { reason: Some(e.to_string()) });
                        return;
                    }
                }
                Some(LinkCommand::Close) | None => {
                    if let Err(e) = channel.close().await {
                        debug!(generation, "close failed: {e}");
                    }
                    return;
                }
            },
            incoming = channel.recv() => match incoming {
                Some(Ok(text)) => emit(LinkEvent::Frame(text)),
                Some(Err(e)) => {
                    emit(LinkEvent::Closed { reason: Some(e.to_string()) });
                    return;
                }
                None => {
                    emit(LinkEvent::Closed { reason: None });
                    return;
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    session_id: String,
    participant_id: String,

    state: ConnectionState,
    attempt: u32,
    last_heartbeat: Option<Instant>,
    /// Set just before a locally initiated close.
    deliberate: bool,
    /// Cleared when the owning session tears down.
    active: bool,

    backoff: Backoff,
    heartbeat_period: Duration,
    pong_timeout: Option<Duration>,
    settle: Duration,

    heartbeat: Option<Interval>,
    reconnect_at: Option<Instant>,

    generation: u64,
    link: Option<ActiveLink>,
    signals_tx: mpsc::UnboundedSender<LinkSignal>,
    signals_rx: mpsc::UnboundedReceiver<LinkSignal>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        config: &ConnectionConfig,
        session_id: impl Into<String>,
        participant_id: impl Into<String>,
    ) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        ConnectionManager {
            connector,
            session_id: session_id.into(),
            participant_id: participant_id.into(),
            state: ConnectionState::Disconnected,
            attempt: 0,
            last_heartbeat: None,
            deliberate: false,
            active: true,
            backoff: config.backoff(),
            heartbeat_period: config.heartbeat(),
            pong_timeout: config.pong_timeout(),
            settle: config.settle(),
            heartbeat: None,
            reconnect_at: None,
            generation: 0,
            link: None,
            signals_tx,
            signals_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_heartbeat(&self) -> Option<Instant> {
        self.last_heartbeat
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_at.is_some()
    }

    /// Time left until the scheduled reconnect, if any.
    pub fn retry_in(&self) -> Option<Duration> {
        self.reconnect_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn transition(&mut self, next: ConnectionState) {
        if !self.state.can_move_to(next) {
            warn!(from = ?self.state, to = ?next, "illegal connection transition ignored");
            return;
        }
        debug!(from = ?self.state, to = ?next, "connection state");
        self.state = next;
    }

    /// Open the channel. No-op while already connecting or connected.
    pub fn connect(&mut self) -> Option<ConnectionSignal> {
        if self.state != ConnectionState::Disconnected || !self.active {
            return None;
        }
        self.deliberate = false;
        self.reconnect_at = None;
        Some(self.open_link())
    }

    fn open_link(&mut self) -> ConnectionSignal {
        let _stale = self.detach();
        self.generation += 1;
        let (outbound, commands) = mpsc::channel(LINK_QUEUE);
        let task = tokio::spawn(run_link(
            Arc::clone(&self.connector),
            self.session_id.clone(),
            self.participant_id.clone(),
            self.generation,
            commands,
            self.signals_tx.clone(),
        ));
        self.link = Some(ActiveLink {
            generation: self.generation,
            outbound,
            task,
        });
        self.transition(ConnectionState::Connecting);
        info!(
            session = %self.session_id,
            attempt = self.attempt,
            "connecting"
        );
        ConnectionSignal::Connecting {
            attempt: self.attempt,
        }
    }

    /// Drop the current link without reporting its close. Its task is asked
    /// to close the channel normally; stragglers are ignored by generation.
    fn detach(&mut self) -> Option<JoinHandle<()>> {
        let link = self.link.take()?;
        self.generation += 1;
        if link.outbound.try_send(LinkCommand::Close).is_err() {
            link.task.abort();
        }
        Some(link.task)
    }

    /// Wait for the next event worth reporting.
    ///
    /// Cancel-safe: all state changes happen synchronously after a branch
    /// completes, so dropping this future loses nothing.
    pub async fn next_signal(&mut self) -> ConnectionSignal {
        loop {
            let signal = tokio::select! {
                Some(link_signal) = self.signals_rx.recv() => self.on_link_signal(link_signal),
                _ = tick_opt(&mut self.heartbeat) => self.on_heartbeat(),
                _ = sleep_until_opt(self.reconnect_at) => self.on_reconnect_timer(),
            };
            if let Some(signal) = signal {
                return signal;
            }
        }
    }

    fn on_link_signal(&mut self, signal: LinkSignal) -> Option<ConnectionSignal> {
        let current = self.link.as_ref().map(|l| l.generation);
        if current != Some(signal.generation) {
            debug!(
                generation = signal.generation,
                event = ?signal.event,
                "ignoring signal from detached link"
            );
            return None;
        }

        match signal.event {
            LinkEvent::Opened => {
                self.transition(ConnectionState::Connected);
                self.attempt = 0;
                self.reconnect_at = None;
                self.last_heartbeat = Some(Instant::now());
                self.start_heartbeat();
                info!(session = %self.session_id, "connected");
                Some(ConnectionSignal::Opened)
            }
            LinkEvent::Frame(text) => Some(ConnectionSignal::Frame(text)),
            LinkEvent::Closed { reason } => {
                self.link = None;
                Some(self.on_closed(reason))
            }
        }
    }

    fn on_closed(&mut self, reason: Option<String>) -> ConnectionSignal {
        self.heartbeat = None;
        self.transition(ConnectionState::Disconnected);

        if !self.active {
            info!(?reason, "channel closed after session ended");
            return ConnectionSignal::Lost {
                attempt: self.attempt,
                retry_in: None,
            };
        }

        let delay = self.backoff.delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.reconnect_at = Some(Instant::now() + delay);
        warn!(
            ?reason,
            attempt = self.attempt,
            retry_ms = delay.as_millis() as u64,
            "connection lost, reconnect scheduled"
        );
        ConnectionSignal::Lost {
            attempt: self.attempt,
            retry_in: Some(delay),
        }
    }

    fn start_heartbeat(&mut self) {
        let mut interval = tokio::time::interval_at(
            Instant::now() + self.heartbeat_period,
            self.heartbeat_period,
        );
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Replacing the option drops any previous heartbeat.
        self.heartbeat = Some(interval);
    }

    fn on_heartbeat(&mut self) -> Option<ConnectionSignal> {
        if self.state != ConnectionState::Connected {
            self.heartbeat = None;
            return None;
        }

        if let (Some(timeout), Some(last)) = (self.pong_timeout, self.last_heartbeat) {
            if last.elapsed() >= timeout {
                warn!(
                    silent_ms = last.elapsed().as_millis() as u64,
                    "no pong within timeout, forcing reconnect"
                );
                // Not deliberate: this close goes through the backoff path.
                if let Some(link) = self.link.take() {
                    self.generation += 1;
                    link.task.abort();
                }
                return Some(self.on_closed(Some("pong timeout".into())));
            }
        }

        if let Some(link) = &self.link {
            let ping = match OutboundMessage::Ping.encode() {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to encode heartbeat: {e}");
                    return None;
                }
            };
            debug!("heartbeat ping");
            if link.outbound.try_send(LinkCommand::Send(ping)).is_err() {
                debug!("link queue full, heartbeat skipped");
            }
        }
        None
    }

    fn on_reconnect_timer(&mut self) -> Option<ConnectionSignal> {
        self.reconnect_at = None;
        if !self.active || self.deliberate || self.state != ConnectionState::Disconnected {
            return None;
        }
        Some(self.open_link())
    }

    /// Note a pong from the server.
    pub fn record_pong(&mut self) {
        self.last_heartbeat = Some(Instant::now());
    }

    /// User-requested reconnect: reset the attempt counter, force-close any
    /// half-open channel and reconnect after the settle delay.
    pub fn manual_reconnect(&mut self) {
        if !self.active {
            return;
        }
        info!(previous_attempt = self.attempt, "manual reconnect");
        self.reconnect_at = None;
        self.attempt = 0;
        self.heartbeat = None;
        self.deliberate = false;
        if self.detach().is_some() {
            self.transition(ConnectionState::Disconnected);
        }
        self.reconnect_at = Some(Instant::now() + self.settle);
    }

    /// Mark the owning session inactive. Closes after this never reconnect.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Cancel the reconnect timer, then the heartbeat.
    pub fn cancel_timers(&mut self) {
        self.reconnect_at = None;
        self.heartbeat = None;
    }

    /// Deliberate teardown: cancel timers, detach, then close normally.
    pub async fn disconnect(&mut self) {
        self.cancel_timers();
        self.deliberate = true;
        let Some(task) = self.detach() else {
            return;
        };
        self.transition(ConnectionState::Disconnected);

        let abort = task.abort_handle();
        if tokio::time::timeout(CLOSE_GRACE, task).await.is_err() {
            debug!("link did not close in time, aborting");
            abort.abort();
        }
        info!(session = %self.session_id, "disconnected");
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            link.task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Timer helpers
// ---------------------------------------------------------------------------

/// Tick an optional interval; pending forever when unset.
pub(crate) async fn tick_opt(interval: &mut Option<Interval>) -> Instant {
    match interval {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

/// Sleep until an optional deadline; pending forever when unset.
pub(crate) async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
