//! User-facing `SessionController` and its read-side `SessionHandle`.
//!
//! The controller owns the session lifecycle. Starting a session spawns
//! a producer task with [`tokio::task::spawn_local`], so controller
//! methods that start sessions must be called from within a
//! [`tokio::task::LocalSet`]. Rendering code reads frames through a
//! [`SessionHandle`] and drives playback with [`drive_playback`].

use std::error::Error;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use fieldstream_core::{
    DomainPolicy, Frame, ParamError, SessionId, SimulationKind, SimulationParameters,
};
use fieldstream_transport::Transport;

use crate::config::{ConfigError, SessionConfig};
use crate::history::{HistorySink, NoHistory};
use crate::metrics::StreamMetrics;
use crate::playback::TickOutcome;
use crate::producer::run_producer;
use crate::state::{SessionState, SessionStatus, Shared};

// ── Error types ──────────────────────────────────────────────────

/// Error starting a session.
#[derive(Clone, Debug, PartialEq)]
pub enum StartError {
    /// The parameters failed validation; no session was started and
    /// the previous one, if any, is untouched.
    InvalidParameters(ParamError),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters(e) => write!(f, "cannot start session: {e}"),
        }
    }
}

impl Error for StartError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidParameters(e) => Some(e),
        }
    }
}

impl From<ParamError> for StartError {
    fn from(e: ParamError) -> Self {
        Self::InvalidParameters(e)
    }
}

// ── SessionHandle ────────────────────────────────────────────────

/// Cheap, cloneable view of a controller's session.
///
/// Handles share state with their controller: they see every frame the
/// producer appends and move the same playback cursor.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Shared,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.borrow();
        f.debug_struct("SessionHandle")
            .field("session", &state.id)
            .field("status", &state.status)
            .field("len", &state.buffer.len())
            .field("cursor", &state.cursor.position())
            .finish()
    }
}

impl SessionHandle {
    /// Lifecycle of the current session.
    pub fn status(&self) -> SessionStatus {
        self.shared.borrow().status
    }

    /// Id of the current session, if one has started since the last reset.
    pub fn session_id(&self) -> Option<SessionId> {
        self.shared.borrow().id
    }

    /// Whether a session is running and has not been stopped or failed.
    /// An exhausted session stays active so its frames keep playing.
    pub fn is_active(&self) -> bool {
        self.shared.borrow().active
    }

    /// Domain of the current session.
    pub fn kind(&self) -> Option<SimulationKind> {
        self.shared.borrow().parameters.as_ref().map(|p| p.kind())
    }

    /// Streaming policy of the current session.
    pub fn policy(&self) -> Option<DomainPolicy> {
        self.shared.borrow().policy
    }

    /// Parameters of the current session.
    pub fn parameters(&self) -> Option<SimulationParameters> {
        self.shared.borrow().parameters.clone()
    }

    /// Number of buffered frames.
    pub fn len(&self) -> usize {
        self.shared.borrow().buffer.len()
    }

    /// Whether no frame is buffered.
    pub fn is_empty(&self) -> bool {
        self.shared.borrow().buffer.is_empty()
    }

    /// Playback cursor position.
    pub fn cursor(&self) -> Option<usize> {
        self.shared.borrow().cursor.position()
    }

    /// Whether playback advances on each tick.
    pub fn is_playing(&self) -> bool {
        self.shared.borrow().cursor.is_playing()
    }

    /// The frame under the cursor.
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        let state = self.shared.borrow();
        let index = state.cursor.position()?;
        state.buffer.get(index).cloned()
    }

    /// Frame at `index`.
    pub fn frame(&self, index: usize) -> Option<Arc<Frame>> {
        self.shared.borrow().buffer.get(index).cloned()
    }

    /// Auxiliary values of frames up to and including the cursor, as
    /// `(index, value)` pairs for trend display.
    pub fn aux_series(&self) -> Vec<(usize, f64)> {
        let state = self.shared.borrow();
        match state.cursor.position() {
            Some(upto) => state.buffer.aux_series(upto),
            None => Vec::new(),
        }
    }

    /// The last error, until dismissed or a new session starts.
    pub fn error(&self) -> Option<String> {
        self.shared.borrow().error.clone()
    }

    /// Clear the displayed error.
    pub fn dismiss_error(&self) {
        self.shared.borrow_mut().error = None;
    }

    /// Counters for the current session.
    pub fn metrics(&self) -> StreamMetrics {
        self.shared.borrow().metrics.clone()
    }

    /// Jump to frame `index` (clamped) and pause.
    pub fn set_cursor(&self, index: usize) -> Option<usize> {
        let mut state = self.shared.borrow_mut();
        let len = state.buffer.len();
        state.cursor.set(index, len)
    }

    /// Move the cursor by `delta` frames (clamped) and pause.
    pub fn step(&self, delta: isize) -> Option<usize> {
        let mut state = self.shared.borrow_mut();
        let len = state.buffer.len();
        state.cursor.step(delta, len)
    }

    /// Resume or pause playback.
    pub fn set_playing(&self, playing: bool) {
        self.shared.borrow_mut().cursor.set_playing(playing);
    }

    /// One consumer-loop step.
    pub fn tick(&self) -> TickOutcome {
        let mut state = self.shared.borrow_mut();
        let SessionState {
            buffer,
            cursor,
            policy,
            status,
            ..
        } = &mut *state;
        match policy {
            Some(policy) => cursor.tick(buffer.len(), status.is_producing(), policy.end),
            None => TickOutcome::Idle,
        }
    }

    /// Whether the owning controller has been dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.borrow().closed
    }
}

/// Shortest period [`drive_playback`] ticks at.
pub const MIN_PLAYBACK_PERIOD: Duration = Duration::from_millis(1);

/// Tick `handle` every `period` until its controller is dropped.
///
/// Missed ticks are skipped rather than replayed in a burst. Periods
/// below [`MIN_PLAYBACK_PERIOD`] are raised to it.
pub async fn drive_playback(handle: SessionHandle, period: Duration) {
    let mut ticker = interval(period.max(MIN_PLAYBACK_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        if handle.is_closed() {
            debug!("playback driver exiting: controller dropped");
            return;
        }
        handle.tick();
    }
}

// ── SessionController ────────────────────────────────────────────

/// Owns the streaming session lifecycle.
///
/// At most one producer serves the controller at a time: [`start`]
/// always stops the previous session first, and a superseded producer
/// discards whatever its in-flight request returns.
///
/// [`start`]: SessionController::start
pub struct SessionController<T, H = NoHistory> {
    handle: SessionHandle,
    transport: Rc<T>,
    history: Rc<H>,
    config: SessionConfig,
    producer: Option<JoinHandle<()>>,
}

impl<T, H> fmt::Debug for SessionController<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("handle", &self.handle)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T> SessionController<T, NoHistory>
where
    T: Transport + 'static,
{
    /// Create a controller that keeps no history.
    pub fn new(transport: T, config: SessionConfig) -> Result<Self, ConfigError> {
        Self::with_history(transport, NoHistory, config)
    }
}

impl<T, H> SessionController<T, H>
where
    T: Transport + 'static,
    H: HistorySink + 'static,
{
    /// Create a controller that records started sessions in `history`.
    pub fn with_history(transport: T, history: H, config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            handle: SessionHandle {
                shared: Shared::default(),
            },
            transport: Rc::new(transport),
            history: Rc::new(history),
            config,
            producer: None,
        })
    }

    /// Start a new session with `parameters`.
    ///
    /// Any running session is stopped and its frames discarded. The
    /// producer loop starts immediately; its first request carries no
    /// seed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a [`tokio::task::LocalSet`].
    pub fn start(&mut self, parameters: SimulationParameters) -> Result<SessionId, StartError> {
        parameters.validate()?;
        self.stop();

        let id = SessionId::next();
        let kind = parameters.kind();
        self.handle.shared.borrow_mut().begin(id, parameters);
        info!(session = %id, %kind, "session started");

        let producer = run_producer(
            Rc::clone(&self.handle.shared),
            Rc::clone(&self.transport),
            Rc::clone(&self.history),
            id,
            self.config.clone(),
        );
        self.producer = Some(tokio::task::spawn_local(producer));
        Ok(id)
    }

    /// Stop the current session, keeping its frames.
    ///
    /// A request already in flight is not cancelled; its response is
    /// discarded when it arrives.
    pub fn stop(&mut self) {
        let stopped = {
            let mut state = self.handle.shared.borrow_mut();
            let id = state.id;
            state.stop().then_some(id).flatten()
        };
        if let Some(id) = stopped {
            info!(session = %id, "session stopped");
        }
        // The producer exits on its own at the next stale check.
        self.producer = None;
    }

    /// Stop and discard everything. Safe to call repeatedly.
    pub fn reset(&mut self) {
        self.stop();
        self.handle.shared.borrow_mut().reset();
    }

    /// Report window focus. Losing focus stops an active session.
    pub fn set_focus(&mut self, focused: bool) {
        if !focused && self.handle.is_active() {
            debug!("focus lost");
            self.stop();
        }
    }

    /// Read-side handle sharing this controller's state.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// The validated configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Shared history sink.
    pub fn history(&self) -> &H {
        &self.history
    }

    /// Spawn [`drive_playback`] at the configured rate.
    ///
    /// # Panics
    ///
    /// Panics if called outside a [`tokio::task::LocalSet`].
    pub fn spawn_playback(&self) -> JoinHandle<()> {
        tokio::task::spawn_local(drive_playback(
            self.handle(),
            self.config.playback_period(),
        ))
    }

    /// Whether the producer task of the latest session has returned.
    pub fn producer_finished(&self) -> bool {
        self.producer.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// See [`SessionHandle::status`].
    pub fn status(&self) -> SessionStatus {
        self.handle.status()
    }

    /// See [`SessionHandle::session_id`].
    pub fn session_id(&self) -> Option<SessionId> {
        self.handle.session_id()
    }

    /// See [`SessionHandle::is_active`].
    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// See [`SessionHandle::parameters`].
    pub fn parameters(&self) -> Option<SimulationParameters> {
        self.handle.parameters()
    }

    /// See [`SessionHandle::len`].
    pub fn len(&self) -> usize {
        self.handle.len()
    }

    /// See [`SessionHandle::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    /// See [`SessionHandle::cursor`].
    pub fn cursor(&self) -> Option<usize> {
        self.handle.cursor()
    }

    /// See [`SessionHandle::is_playing`].
    pub fn is_playing(&self) -> bool {
        self.handle.is_playing()
    }

    /// See [`SessionHandle::current_frame`].
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.handle.current_frame()
    }

    /// See [`SessionHandle::aux_series`].
    pub fn aux_series(&self) -> Vec<(usize, f64)> {
        self.handle.aux_series()
    }

    /// See [`SessionHandle::error`].
    pub fn error(&self) -> Option<String> {
        self.handle.error()
    }

    /// See [`SessionHandle::dismiss_error`].
    pub fn dismiss_error(&self) {
        self.handle.dismiss_error();
    }

    /// See [`SessionHandle::metrics`].
    pub fn metrics(&self) -> StreamMetrics {
        self.handle.metrics()
    }

    /// See [`SessionHandle::set_cursor`].
    pub fn set_cursor(&self, index: usize) -> Option<usize> {
        self.handle.set_cursor(index)
    }

    /// See [`SessionHandle::step`].
    pub fn step(&self, delta: isize) -> Option<usize> {
        self.handle.step(delta)
    }

    /// See [`SessionHandle::set_playing`].
    pub fn set_playing(&self, playing: bool) {
        self.handle.set_playing(playing);
    }

    /// See [`SessionHandle::tick`].
    pub fn tick(&self) -> TickOutcome {
        self.handle.tick()
    }
}

impl<T, H> Drop for SessionController<T, H> {
    fn drop(&mut self) {
        let mut state = self.handle.shared.borrow_mut();
        state.stop();
        state.closed = true;
    }
}
