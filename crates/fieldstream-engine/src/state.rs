//! Session state shared between the controller and its producer task.
//!
//! Everything runs on one thread: the controller and both loops are
//! tasks on the same `LocalSet`. The state lives in an `Rc<RefCell<_>>`
//! and no borrow is ever held across an `.await`, so each task observes
//! it between suspension points only.

use std::cell::RefCell;
use std::rc::Rc;

use fieldstream_core::{DomainPolicy, EndOfStream, SessionId, SimulationParameters, StreamError};

use crate::buffer::FrameBuffer;
use crate::metrics::StreamMetrics;
use crate::playback::PlaybackCursor;

/// Lifecycle of the current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session has started since construction or the last reset.
    #[default]
    Idle,
    /// The producer loop is requesting batches.
    Streaming,
    /// The stream ended without error; frames remain playable.
    Exhausted(EndOfStream),
    /// The producer loop hit a terminal error; see
    /// [`SessionHandle::error`](crate::SessionHandle::error).
    Failed,
    /// Stopped by the user or by focus loss.
    Stopped,
}

impl SessionStatus {
    /// Whether more frames may still arrive.
    pub fn is_producing(self) -> bool {
        self == Self::Streaming
    }
}

pub(crate) type Shared = Rc<RefCell<SessionState>>;

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) id: Option<SessionId>,
    pub(crate) parameters: Option<SimulationParameters>,
    pub(crate) policy: Option<DomainPolicy>,
    pub(crate) active: bool,
    pub(crate) status: SessionStatus,
    pub(crate) buffer: FrameBuffer,
    pub(crate) cursor: PlaybackCursor,
    pub(crate) error: Option<String>,
    pub(crate) metrics: StreamMetrics,
    /// Set when the owning controller is dropped.
    pub(crate) closed: bool,
}

impl SessionState {
    /// Replace everything with a fresh, active session.
    pub(crate) fn begin(&mut self, id: SessionId, parameters: SimulationParameters) {
        self.buffer = FrameBuffer::with_shape(parameters.expected_shape());
        self.policy = Some(parameters.kind().policy());
        self.parameters = Some(parameters);
        self.id = Some(id);
        self.active = true;
        self.status = SessionStatus::Streaming;
        self.cursor.reset();
        self.error = None;
        self.metrics = StreamMetrics::default();
    }

    /// Whether `session` is still the one the producer should serve.
    pub(crate) fn is_current(&self, session: SessionId) -> bool {
        self.active && self.id == Some(session) && self.status.is_producing()
    }

    /// End production without error. The session stays active so its
    /// frames keep playing under the domain's end policy.
    pub(crate) fn finish(&mut self, reason: EndOfStream) {
        self.status = SessionStatus::Exhausted(reason);
    }

    /// End production with a user-visible error.
    pub(crate) fn fail(&mut self, error: &StreamError) {
        self.active = false;
        self.status = SessionStatus::Failed;
        self.error = Some(error.to_string());
    }

    /// Deactivate without touching buffered frames.
    pub(crate) fn stop(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.status = SessionStatus::Stopped;
        self.cursor.set_playing(false);
        true
    }

    /// Back to the pristine idle state.
    pub(crate) fn reset(&mut self) {
        self.stop();
        self.id = None;
        self.parameters = None;
        self.policy = None;
        self.status = SessionStatus::Idle;
        self.buffer.clear();
        self.cursor.reset();
        self.error = None;
        self.metrics = StreamMetrics::default();
    }
}
