//! Streaming engine for remote, stateless simulation solvers.
//!
//! A solver computes a bounded batch of frames per call and keeps no
//! state between calls. This crate turns it into an open-ended stream:
//!
//! - A **producer loop** repeatedly calls the solver, seeding each
//!   request with the tail of the [`FrameBuffer`], and appends the
//!   result after [`join`]ing it to the seed.
//! - A **consumer loop** ([`drive_playback`]) advances a
//!   [`PlaybackCursor`] over the buffer at a fixed rate, holding at the
//!   end while more frames may arrive.
//! - A [`SessionController`] starts, stops, and resets sessions and
//!   guarantees at most one producer per controller.
//!
//! All three run as tasks on a single-threaded [`tokio::task::LocalSet`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod history;
pub mod join;
pub mod metrics;
pub mod playback;
pub mod session;

mod producer;
mod state;

pub use buffer::FrameBuffer;
pub use config::{ConfigError, SessionConfig};
pub use history::{HistoryEntry, HistorySink, NoHistory, RecentHistory};
pub use join::{join, Joined};
pub use metrics::StreamMetrics;
pub use playback::{PlaybackCursor, TickOutcome};
pub use session::{drive_playback, MIN_PLAYBACK_PERIOD, SessionController, SessionHandle, StartError};
pub use state::SessionStatus;
