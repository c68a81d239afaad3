//! Fieldstream: open-ended playback of simulations computed by a
//! stateless, finite-horizon solver service.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the fieldstream sub-crates. For most users, adding `fieldstream`
//! as a single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use fieldstream::prelude::*;
//! use tokio::task::LocalSet;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(TransportConfig::default())?;
//!     let mut session = SessionController::new(transport, SessionConfig::default())?;
//!
//!     LocalSet::new()
//!         .run_until(async move {
//!             session.start(HeatParams::default().into())?;
//!             let _playback = session.spawn_playback();
//!             tokio::time::sleep(Duration::from_secs(5)).await;
//!             println!("{} frames buffered", session.len());
//!             Ok::<(), Box<dyn std::error::Error>>(())
//!         })
//!         .await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `fieldstream-core` | Frames, batches, parameters, policies, errors |
//! | [`transport`] | `fieldstream-transport` | `Transport` trait, HTTP client, wire codec |
//! | [`engine`] | `fieldstream-engine` | Frame buffer, join, playback, session controller |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Frames, batches, parameters, and errors (`fieldstream-core`).
pub use fieldstream_core as types;

/// The solver seam (`fieldstream-transport`).
///
/// Implement [`transport::Transport`] to plug in a different solver;
/// [`transport::HttpTransport`] talks to the JSON service.
pub use fieldstream_transport as transport;

/// Producer and consumer loops (`fieldstream-engine`).
///
/// [`engine::SessionController`] owns the session lifecycle;
/// [`engine::SessionHandle`] is the read side for renderers.
pub use fieldstream_engine as engine;

/// Common imports for typical fieldstream usage.
pub mod prelude {
    // Core types
    pub use fieldstream_core::{
        Batch, EndOfStream, Frame, FrameData, FrameShape, Grid, SessionId, SimulationKind,
        SimulationParameters, StreamError, TransportError,
    };

    // Parameters
    pub use fieldstream_core::{
        HeatInit, HeatParams, ReactionInit, ReactionParams, WaveInit, WaveParams,
    };

    // Transport
    pub use fieldstream_transport::{HttpTransport, Transport, TransportConfig};

    // Engine
    pub use fieldstream_engine::{
        drive_playback, HistorySink, RecentHistory, SessionConfig, SessionController,
        SessionHandle, SessionStatus, TickOutcome,
    };
}
