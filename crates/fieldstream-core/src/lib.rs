//! Core types for the fieldstream workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the data that flows between the solver transport, the frame buffer,
//! and the playback cursor: frames and grids, batches and seed state,
//! typed simulation parameters, per-domain streaming policies, session
//! identifiers, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod domain;
pub mod error;
pub mod frame;
pub mod id;
pub mod params;

pub use batch::{Batch, SeedState, SolveRequest};
pub use domain::{DomainPolicy, EndPolicy, JoinPolicy, SimulationKind};
pub use error::{EndOfStream, FrameError, ParamError, StreamError, TransportError};
pub use frame::{Frame, FrameData, FrameShape, Grid};
pub use id::SessionId;
pub use params::{
    HeatInit, HeatParams, ReactionInit, ReactionParams, SimulationParameters, WaveInit, WaveParams,
    MAX_GRID_POINTS,
};
