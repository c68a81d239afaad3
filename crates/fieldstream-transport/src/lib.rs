//! The solver transport seam for fieldstream.
//!
//! A [`Transport`] turns one [`SolveRequest`] into one [`Batch`]. It is
//! stateless: every call carries the full parameter snapshot and, from
//! the second call of a session on, the seed taken from the buffer
//! tail. [`HttpTransport`] talks to the solver service over JSON;
//! tests substitute scripted implementations.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use std::future::Future;

use fieldstream_core::{Batch, SolveRequest, TransportError};

pub mod codec;
pub mod http;

pub use http::{HttpTransport, TransportConfig};

/// One stateless solver call.
///
/// Implementations need not be `Send`: the engine drives them from a
/// single-threaded local task set. Timeouts and HTTP failures must map
/// to [`TransportError`]; retrying is left to the implementation.
pub trait Transport {
    /// Advance the simulation described by `request` and return the
    /// resulting frames.
    fn solve(&self, request: SolveRequest) -> impl Future<Output = Result<Batch, TransportError>>;
}
