//! Error types for the fieldstream workspace.
//!
//! Organized by where the failure originates: parameter validation,
//! frame construction, the solver transport, and the producer loop.
//! Normal end-of-stream conditions are not errors and live in
//! [`EndOfStream`].

use std::error::Error;
use std::fmt;

use crate::frame::FrameShape;

/// A simulation parameter failed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamError {
    /// Wire name of the offending parameter.
    pub field: &'static str,
    /// Human-readable description of the violated constraint.
    pub reason: String,
}

impl ParamError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid parameter '{}': {}", self.field, self.reason)
    }
}

impl Error for ParamError {}

/// Errors building frames, grids, or batches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// A grid has zero rows or zero columns.
    EmptyGrid,
    /// A nested grid row has a different length from the first row.
    RaggedGrid {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// Flat grid values do not fill `rows * cols`.
    LengthMismatch {
        /// `rows * cols`.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
    /// The two species grids of one frame have different shapes.
    SpeciesShapeMismatch {
        /// Shape of the `u` grid.
        u: (usize, usize),
        /// Shape of the `v` grid.
        v: (usize, usize),
    },
    /// A batch carries more auxiliary values than frames.
    AuxOverflow {
        /// Number of frames.
        frames: usize,
        /// Number of auxiliary values.
        aux: usize,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid => write!(f, "grid has no cells"),
            Self::RaggedGrid {
                row,
                expected,
                found,
            } => write!(f, "ragged grid: row {row} has {found} values, expected {expected}"),
            Self::LengthMismatch { expected, found } => {
                write!(f, "grid needs {expected} values, got {found}")
            }
            Self::SpeciesShapeMismatch { u, v } => write!(
                f,
                "species grids differ in shape: u is {}x{}, v is {}x{}",
                u.0, u.1, v.0, v.1
            ),
            Self::AuxOverflow { frames, aux } => {
                write!(f, "batch has {aux} auxiliary values for {frames} frames")
            }
        }
    }
}

impl Error for FrameError {}

/// Failures of one solver call.
///
/// Every variant is terminal for the session that issued the call;
/// no retry is attempted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The solver answered with a non-success status.
    Http {
        /// HTTP status code.
        status: u16,
        /// Error detail reported by the service, or the raw body.
        detail: String,
    },
    /// The request could not be delivered (connection refused, DNS, TLS).
    Network {
        /// Description of the failure.
        reason: String,
    },
    /// The request payload could not be serialized.
    Encode {
        /// Description of the failure.
        reason: String,
    },
    /// The response payload was malformed.
    Decode {
        /// Description of the failure.
        reason: String,
    },
    /// The seed does not fit the domain being solved.
    UnsupportedSeed {
        /// Description of the mismatch.
        reason: String,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "solver request timed out"),
            Self::Http { status, detail } => write!(f, "solver returned {status}: {detail}"),
            Self::Network { reason } => write!(f, "solver unreachable: {reason}"),
            Self::Encode { reason } => write!(f, "could not encode request: {reason}"),
            Self::Decode { reason } => write!(f, "malformed solver response: {reason}"),
            Self::UnsupportedSeed { reason } => write!(f, "unsupported seed: {reason}"),
        }
    }
}

impl Error for TransportError {}

/// Terminal failures of a producer loop.
///
/// The session stops producing, records the message, and keeps its
/// already-buffered frames available for playback.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamError {
    /// The solver call failed.
    Transport(TransportError),
    /// A batch contained an invalid frame.
    Frame(FrameError),
    /// A batch frame does not match the session's frame shape.
    ShapeMismatch {
        /// Shape of the frames already buffered.
        expected: FrameShape,
        /// Shape of the offending frame.
        found: FrameShape,
    },
    /// A batch would break strictly increasing buffer time.
    OutOfOrder {
        /// Time of the preceding frame.
        previous: f64,
        /// Time of the offending frame.
        next: f64,
    },
    /// A domain that echoes its seed returned a first frame that
    /// differs from the seed.
    SeedEchoMismatch {
        /// Largest element-wise deviation from the seed, or `None`
        /// when the shapes differ.
        deviation: Option<f64>,
    },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::Frame(e) => write!(f, "invalid frame: {e}"),
            Self::ShapeMismatch { expected, found } => {
                write!(f, "frame shape changed mid-session: expected {expected}, got {found}")
            }
            Self::OutOfOrder { previous, next } => {
                write!(f, "frame at t={next} does not follow t={previous}")
            }
            Self::SeedEchoMismatch { deviation } => match deviation {
                Some(d) => write!(f, "first frame does not echo the seed (max deviation {d:e})"),
                None => write!(f, "first frame does not echo the seed (shape differs)"),
            },
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Frame(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for StreamError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<FrameError> for StreamError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

/// Why a producer loop finished without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndOfStream {
    /// The solver returned zero frames.
    EmptyBatch,
    /// The buffer tail is too short to seed the next request.
    InsufficientSeed {
        /// Frames the domain needs to continue.
        required: usize,
        /// Frames available in the buffer.
        available: usize,
    },
}

impl fmt::Display for EndOfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBatch => write!(f, "solver returned an empty batch"),
            Self::InsufficientSeed {
                required,
                available,
            } => write!(
                f,
                "cannot continue: {required} seed frames required, {available} buffered"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_error_wraps_transport_source() {
        let e: StreamError = TransportError::Timeout.into();
        assert_eq!(e.to_string(), "solver request timed out");
        assert!(e.source().is_some());
    }

    #[test]
    fn http_error_names_status_and_detail() {
        let e = TransportError::Http {
            status: 400,
            detail: "Unstable parameters".into(),
        };
        assert_eq!(e.to_string(), "solver returned 400: Unstable parameters");
    }

    #[test]
    fn param_error_display() {
        let e = ParamError::new("dt", "must be > 0, got 0");
        assert_eq!(e.to_string(), "invalid parameter 'dt': must be > 0, got 0");
    }
}
