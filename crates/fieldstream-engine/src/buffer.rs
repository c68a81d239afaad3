//! The append-only frame buffer of one session.

use std::sync::Arc;

use fieldstream_core::{EndOfStream, Frame, FrameShape, SeedState, StreamError};

use crate::join::Joined;

/// Ordered frames produced so far, with their auxiliary values.
///
/// Frames are held behind `Arc` so readers can keep the current frame
/// across a redraw without copying grid data. Within a session the
/// buffer only grows: every append is checked for a consistent frame
/// shape and strictly increasing time, and a failing batch leaves the
/// buffer untouched.
#[derive(Clone, Debug, Default)]
pub struct FrameBuffer {
    frames: Vec<Arc<Frame>>,
    aux: Vec<Option<f64>>,
    shape: Option<FrameShape>,
}

impl FrameBuffer {
    /// An empty buffer that adopts the shape of its first frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty buffer that only accepts frames of `shape`.
    pub fn with_shape(shape: FrameShape) -> Self {
        Self {
            shape: Some(shape),
            ..Self::default()
        }
    }

    /// Number of buffered frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame has been buffered.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at `index`.
    pub fn get(&self, index: usize) -> Option<&Arc<Frame>> {
        self.frames.get(index)
    }

    /// The most recent frame.
    pub fn last(&self) -> Option<&Arc<Frame>> {
        self.frames.last()
    }

    /// Auxiliary value of frame `index`, if the solver reported one.
    pub fn aux(&self, index: usize) -> Option<f64> {
        self.aux.get(index).copied().flatten()
    }

    /// The frame shape accepted by this buffer, once known.
    pub fn shape(&self) -> Option<FrameShape> {
        self.shape
    }

    /// Seed for the next solver call, taken from the last `depth` frames.
    ///
    /// An empty buffer yields `Ok(None)`: the request starts from the
    /// parameters' initial condition. A non-empty buffer shorter than
    /// `depth` cannot be continued.
    pub fn seed(&self, depth: usize) -> Result<Option<SeedState>, EndOfStream> {
        if self.frames.is_empty() {
            return Ok(None);
        }
        let insufficient = EndOfStream::InsufficientSeed {
            required: depth,
            available: self.frames.len(),
        };
        if self.frames.len() < depth {
            return Err(insufficient);
        }
        let tail = &self.frames[self.frames.len() - depth..];
        SeedState::from_tail(tail.iter().map(|f| Frame::clone(f)))
            .map(Some)
            .ok_or(insufficient)
    }

    /// Append a joined batch, returning the number of frames added.
    pub fn append(&mut self, joined: Joined) -> Result<usize, StreamError> {
        let mut shape = self.shape;
        let mut previous = self.frames.last().map(|f| f.time);
        for (frame, _) in &joined.frames {
            let found = frame.shape();
            match shape {
                Some(expected) if expected != found => {
                    return Err(StreamError::ShapeMismatch { expected, found });
                }
                _ => shape = Some(found),
            }
            if let Some(prev) = previous {
                // Also rejects NaN times.
                if !(frame.time > prev) {
                    return Err(StreamError::OutOfOrder {
                        previous: prev,
                        next: frame.time,
                    });
                }
            }
            previous = Some(frame.time);
        }

        let added = joined.frames.len();
        self.shape = shape;
        self.frames.reserve(added);
        self.aux.reserve(added);
        for (frame, aux) in joined.frames {
            self.frames.push(Arc::new(frame));
            self.aux.push(aux);
        }
        Ok(added)
    }

    /// Indexed auxiliary values of frames `0..=upto` that carry one.
    pub fn aux_series(&self, upto: usize) -> Vec<(usize, f64)> {
        self.aux
            .iter()
            .take(upto.saturating_add(1))
            .enumerate()
            .filter_map(|(i, a)| a.map(|v| (i, v)))
            .collect()
    }

    /// Drop every frame and forget the accepted shape.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.aux.clear();
        self.shape = None;
    }
}
