//! Solver input and output: [`SolveRequest`], [`SeedState`], [`Batch`].

use smallvec::SmallVec;

use crate::error::FrameError;
use crate::frame::Frame;
use crate::params::SimulationParameters;

/// The bounded result of one solver call.
///
/// `aux` is right-aligned against `frames`: `aux[k]` belongs to
/// `frames[frames.len() - aux.len() + k]`. Solvers that report a
/// diagnostic per step but not for the initial condition therefore
/// produce one fewer aux value than frames. An empty batch signals
/// end-of-stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    frames: Vec<Frame>,
    aux: Vec<f64>,
}

impl Batch {
    /// Build a batch, checking `aux` is no longer than `frames`.
    pub fn new(frames: Vec<Frame>, aux: Vec<f64>) -> Result<Self, FrameError> {
        if aux.len() > frames.len() {
            return Err(FrameError::AuxOverflow {
                frames: frames.len(),
                aux: aux.len(),
            });
        }
        Ok(Self { frames, aux })
    }

    /// A batch with no frames.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the batch carries no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The frames, in time order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The auxiliary series (right-aligned).
    pub fn aux(&self) -> &[f64] {
        &self.aux
    }

    /// Auxiliary value belonging to frame `index`, if any.
    pub fn aux_for(&self, index: usize) -> Option<f64> {
        let offset = self.frames.len() - self.aux.len();
        index
            .checked_sub(offset)
            .and_then(|k| self.aux.get(k).copied())
    }

    /// Decompose into frames and per-frame auxiliary values.
    pub fn into_aligned(self) -> Vec<(Frame, Option<f64>)> {
        let offset = self.frames.len() - self.aux.len();
        let mut aux = self.aux.into_iter();
        self.frames
            .into_iter()
            .enumerate()
            .map(|(i, frame)| {
                let value = if i >= offset { aux.next() } else { None };
                (frame, value)
            })
            .collect()
    }
}

/// The minimal state needed to continue a simulation.
///
/// Holds one frame for single-step schemes and two for leapfrog
/// schemes, oldest first. Always derived from a buffer tail.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedState {
    frames: SmallVec<[Frame; 2]>,
}

impl SeedState {
    /// Build a seed from tail frames, oldest first.
    ///
    /// Returns `None` for zero frames or more than two.
    pub fn from_tail<I>(frames: I) -> Option<Self>
    where
        I: IntoIterator<Item = Frame>,
    {
        let frames: SmallVec<[Frame; 2]> = frames.into_iter().collect();
        if frames.is_empty() || frames.len() > 2 {
            return None;
        }
        Some(Self { frames })
    }

    /// The most recent frame (`u_curr` for leapfrog schemes).
    pub fn latest(&self) -> &Frame {
        // Non-empty by construction.
        &self.frames[self.frames.len() - 1]
    }

    /// The frame before the latest one (`u_prev`), if the seed has two.
    pub fn previous(&self) -> Option<&Frame> {
        if self.frames.len() == 2 {
            self.frames.first()
        } else {
            None
        }
    }

    /// Number of frames in the seed.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Absolute session time of the latest frame.
    pub fn time(&self) -> f64 {
        self.latest().time
    }
}

/// One solver call: parameters plus an optional seed.
///
/// The first request of a session carries no seed.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveRequest {
    /// The session's immutable parameter snapshot.
    pub parameters: SimulationParameters,
    /// Tail state to resume from.
    pub seed: Option<SeedState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameData;

    fn line(time: f64, v: f64) -> Frame {
        Frame::new(time, FrameData::Line(vec![v; 3]))
    }

    #[test]
    fn aux_longer_than_frames_rejected() {
        let err = Batch::new(vec![line(0.0, 1.0)], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err, FrameError::AuxOverflow { frames: 1, aux: 2 });
    }

    #[test]
    fn aux_is_right_aligned() {
        let batch = Batch::new(
            vec![line(0.0, 0.0), line(1.0, 1.0), line(2.0, 2.0)],
            vec![10.0, 20.0],
        )
        .unwrap();
        assert_eq!(batch.aux_for(0), None);
        assert_eq!(batch.aux_for(1), Some(10.0));
        assert_eq!(batch.aux_for(2), Some(20.0));

        let aligned = batch.into_aligned();
        let aux: Vec<_> = aligned.iter().map(|(_, a)| *a).collect();
        assert_eq!(aux, vec![None, Some(10.0), Some(20.0)]);
    }

    #[test]
    fn seed_depth_bounds() {
        assert!(SeedState::from_tail(Vec::<Frame>::new()).is_none());
        assert!(SeedState::from_tail(vec![line(0.0, 0.0); 3]).is_none());

        let one = SeedState::from_tail(vec![line(1.0, 1.0)]).unwrap();
        assert_eq!(one.depth(), 1);
        assert!(one.previous().is_none());

        let two = SeedState::from_tail(vec![line(1.0, 1.0), line(2.0, 2.0)]).unwrap();
        assert_eq!(two.depth(), 2);
        assert_eq!(two.time(), 2.0);
        assert_eq!(two.previous().map(|f| f.time), Some(1.0));
    }
}
