//! Reconciling a new batch with the seed it continues from.
//!
//! Solvers that store their initial condition as frame 0 return the
//! seed again at the head of every continuation batch. [`join`] drops
//! that echo, after checking it really is the seed, and rebases the
//! remaining frames from seed-relative to absolute session time.

use fieldstream_core::{Batch, Frame, JoinPolicy, SeedState, StreamError};

/// A batch ready to append: absolute times, per-frame aux values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Joined {
    /// Frames with their auxiliary value, in time order.
    pub frames: Vec<(Frame, Option<f64>)>,
    /// Leading frames dropped as seed echoes.
    pub trimmed: usize,
}

/// Apply `policy` to `batch`, continuing from `seed`.
///
/// Without a seed (the first batch of a session) every frame is kept
/// and times are taken as absolute. With `TrimSeedEcho`, frame 0 must
/// sit at relative time 0 and match the seed's latest frame to within
/// `tolerance`, or the join fails with
/// [`StreamError::SeedEchoMismatch`].
pub fn join(
    policy: JoinPolicy,
    seed: Option<&SeedState>,
    batch: Batch,
    tolerance: f64,
) -> Result<Joined, StreamError> {
    let mut frames = batch.into_aligned();
    let Some(seed) = seed else {
        return Ok(Joined { frames, trimmed: 0 });
    };

    let mut trimmed = 0;
    if policy == JoinPolicy::TrimSeedEcho {
        if let Some((head, _)) = frames.first() {
            let deviation = head.data.max_deviation(&seed.latest().data);
            let at_seed = head.time.abs() <= tolerance;
            match deviation {
                Some(d) if d <= tolerance && at_seed => {
                    frames.remove(0);
                    trimmed = 1;
                }
                _ => return Err(StreamError::SeedEchoMismatch { deviation }),
            }
        }
    }

    let base = seed.time();
    for (frame, _) in &mut frames {
        frame.time += base;
    }
    Ok(Joined { frames, trimmed })
}
