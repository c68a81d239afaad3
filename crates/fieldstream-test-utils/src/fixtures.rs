//! Parameter sets and canned batches.
//!
//! Canned batches use constant-valued frames: frame `k` of a batch
//! built from `first` holds the value `first + k` everywhere. A
//! continuation batch that starts at the previous batch's last value
//! therefore echoes its seed exactly.

use fieldstream_core::{
    Batch, Frame, FrameData, Grid, HeatInit, HeatParams, ReactionInit, ReactionParams, WaveInit,
    WaveParams,
};

/// Heat parameters on an 11-point grid, 4 steps per batch.
pub fn small_heat() -> HeatParams {
    HeatParams {
        alpha: 0.5,
        dt: 0.001,
        dx: 0.1,
        t_steps: 4,
        domain: 1.0,
        init: HeatInit::Pulse,
        sigma: 0.0,
        snapshot_interval: 1,
    }
}

/// Wave parameters on an 11-point grid, 4 steps per batch.
pub fn small_wave() -> WaveParams {
    WaveParams {
        c: 1.0,
        damping: 0.0,
        sigma: 0.0,
        total_time: 0.2,
        dt: 0.05,
        dx: 0.1,
        domain_len: 1.0,
        init: WaveInit::Pulse,
    }
}

/// Reaction parameters on the smallest accepted grid, 10x10.
pub fn small_reaction() -> ReactionParams {
    ReactionParams {
        width: 10,
        height: 10,
        total_time: 10.0,
        dt: 1.0,
        init: ReactionInit::Spots,
        ..ReactionParams::default()
    }
}

/// A line frame of `points` copies of `value`.
pub fn line(time: f64, points: usize, value: f64) -> Frame {
    Frame::new(time, FrameData::Line(vec![value; points]))
}

/// A two-species frame with `u = value` and `v = -value`.
pub fn species(time: f64, rows: usize, cols: usize, value: f64) -> Frame {
    let u = Grid::new(rows, cols, vec![value; rows * cols]);
    let v = Grid::new(rows, cols, vec![-value; rows * cols]);
    let data = match (u, v) {
        (Ok(u), Ok(v)) => FrameData::species(u, v),
        (Err(e), _) | (_, Err(e)) => Err(e),
    };
    match data {
        Ok(data) => Frame::new(time, data),
        Err(e) => panic!("fixture grid {rows}x{cols} invalid: {e}"),
    }
}

fn ramp(points: usize, first: usize, count: usize, period: f64) -> Vec<Frame> {
    (0..count)
        .map(|k| line(k as f64 * period, points, (first + k) as f64))
        .collect()
}

fn batch(frames: Vec<Frame>, aux: Vec<f64>) -> Batch {
    match Batch::new(frames, aux) {
        Ok(batch) => batch,
        Err(e) => panic!("fixture batch invalid: {e}"),
    }
}

/// Heat-style batch: `count` line frames at relative times
/// `0, period, ..`, one aux value per frame.
pub fn ramp_batch(points: usize, first: usize, count: usize, period: f64) -> Batch {
    let frames = ramp(points, first, count, period);
    let aux = (0..count).map(|k| 10.0 * (first + k) as f64).collect();
    batch(frames, aux)
}

/// Wave-style batch: like [`ramp_batch`] but aux only for the steps,
/// not for frame 0.
pub fn leapfrog_batch(points: usize, first: usize, count: usize, period: f64) -> Batch {
    let frames = ramp(points, first, count, period);
    let aux = (1..count).map(|k| 10.0 * (first + k) as f64).collect();
    batch(frames, aux)
}

/// Reaction-style batch: species frames at relative times
/// `period, 2 * period, ..`, no aux.
pub fn species_batch(rows: usize, cols: usize, first: usize, count: usize, period: f64) -> Batch {
    let frames = (0..count)
        .map(|k| species((k + 1) as f64 * period, rows, cols, (first + k) as f64))
        .collect();
    batch(frames, Vec::new())
}
