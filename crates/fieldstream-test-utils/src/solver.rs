//! In-process reference solver for the heat and wave equations.
//!
//! Integrates the same explicit schemes as the solver service and
//! honours the same contract: frame 0 of every batch is the initial
//! condition (the seed when resuming), times are relative to it, heat
//! reports one energy value per frame and wave one per step. Noise is
//! drawn from a seeded ChaCha8 stream so runs are reproducible.

use std::cell::{Cell, RefCell};
use std::f64::consts::PI;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use fieldstream_core::{
    Batch, Frame, FrameData, HeatInit, HeatParams, SeedState, SimulationParameters, SolveRequest,
    TransportError, WaveInit, WaveParams,
};
use fieldstream_transport::Transport;

/// Solves heat and wave requests locally. Reaction requests fail with
/// HTTP 501.
pub struct ReferenceSolver {
    rng: RefCell<ChaCha8Rng>,
    batches: Cell<usize>,
    batch_limit: Option<usize>,
}

impl ReferenceSolver {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RefCell::new(ChaCha8Rng::seed_from_u64(seed)),
            batches: Cell::new(0),
            batch_limit: None,
        }
    }

    /// Return an empty batch after `limit` non-empty ones.
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = Some(limit);
        self
    }

    /// Non-empty batches returned so far.
    pub fn batches(&self) -> usize {
        self.batches.get()
    }

    fn solve_now(&self, request: &SolveRequest) -> Result<Batch, TransportError> {
        if self.batch_limit.is_some_and(|limit| self.batches.get() >= limit) {
            return Ok(Batch::empty());
        }
        let mut rng = self.rng.borrow_mut();
        let batch = match &request.parameters {
            SimulationParameters::Diffusion(p) => heat(p, request.seed.as_ref(), &mut rng)?,
            SimulationParameters::Wave(p) => wave(p, request.seed.as_ref(), &mut rng)?,
            SimulationParameters::Reaction(_) => {
                return Err(TransportError::Http {
                    status: 501,
                    detail: "reaction is not available in the reference solver".into(),
                })
            }
        };
        self.batches.set(self.batches.get() + 1);
        Ok(batch)
    }
}

impl Transport for ReferenceSolver {
    async fn solve(&self, request: SolveRequest) -> Result<Batch, TransportError> {
        self.solve_now(&request)
    }
}

/// Standard normal sample via the Box-Muller transform.
fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-300);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

fn seed_line(frame: &Frame, expected: usize) -> Result<Vec<f64>, TransportError> {
    match &frame.data {
        FrameData::Line(values) if values.len() == expected => Ok(values.clone()),
        FrameData::Line(values) => Err(TransportError::Http {
            status: 400,
            detail: format!(
                "init_state length {} does not match domain/dx -> {expected}",
                values.len()
            ),
        }),
        FrameData::Species { .. } => Err(TransportError::UnsupportedSeed {
            reason: "line solver seeded with a species frame".into(),
        }),
    }
}

fn line_batch(frames: Vec<Vec<f64>>, period: f64, aux: Vec<f64>) -> Result<Batch, TransportError> {
    let frames = frames
        .into_iter()
        .enumerate()
        .map(|(i, u)| Frame::new(i as f64 * period, FrameData::Line(u)))
        .collect();
    Batch::new(frames, aux).map_err(|e| TransportError::Decode {
        reason: e.to_string(),
    })
}

// ── Heat ─────────────────────────────────────────────────────────

fn heat_init(x: &[f64], init: HeatInit) -> Vec<f64> {
    let (lo, hi) = (x[0], x[x.len() - 1]);
    match init {
        HeatInit::Pulse => {
            let center = 0.5 * (lo + hi);
            let width = match 0.05 * (hi - lo) {
                w if w == 0.0 => 0.05,
                w => w,
            };
            x.iter()
                .map(|&xi| (-(xi - center).powi(2) / (2.0 * width * width)).exp())
                .collect()
        }
        HeatInit::Sin => x
            .iter()
            .map(|&xi| (2.0 * PI * (xi - lo) / (hi - lo)).sin())
            .collect(),
        HeatInit::Random => {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            x.iter().map(|_| 0.1 * box_muller(&mut rng)).collect()
        }
    }
}

fn heat(
    p: &HeatParams,
    seed: Option<&SeedState>,
    rng: &mut ChaCha8Rng,
) -> Result<Batch, TransportError> {
    let nx = p.grid_len();
    let mut u = match seed {
        Some(seed) => seed_line(seed.latest(), nx)?,
        None => heat_init(&linspace(0.0, p.domain, nx), p.init),
    };
    u[0] = 0.0;
    u[nx - 1] = 0.0;

    let energy = |u: &[f64]| u.iter().map(|v| v * v).sum::<f64>() * p.dx;
    let r = p.alpha * p.dt / (p.dx * p.dx);
    let noise = p.sigma * p.dt.sqrt();
    let interval = p.snapshot_interval.max(1);

    let mut frames = vec![u.clone()];
    let mut aux = vec![energy(&u)];
    let mut next = vec![0.0; nx];
    for n in 1..=p.t_steps {
        for i in 1..nx - 1 {
            next[i] = u[i] + r * (u[i + 1] - 2.0 * u[i] + u[i - 1]);
            if p.sigma > 0.0 {
                next[i] += noise * box_muller(rng);
            }
        }
        next[0] = 0.0;
        next[nx - 1] = 0.0;
        std::mem::swap(&mut u, &mut next);
        if n % interval == 0 {
            aux.push(energy(&u));
            frames.push(u.clone());
        }
    }
    line_batch(frames, p.frame_period(), aux)
}

// ── Wave ─────────────────────────────────────────────────────────

fn wave_init(nx: usize, domain_len: f64, init: WaveInit) -> Vec<f64> {
    match init {
        WaveInit::Pulse => linspace(0.0, domain_len, nx)
            .into_iter()
            .map(|xi| (-(xi - domain_len / 2.0).powi(2) / 0.5).exp())
            .collect(),
        WaveInit::String => {
            let center = nx / 2;
            let mut u = linspace(0.0, 1.0, center);
            u.extend(linspace(1.0, 0.0, nx - center));
            u
        }
    }
}

fn wave(
    p: &WaveParams,
    seed: Option<&SeedState>,
    rng: &mut ChaCha8Rng,
) -> Result<Batch, TransportError> {
    let nx = p.grid_len();
    let steps = (p.total_time / p.dt).floor() as usize;
    let (mut prev, mut curr) = match seed {
        Some(seed) => {
            let previous = seed.previous().ok_or_else(|| TransportError::UnsupportedSeed {
                reason: "wave seed needs two frames".into(),
            })?;
            (seed_line(previous, nx)?, seed_line(seed.latest(), nx)?)
        }
        None => {
            let u = wave_init(nx, p.domain_len, p.init);
            (u.clone(), u)
        }
    };

    let r2 = (p.c * p.dt / p.dx).powi(2);
    let k = p.damping * p.dt;
    let mut frames = vec![curr.clone()];
    let mut aux = Vec::with_capacity(steps);
    for _ in 0..steps {
        let mut next = vec![0.0; nx];
        for i in 0..nx {
            let laplacian = if i == 0 || i == nx - 1 {
                0.0
            } else {
                curr[i + 1] - 2.0 * curr[i] + curr[i - 1]
            };
            let forcing = if p.sigma > 0.0 {
                p.sigma * box_muller(rng) * p.dt * p.dt
            } else {
                0.0
            };
            next[i] = (2.0 * curr[i] - prev[i] * (1.0 - k / 2.0) + r2 * laplacian + forcing)
                / (1.0 + k / 2.0);
        }
        next[0] = 0.0;
        next[nx - 1] = 0.0;

        let kinetic: f64 = (1..nx - 1)
            .map(|i| ((next[i] - prev[i]) / (2.0 * p.dt)).powi(2))
            .sum::<f64>()
            * 0.5
            * p.dx;
        let potential: f64 = curr
            .windows(2)
            .map(|w| ((w[1] - w[0]) / p.dx).powi(2))
            .sum::<f64>()
            * 0.5
            * p.c
            * p.c
            * p.dx;
        aux.push(kinetic + potential);

        prev = std::mem::replace(&mut curr, next);
        frames.push(curr.clone());
    }
    line_batch(frames, p.frame_period(), aux)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{small_heat, small_reaction, small_wave};

    fn request(parameters: impl Into<SimulationParameters>, seed: Option<SeedState>) -> SolveRequest {
        SolveRequest {
            parameters: parameters.into(),
            seed,
        }
    }

    #[test]
    fn heat_batch_shape_and_energy() {
        let solver = ReferenceSolver::new(7);
        let batch = solver.solve_now(&request(small_heat(), None)).unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.aux().len(), 5);
        let first = &batch.frames()[0];
        assert_eq!(first.time, 0.0);
        match &first.data {
            FrameData::Line(u) => {
                assert_eq!(u.len(), 11);
                assert_eq!(u[0], 0.0);
                assert_eq!(u[10], 0.0);
                assert!(u[5] > 0.99);
            }
            other => panic!("unexpected frame {other:?}"),
        }
        // Diffusion with zero boundaries only loses energy.
        assert!(batch.aux().windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn heat_echoes_its_seed() {
        let solver = ReferenceSolver::new(7);
        let first = solver.solve_now(&request(small_heat(), None)).unwrap();
        let tail = first.frames().last().cloned().unwrap();
        let seed = SeedState::from_tail(vec![tail.clone()]).unwrap();
        let next = solver.solve_now(&request(small_heat(), Some(seed))).unwrap();
        assert_eq!(next.frames()[0].data, tail.data);
        assert_eq!(next.frames()[0].time, 0.0);
    }

    #[test]
    fn wave_reports_energy_per_step() {
        let solver = ReferenceSolver::new(7);
        let batch = solver.solve_now(&request(small_wave(), None)).unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.aux().len(), 4);
        assert_eq!(batch.aux_for(0), None);
    }

    #[test]
    fn wave_seed_needs_two_frames() {
        let solver = ReferenceSolver::new(7);
        let frame = Frame::new(0.0, FrameData::Line(vec![0.0; 11]));
        let seed = SeedState::from_tail(vec![frame]).unwrap();
        let err = solver.solve_now(&request(small_wave(), Some(seed))).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedSeed { .. }));
    }

    #[test]
    fn noise_is_reproducible() {
        let params = HeatParams {
            sigma: 0.5,
            ..small_heat()
        };
        let a = ReferenceSolver::new(3)
            .solve_now(&request(params.clone(), None))
            .unwrap();
        let b = ReferenceSolver::new(3)
            .solve_now(&request(params, None))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn batch_limit_ends_stream() {
        let solver = ReferenceSolver::new(1).with_batch_limit(1);
        assert!(!solver.solve_now(&request(small_heat(), None)).unwrap().is_empty());
        assert!(solver.solve_now(&request(small_heat(), None)).unwrap().is_empty());
        assert_eq!(solver.batches(), 1);
    }

    #[test]
    fn reaction_unsupported() {
        let solver = ReferenceSolver::new(1);
        let err = solver.solve_now(&request(small_reaction(), None)).unwrap_err();
        assert!(matches!(err, TransportError::Http { status: 501, .. }));
    }
}
