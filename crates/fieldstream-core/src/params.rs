//! Typed simulation parameters and their validation.
//!
//! Field names serialize to the solver service's wire names. Bounds
//! and stability limits match what the service enforces, so invalid
//! input is rejected before a session starts rather than surfacing as
//! an HTTP 400 on the first request.

use serde::{Deserialize, Serialize};

use crate::domain::SimulationKind;
use crate::error::ParamError;
use crate::frame::FrameShape;

/// Maximum number of frames the reaction solver returns per batch.
const REACTION_FRAMES_PER_BATCH: u64 = 50;

/// Largest 1D grid a session accepts.
pub const MAX_GRID_POINTS: usize = 100_000;

fn positive(field: &'static str, value: f64) -> Result<(), ParamError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParamError::new(field, format!("must be finite and > 0, got {value}")))
    }
}

fn within(field: &'static str, value: f64, lo: f64, hi: f64) -> Result<(), ParamError> {
    if (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(ParamError::new(field, format!("must be in [{lo}, {hi}], got {value}")))
    }
}

/// Number of grid points for a `[0, length]` domain sampled at `dx`.
fn grid_points(length: f64, dx: f64) -> usize {
    ((length / dx).floor() as usize).saturating_add(1)
}

fn grid_extent(field: &'static str, length: f64, dx: f64) -> Result<(), ParamError> {
    let intervals = (length / dx).floor();
    if intervals.is_finite() && intervals < MAX_GRID_POINTS as f64 {
        Ok(())
    } else {
        Err(ParamError::new(
            field,
            format!("{length}/{dx} exceeds {MAX_GRID_POINTS} grid points"),
        ))
    }
}

// ── Heat ────────────────────────────────────────────────────────

/// Initial condition for the heat equation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatInit {
    /// Gaussian pulse in the center of the domain.
    #[default]
    Pulse,
    /// One sine period across the domain.
    Sin,
    /// Small seeded random noise.
    Random,
}

/// Parameters for the stochastic 1D heat equation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatParams {
    /// Diffusivity.
    pub alpha: f64,
    /// Time step.
    pub dt: f64,
    /// Grid spacing.
    pub dx: f64,
    /// Steps per batch.
    pub t_steps: u32,
    /// Domain length.
    #[serde(default = "default_heat_domain")]
    pub domain: f64,
    /// Initial condition, ignored when seeded.
    #[serde(default)]
    pub init: HeatInit,
    /// Noise strength.
    #[serde(default)]
    pub sigma: f64,
    /// Record every n-th step.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u32,
}

fn default_heat_domain() -> f64 {
    1.0
}

fn default_snapshot_interval() -> u32 {
    1
}

impl Default for HeatParams {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            dt: 0.0001,
            dx: 0.01,
            t_steps: 50,
            domain: default_heat_domain(),
            init: HeatInit::Pulse,
            sigma: 0.0,
            snapshot_interval: default_snapshot_interval(),
        }
    }
}

impl HeatParams {
    /// Check bounds and the explicit-scheme stability limit
    /// `alpha * dt / dx^2 <= 0.5`.
    pub fn validate(&self) -> Result<(), ParamError> {
        positive("alpha", self.alpha)?;
        positive("dt", self.dt)?;
        positive("dx", self.dx)?;
        positive("domain", self.domain)?;
        grid_extent("domain", self.domain, self.dx)?;
        if self.t_steps == 0 {
            return Err(ParamError::new("t_steps", "must be > 0"));
        }
        if self.snapshot_interval == 0 {
            return Err(ParamError::new("snapshot_interval", "must be >= 1"));
        }
        if !(self.sigma >= 0.0 && self.sigma.is_finite()) {
            return Err(ParamError::new(
                "sigma",
                format!("must be finite and >= 0, got {}", self.sigma),
            ));
        }
        let r = self.alpha * self.dt / (self.dx * self.dx);
        if r > 0.5 {
            return Err(ParamError::new(
                "dt",
                format!("unstable: alpha*dt/dx^2 = {r:.6} > 0.5"),
            ));
        }
        Ok(())
    }

    /// Number of grid points.
    pub fn grid_len(&self) -> usize {
        grid_points(self.domain, self.dx)
    }

    /// Simulated time between consecutive frames.
    pub fn frame_period(&self) -> f64 {
        self.dt * f64::from(self.snapshot_interval)
    }
}

// ── Wave ────────────────────────────────────────────────────────

/// Initial condition for the wave equation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveInit {
    /// Gaussian pulse at rest.
    #[default]
    Pulse,
    /// Plucked string (triangle) at rest.
    String,
}

/// Parameters for the damped stochastic 1D wave equation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveParams {
    /// Wave speed.
    pub c: f64,
    /// Damping coefficient.
    pub damping: f64,
    /// Noise intensity.
    pub sigma: f64,
    /// Simulated time per batch.
    #[serde(rename = "T")]
    pub total_time: f64,
    /// Time step.
    pub dt: f64,
    /// Grid spacing.
    pub dx: f64,
    /// Domain length.
    pub domain_len: f64,
    /// Initial condition, ignored when seeded.
    #[serde(rename = "init_type")]
    pub init: WaveInit,
}

impl Default for WaveParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            damping: 0.0,
            sigma: 0.0,
            total_time: 5.0,
            dt: 0.05,
            dx: 0.1,
            domain_len: 10.0,
            init: WaveInit::Pulse,
        }
    }
}

impl WaveParams {
    /// Check bounds and the CFL condition `c * dt / dx <= 1`.
    pub fn validate(&self) -> Result<(), ParamError> {
        within("c", self.c, 0.1, 10.0)?;
        within("damping", self.damping, 0.0, 5.0)?;
        within("sigma", self.sigma, 0.0, 20.0)?;
        positive("T", self.total_time)?;
        within("T", self.total_time, 0.0, 50.0)?;
        positive("dt", self.dt)?;
        positive("dx", self.dx)?;
        positive("domain_len", self.domain_len)?;
        grid_extent("domain_len", self.domain_len, self.dx)?;
        let cfl = self.c * self.dt / self.dx;
        if cfl > 1.0 {
            return Err(ParamError::new(
                "dt",
                format!("unstable: CFL c*dt/dx = {cfl:.4} > 1"),
            ));
        }
        Ok(())
    }

    /// Number of grid points.
    pub fn grid_len(&self) -> usize {
        grid_points(self.domain_len, self.dx)
    }

    /// Simulated time between consecutive frames.
    pub fn frame_period(&self) -> f64 {
        self.dt
    }
}

// ── Reaction ────────────────────────────────────────────────────

/// Initial perturbation for the Gray-Scott system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionInit {
    /// Noisy square in the center.
    #[default]
    RandomCenter,
    /// Noise over the whole grid.
    RandomEverywhere,
    /// Ten random seed spots.
    Spots,
}

/// Parameters for the Gray-Scott reaction-diffusion system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionParams {
    /// Diffusion rate of `u`.
    #[serde(rename = "Du")]
    pub du: f64,
    /// Diffusion rate of `v`.
    #[serde(rename = "Dv")]
    pub dv: f64,
    /// Feed rate.
    #[serde(rename = "F")]
    pub feed: f64,
    /// Kill rate.
    #[serde(rename = "k")]
    pub kill: f64,
    /// Noise intensity.
    pub sigma: f64,
    /// Simulated time per batch.
    #[serde(rename = "T")]
    pub total_time: f64,
    /// Time step.
    pub dt: f64,
    /// Grid spacing.
    pub dx: f64,
    /// Initial perturbation, ignored when seeded.
    #[serde(rename = "init_type")]
    pub init: ReactionInit,
    /// Grid extent along the first axis.
    pub width: u32,
    /// Grid extent along the second axis.
    pub height: u32,
}

impl Default for ReactionParams {
    fn default() -> Self {
        Self {
            du: 0.16,
            dv: 0.08,
            feed: 0.035,
            kill: 0.060,
            sigma: 0.0,
            total_time: 100.0,
            dt: 1.0,
            dx: 1.0,
            init: ReactionInit::RandomCenter,
            width: 64,
            height: 64,
        }
    }
}

impl ReactionParams {
    /// Check bounds.
    pub fn validate(&self) -> Result<(), ParamError> {
        within("Du", self.du, 0.001, 1.0)?;
        within("Dv", self.dv, 0.001, 1.0)?;
        within("F", self.feed, 0.0, 0.5)?;
        within("k", self.kill, 0.0, 0.5)?;
        within("sigma", self.sigma, 0.0, 2.0)?;
        positive("T", self.total_time)?;
        within("T", self.total_time, 0.0, 2000.0)?;
        positive("dt", self.dt)?;
        positive("dx", self.dx)?;
        within("width", f64::from(self.width), 10.0, 256.0)?;
        within("height", f64::from(self.height), 10.0, 256.0)?;
        Ok(())
    }

    /// Solver steps between recorded frames.
    pub fn steps_per_frame(&self) -> u64 {
        let steps = (self.total_time / self.dt).floor() as u64;
        (steps / REACTION_FRAMES_PER_BATCH).max(1)
    }

    /// Simulated time between consecutive frames of one batch.
    pub fn frame_period(&self) -> f64 {
        self.dt * self.steps_per_frame() as f64
    }
}

// ── SimulationParameters ────────────────────────────────────────

/// Parameters for any supported domain.
///
/// Immutable for the lifetime of a session: the controller keeps one
/// snapshot and clones it into every request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "simulation_type")]
pub enum SimulationParameters {
    /// Heat equation.
    #[serde(rename = "heat")]
    Diffusion(HeatParams),
    /// Wave equation.
    #[serde(rename = "wave")]
    Wave(WaveParams),
    /// Gray-Scott reaction-diffusion.
    #[serde(rename = "reaction")]
    Reaction(ReactionParams),
}

impl SimulationParameters {
    /// The domain these parameters configure.
    pub fn kind(&self) -> SimulationKind {
        match self {
            Self::Diffusion(_) => SimulationKind::Diffusion,
            Self::Wave(_) => SimulationKind::Wave,
            Self::Reaction(_) => SimulationKind::Reaction,
        }
    }

    /// Validate the inner parameter set.
    pub fn validate(&self) -> Result<(), ParamError> {
        match self {
            Self::Diffusion(p) => p.validate(),
            Self::Wave(p) => p.validate(),
            Self::Reaction(p) => p.validate(),
        }
    }

    /// Simulated time between consecutive frames of one batch.
    pub fn frame_period(&self) -> f64 {
        match self {
            Self::Diffusion(p) => p.frame_period(),
            Self::Wave(p) => p.frame_period(),
            Self::Reaction(p) => p.frame_period(),
        }
    }

    /// Shape every frame of a session with these parameters must have.
    pub fn expected_shape(&self) -> FrameShape {
        match self {
            Self::Diffusion(p) => FrameShape::Line { len: p.grid_len() },
            Self::Wave(p) => FrameShape::Line { len: p.grid_len() },
            Self::Reaction(p) => FrameShape::Species {
                rows: p.width as usize,
                cols: p.height as usize,
            },
        }
    }
}

impl From<HeatParams> for SimulationParameters {
    fn from(p: HeatParams) -> Self {
        Self::Diffusion(p)
    }
}

impl From<WaveParams> for SimulationParameters {
    fn from(p: WaveParams) -> Self {
        Self::Wave(p)
    }
}

impl From<ReactionParams> for SimulationParameters {
    fn from(p: ReactionParams) -> Self {
        Self::Reaction(p)
    }
}
