//! JSON wire format of the solver service.
//!
//! Each domain has its own route, its own seed field names, and its own
//! response layout:
//!
//! | Domain | Route | Seed fields | Response |
//! |--------|-------|-------------|----------|
//! | heat | `/api/v1/heat/solve` | `current_state` | `frames`, `energy` |
//! | wave | `/api/v1/wave/simulate` | `current_u`, `current_u_prev` | `t`, `frames`, `energy` |
//! | reaction | `/api/v1/reaction/simulate` | `current_u`, `current_v` | `t`, `U`, `V` |
//!
//! Decoding assigns every frame a time relative to the seed instant
//! (the seed, or the initial condition, sits at `0.0`).

use serde::{Deserialize, Serialize};

use fieldstream_core::{
    Batch, Frame, FrameData, Grid, HeatParams, ReactionParams, SeedState, SimulationKind,
    SimulationParameters, SolveRequest, TransportError, WaveParams,
};

/// Route of the solver endpoint for `kind`.
pub fn route(kind: SimulationKind) -> &'static str {
    match kind {
        SimulationKind::Diffusion => "/api/v1/heat/solve",
        SimulationKind::Wave => "/api/v1/wave/simulate",
        SimulationKind::Reaction => "/api/v1/reaction/simulate",
    }
}

// ── Requests ────────────────────────────────────────────────────

#[derive(Serialize)]
struct HeatRequest<'a> {
    #[serde(flatten)]
    params: &'a HeatParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_state: Option<&'a [f64]>,
}

#[derive(Serialize)]
struct WaveRequest<'a> {
    #[serde(flatten)]
    params: &'a WaveParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_u: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_u_prev: Option<&'a [f64]>,
}

#[derive(Serialize)]
struct ReactionRequest<'a> {
    #[serde(flatten)]
    params: &'a ReactionParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_u: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_v: Option<Vec<Vec<f64>>>,
}

fn line_of(frame: &Frame) -> Result<&[f64], TransportError> {
    match &frame.data {
        FrameData::Line(values) => Ok(values),
        FrameData::Species { .. } => Err(TransportError::UnsupportedSeed {
            reason: "expected a 1D frame, got a two-species frame".into(),
        }),
    }
}

fn wave_seed(seed: &SeedState) -> Result<(&[f64], &[f64]), TransportError> {
    let prev = seed
        .previous()
        .ok_or_else(|| TransportError::UnsupportedSeed {
            reason: format!("leapfrog seed needs 2 frames, got {}", seed.depth()),
        })?;
    Ok((line_of(seed.latest())?, line_of(prev)?))
}

/// Serialize `request` into the JSON body for its domain's route.
pub fn encode_request(request: &SolveRequest) -> Result<serde_json::Value, TransportError> {
    let seed = request.seed.as_ref();
    let encoded = match &request.parameters {
        SimulationParameters::Diffusion(params) => {
            let current_state = seed.map(|s| line_of(s.latest())).transpose()?;
            serde_json::to_value(HeatRequest {
                params,
                current_state,
            })
        }
        SimulationParameters::Wave(params) => {
            let (current_u, current_u_prev) = match seed.map(wave_seed).transpose()? {
                Some((u, prev)) => (Some(u), Some(prev)),
                None => (None, None),
            };
            serde_json::to_value(WaveRequest {
                params,
                current_u,
                current_u_prev,
            })
        }
        SimulationParameters::Reaction(params) => {
            let (current_u, current_v) = match seed.map(|s| &s.latest().data) {
                Some(FrameData::Species { u, v }) => (Some(u.to_rows()), Some(v.to_rows())),
                Some(FrameData::Line(_)) => {
                    return Err(TransportError::UnsupportedSeed {
                        reason: "expected a two-species frame, got a 1D frame".into(),
                    })
                }
                None => (None, None),
            };
            serde_json::to_value(ReactionRequest {
                params,
                current_u,
                current_v,
            })
        }
    };
    encoded.map_err(|e| TransportError::Encode {
        reason: e.to_string(),
    })
}

// ── Responses ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct HeatResponse {
    frames: Vec<Vec<f64>>,
    #[serde(default)]
    energy: Vec<f64>,
}

#[derive(Deserialize)]
struct WaveResponse {
    #[serde(default)]
    t: Vec<f64>,
    frames: Vec<Vec<f64>>,
    #[serde(default)]
    energy: Vec<f64>,
}

#[derive(Deserialize)]
struct ReactionResponse {
    #[serde(default)]
    t: Vec<f64>,
    #[serde(rename = "U")]
    u: Vec<Vec<Vec<f64>>>,
    #[serde(rename = "V")]
    v: Vec<Vec<Vec<f64>>>,
}

fn decode_err(reason: impl std::fmt::Display) -> TransportError {
    TransportError::Decode {
        reason: reason.to_string(),
    }
}

fn line_batch(
    frames: Vec<Vec<f64>>,
    times: impl Fn(usize) -> f64,
    aux: Vec<f64>,
) -> Result<Batch, TransportError> {
    let frames = frames
        .into_iter()
        .enumerate()
        .map(|(i, values)| Frame::new(times(i), FrameData::Line(values)))
        .collect();
    Batch::new(frames, aux).map_err(decode_err)
}

fn decode_heat(params: &HeatParams, body: &[u8]) -> Result<Batch, TransportError> {
    let resp: HeatResponse = serde_json::from_slice(body).map_err(decode_err)?;
    let period = params.frame_period();
    line_batch(resp.frames, |i| i as f64 * period, resp.energy)
}

fn decode_wave(params: &WaveParams, body: &[u8]) -> Result<Batch, TransportError> {
    let resp: WaveResponse = serde_json::from_slice(body).map_err(decode_err)?;
    let dt = params.dt;
    if resp.t.len() == resp.frames.len() {
        let t = resp.t;
        line_batch(resp.frames, |i| t[i], resp.energy)
    } else {
        line_batch(resp.frames, |i| i as f64 * dt, resp.energy)
    }
}

fn decode_reaction(params: &ReactionParams, body: &[u8]) -> Result<Batch, TransportError> {
    let resp: ReactionResponse = serde_json::from_slice(body).map_err(decode_err)?;
    if resp.u.len() != resp.v.len() {
        return Err(decode_err(format!(
            "{} U frames but {} V frames",
            resp.u.len(),
            resp.v.len()
        )));
    }
    let dt = params.dt;
    let period = params.frame_period();
    // `t_j` is the step index times dt, taken after that step ran, so
    // the recorded state is one step past `t_j`.
    let aligned = resp.t.len() == resp.u.len();
    let t = resp.t;
    let time = |j: usize| match t.get(j) {
        Some(t) if aligned => t + dt,
        _ => j as f64 * period + dt,
    };
    let mut frames = Vec::with_capacity(resp.u.len());
    for (j, (u, v)) in resp.u.into_iter().zip(resp.v).enumerate() {
        let u = Grid::from_rows(u).map_err(decode_err)?;
        let v = Grid::from_rows(v).map_err(decode_err)?;
        let data = FrameData::species(u, v).map_err(decode_err)?;
        frames.push(Frame::new(time(j), data));
    }
    Batch::new(frames, Vec::new()).map_err(decode_err)
}

/// Parse a success response body for the domain of `parameters`.
pub fn decode_response(
    parameters: &SimulationParameters,
    body: &[u8],
) -> Result<Batch, TransportError> {
    match parameters {
        SimulationParameters::Diffusion(p) => decode_heat(p, body),
        SimulationParameters::Wave(p) => decode_wave(p, body),
        SimulationParameters::Reaction(p) => decode_reaction(p, body),
    }
}
