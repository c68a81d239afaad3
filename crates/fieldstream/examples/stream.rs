//! Stream a simulation from a running solver service and report
//! playback progress.
//!
//! ```text
//! cargo run -p fieldstream --example stream -- --kind wave --seconds 10
//! RUST_LOG=fieldstream_engine=debug cargo run -p fieldstream --example stream
//! ```

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::task::LocalSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fieldstream::prelude::*;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Heat,
    Wave,
    Reaction,
}

/// Stream frames from the solver service.
#[derive(Debug, Parser)]
struct Args {
    /// Solver service base URL.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    url: String,
    /// Simulation domain.
    #[arg(long, value_enum, default_value_t = Kind::Heat)]
    kind: Kind,
    /// How long to stream before stopping.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
    /// Consumer-loop rate.
    #[arg(long, default_value_t = 30.0)]
    playback_hz: f64,
    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

impl Kind {
    fn parameters(self) -> SimulationParameters {
        match self {
            Self::Heat => HeatParams::default().into(),
            Self::Wave => WaveParams::default().into(),
            Self::Reaction => ReactionParams::default().into(),
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let transport = HttpTransport::new(TransportConfig {
        base_url: args.url,
        timeout: Duration::from_secs(args.timeout),
    })?;
    let config = SessionConfig {
        playback_hz: args.playback_hz,
        ..SessionConfig::default()
    };
    let history = RecentHistory::new();
    let mut session = SessionController::with_history(transport, history, config)?;

    let parameters = args.kind.parameters();
    let kind = parameters.kind();
    let id = session.start(parameters)?;
    info!(session = %id, %kind, "streaming");
    let _playback = session.spawn_playback();

    let mut report = tokio::time::interval(Duration::from_secs(1));
    for _ in 0..args.seconds {
        report.tick().await;
        let metrics = session.metrics();
        info!(
            status = ?session.status(),
            frames = session.len(),
            cursor = ?session.cursor(),
            mean_latency_us = ?metrics.mean_request_us(),
            "progress"
        );
        if let Some(message) = session.error() {
            return Err(message.into());
        }
    }

    session.stop();
    if let Some(frame) = session.current_frame() {
        info!(time = frame.time, shape = %frame.shape(), "last displayed frame");
    }
    info!(recorded = session.history().len(kind), "done");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match LocalSet::new().run_until(run(args)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "stream failed");
            ExitCode::FAILURE
        }
    }
}
