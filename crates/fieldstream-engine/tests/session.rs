//! Session lifecycle against a scripted solver.
//!
//! Every test runs on a paused clock inside a `LocalSet`. `settle()`
//! lets ready tasks run without moving time; sleeping past the 50 ms
//! throttle lets the producer issue its next request.

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::LocalSet;
use tokio::time::sleep;

use fieldstream_core::{EndOfStream, FrameData, SimulationKind, TransportError};
use fieldstream_engine::{
    drive_playback, RecentHistory, SessionConfig, SessionController, SessionStatus, TickOutcome,
};
use fieldstream_test_utils::fixtures::{
    leapfrog_batch, ramp_batch, small_heat, small_reaction, small_wave, species_batch,
};
use fieldstream_test_utils::{settle, ScriptedTransport};

const NEXT_REQUEST: Duration = Duration::from_millis(60);

async fn local<F: Future>(f: F) -> F::Output {
    LocalSet::new().run_until(f).await
}

fn controller(transport: &ScriptedTransport) -> SessionController<ScriptedTransport> {
    SessionController::new(transport.clone(), SessionConfig::default()).unwrap()
}

fn frame_value(frame: &fieldstream_core::Frame) -> f64 {
    match &frame.data {
        FrameData::Line(values) => values[1],
        FrameData::Species { u, .. } => u.values()[0],
    }
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn first_batch_plays_then_holds() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(11, 0, 5, 1.0));
        let _pending = transport.push_gate();
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;

        assert_eq!(ctl.status(), SessionStatus::Streaming);
        assert_eq!(ctl.len(), 5);
        assert_eq!(ctl.cursor(), Some(0));
        assert!(ctl.is_playing());
        assert!(transport.requests()[0].seed.is_none());

        for expected in 1..=4 {
            assert_eq!(ctl.tick(), TickOutcome::Advanced(expected));
        }
        assert_eq!(ctl.tick(), TickOutcome::Holding);
        assert_eq!(ctl.cursor(), Some(4));
        assert_eq!(ctl.current_frame().map(|f| frame_value(&f)), Some(4.0));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn continuation_drops_seed_echo() {
    local(async {
        let transport = ScriptedTransport::new();
        transport
            .push_batch(ramp_batch(11, 0, 5, 1.0))
            .push_batch(ramp_batch(11, 4, 5, 1.0));
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;

        assert_eq!(ctl.len(), 9);
        let requests = transport.requests();
        let seed = requests[1].seed.as_ref().unwrap();
        assert_eq!(seed.depth(), 1);
        assert_eq!(seed.time(), 4.0);
        assert_eq!(frame_value(seed.latest()), 4.0);

        let handle = ctl.handle();
        for i in 0..9 {
            let frame = handle.frame(i).unwrap();
            assert_eq!(frame.time, i as f64);
            assert_eq!(frame_value(&frame), i as f64);
        }

        ctl.set_cursor(8);
        let expected: Vec<(usize, f64)> = (0..9).map(|i| (i, 10.0 * i as f64)).collect();
        assert_eq!(ctl.aux_series(), expected);

        let metrics = ctl.metrics();
        assert_eq!(metrics.batches_applied, 2);
        assert_eq!(metrics.frames_appended, 9);
        assert_eq!(metrics.echo_frames_trimmed, 1);

        // Script exhausted: the next reply is empty.
        sleep(NEXT_REQUEST).await;
        assert_eq!(ctl.status(), SessionStatus::Exhausted(EndOfStream::EmptyBatch));
        assert!(ctl.is_active());
        assert_eq!(ctl.error(), None);
        assert_eq!(transport.request_count(), 3);
        assert_eq!(ctl.len(), 9);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn wave_with_single_frame_cannot_continue() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(leapfrog_batch(11, 0, 1, 1.0));
        let mut ctl = controller(&transport);

        ctl.start(small_wave().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;

        assert_eq!(
            ctl.status(),
            SessionStatus::Exhausted(EndOfStream::InsufficientSeed {
                required: 2,
                available: 1
            })
        );
        assert_eq!(ctl.error(), None);
        assert_eq!(ctl.len(), 1);
        assert_eq!(transport.request_count(), 1);
        assert_eq!(ctl.tick(), TickOutcome::Halted);
        assert!(!ctl.is_playing());
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn wave_seeds_with_two_frames() {
    local(async {
        let transport = ScriptedTransport::new();
        transport
            .push_batch(leapfrog_batch(11, 0, 5, 1.0))
            .push_batch(leapfrog_batch(11, 4, 5, 1.0));
        let mut ctl = controller(&transport);

        ctl.start(small_wave().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;

        let requests = transport.requests();
        let seed = requests[1].seed.as_ref().unwrap();
        assert_eq!(seed.depth(), 2);
        assert_eq!(seed.previous().map(frame_value), Some(3.0));
        assert_eq!(frame_value(seed.latest()), 4.0);
        assert_eq!(ctl.len(), 9);

        // Frame 0 of each batch carries no energy value.
        ctl.set_cursor(8);
        let indices: Vec<usize> = ctl.aux_series().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stop_discards_in_flight_response() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(11, 0, 5, 1.0));
        let gate = transport.push_gate();
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;
        assert_eq!(transport.request_count(), 2);

        ctl.stop();
        assert_eq!(ctl.status(), SessionStatus::Stopped);
        assert!(!ctl.is_playing());

        gate.release(ramp_batch(11, 4, 5, 1.0));
        settle().await;
        sleep(NEXT_REQUEST).await;

        assert_eq!(ctl.len(), 5);
        assert_eq!(ctl.metrics().stale_responses, 1);
        assert_eq!(transport.request_count(), 2);
        assert!(ctl.producer_finished());
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn restart_ignores_previous_session_response() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(11, 0, 5, 1.0));
        let gate = transport.push_gate();
        transport.push_batch(ramp_batch(11, 100, 3, 1.0));
        let mut ctl = controller(&transport);

        let first = ctl.start(small_heat().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;
        assert_eq!(transport.request_count(), 2);

        let second = ctl.start(small_heat().into()).unwrap();
        assert_ne!(first, second);
        settle().await;
        assert_eq!(ctl.len(), 3);
        assert!(transport.requests()[2].seed.is_none());

        gate.release(ramp_batch(11, 4, 5, 1.0));
        settle().await;

        assert_eq!(ctl.session_id(), Some(second));
        assert_eq!(ctl.len(), 3);
        assert_eq!(ctl.handle().frame(0).map(|f| frame_value(&f)), Some(100.0));
        assert_eq!(ctl.metrics().stale_responses, 0);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn transport_failure_keeps_frames() {
    local(async {
        let transport = ScriptedTransport::new();
        transport
            .push_batch(ramp_batch(11, 0, 5, 1.0))
            .push_error(TransportError::Http {
                status: 500,
                detail: "solver crashed".into(),
            });
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;

        assert_eq!(ctl.status(), SessionStatus::Failed);
        assert!(!ctl.is_active());
        let error = ctl.error().unwrap();
        assert!(error.contains("500"), "{error}");
        assert!(error.contains("solver crashed"), "{error}");
        assert_eq!(ctl.len(), 5);

        // Buffered frames still play out, then halt.
        for expected in 1..=4 {
            assert_eq!(ctl.tick(), TickOutcome::Advanced(expected));
        }
        assert_eq!(ctl.tick(), TickOutcome::Halted);

        ctl.dismiss_error();
        assert_eq!(ctl.error(), None);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn echo_mismatch_is_terminal() {
    local(async {
        let transport = ScriptedTransport::new();
        transport
            .push_batch(ramp_batch(11, 0, 5, 1.0))
            .push_batch(ramp_batch(11, 7, 3, 1.0));
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;

        assert_eq!(ctl.status(), SessionStatus::Failed);
        assert!(ctl.error().unwrap().contains("echo"));
        assert_eq!(ctl.len(), 5);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn shape_change_is_terminal() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(7, 0, 5, 1.0));
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;

        assert_eq!(ctl.status(), SessionStatus::Failed);
        assert!(ctl.is_empty());
        assert_eq!(ctl.cursor(), None);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reaction_appends_all_and_loops() {
    local(async {
        let transport = ScriptedTransport::new();
        transport
            .push_batch(species_batch(10, 10, 0, 3, 1.0))
            .push_batch(species_batch(10, 10, 3, 2, 1.0));
        let mut ctl = controller(&transport);

        ctl.start(small_reaction().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;
        sleep(NEXT_REQUEST).await;

        assert_eq!(ctl.status(), SessionStatus::Exhausted(EndOfStream::EmptyBatch));
        assert_eq!(ctl.len(), 5);
        assert_eq!(ctl.metrics().echo_frames_trimmed, 0);
        let handle = ctl.handle();
        let times: Vec<f64> = (0..5).map(|i| handle.frame(i).unwrap().time).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        for expected in 1..=4 {
            assert_eq!(ctl.tick(), TickOutcome::Advanced(expected));
        }
        assert_eq!(ctl.tick(), TickOutcome::Wrapped);
        assert_eq!(ctl.cursor(), Some(0));
        assert!(ctl.is_playing());
        assert_eq!(ctl.tick(), TickOutcome::Advanced(1));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn cursor_controls_pause_and_clamp() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(11, 0, 5, 1.0));
        let _pending = transport.push_gate();
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;

        assert_eq!(ctl.set_cursor(2), Some(2));
        assert!(!ctl.is_playing());
        assert_eq!(ctl.tick(), TickOutcome::Paused);
        assert_eq!(ctl.cursor(), Some(2));

        assert_eq!(ctl.set_cursor(99), Some(4));
        assert_eq!(ctl.step(-1), Some(3));
        ctl.set_playing(true);
        assert_eq!(ctl.tick(), TickOutcome::Advanced(4));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn focus_loss_stops_session() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(11, 0, 5, 1.0));
        let _pending = transport.push_gate();
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;
        ctl.set_focus(true);
        assert_eq!(ctl.status(), SessionStatus::Streaming);

        ctl.set_focus(false);
        assert_eq!(ctl.status(), SessionStatus::Stopped);
        assert!(!ctl.is_active());
        assert_eq!(ctl.len(), 5);

        ctl.set_focus(false);
        assert_eq!(ctl.status(), SessionStatus::Stopped);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reset_twice_is_idle() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(11, 0, 5, 1.0));
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;
        assert_eq!(ctl.len(), 5);

        ctl.reset();
        ctl.reset();
        assert_eq!(ctl.status(), SessionStatus::Idle);
        assert_eq!(ctl.session_id(), None);
        assert_eq!(ctl.parameters(), None);
        assert!(ctl.is_empty());
        assert_eq!(ctl.cursor(), None);
        assert!(!ctl.is_playing());
        assert_eq!(ctl.tick(), TickOutcome::Idle);

        sleep(NEXT_REQUEST).await;
        assert!(ctl.is_empty());
        assert_eq!(transport.request_count(), 1);
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn history_records_first_batch_only() {
    local(async {
        let transport = ScriptedTransport::new();
        transport
            .push_batch(ramp_batch(11, 0, 5, 1.0))
            .push_batch(ramp_batch(11, 4, 5, 1.0))
            .push_error(TransportError::Timeout);
        let history = Rc::new(RecentHistory::new());
        let mut ctl = SessionController::with_history(
            transport.clone(),
            Rc::clone(&history),
            SessionConfig::default(),
        )
        .unwrap();

        ctl.start(small_heat().into()).unwrap();
        settle().await;
        sleep(NEXT_REQUEST).await;
        sleep(NEXT_REQUEST).await;

        assert_eq!(ctl.status(), SessionStatus::Failed);
        assert_eq!(history.len(SimulationKind::Diffusion), 1);
        let entry = &history.entries(SimulationKind::Diffusion)[0];
        assert!(entry.parameters.contains("\"t_steps\":4"));
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn session_without_frames_is_not_recorded() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_error(TransportError::Timeout);
        let history = Rc::new(RecentHistory::new());
        let mut ctl = SessionController::with_history(
            transport.clone(),
            Rc::clone(&history),
            SessionConfig::default(),
        )
        .unwrap();

        ctl.start(small_heat().into()).unwrap();
        settle().await;

        assert_eq!(ctl.status(), SessionStatus::Failed);
        assert_eq!(ctl.error().as_deref(), Some("solver request timed out"));
        assert!(history.is_empty());
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn playback_driver_runs_until_controller_dropped() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(11, 0, 5, 1.0));
        let _pending = transport.push_gate();
        let config = SessionConfig {
            playback_hz: 4.0,
            ..SessionConfig::default()
        };
        let mut ctl = SessionController::new(transport.clone(), config).unwrap();

        ctl.start(small_heat().into()).unwrap();
        let driver = ctl.spawn_playback();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(ctl.cursor(), Some(4));
        assert!(ctl.is_playing());

        drop(ctl);
        sleep(Duration::from_millis(300)).await;
        assert!(driver.is_finished());
    })
    .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn playback_driver_raises_zero_period() {
    local(async {
        let transport = ScriptedTransport::new();
        transport.push_batch(ramp_batch(11, 0, 5, 1.0));
        let _pending = transport.push_gate();
        let mut ctl = controller(&transport);

        ctl.start(small_heat().into()).unwrap();
        settle().await;
        let driver = tokio::task::spawn_local(drive_playback(ctl.handle(), Duration::ZERO));
        sleep(Duration::from_millis(10)).await;

        assert_eq!(ctl.cursor(), Some(4));
        drop(ctl);
        sleep(Duration::from_millis(5)).await;
        assert!(driver.is_finished());
    })
    .await;
}
