//! The producer loop: one solver call at a time, seeded from the tail.
//!
//! ```text
//!   borrow state ── stale? ──────────────────────────────► exit
//!        │
//!        ├─ seed = buffer.seed(depth) ── too short ──────► Exhausted
//!   release borrow
//!   transport.solve(request).await
//!   borrow state ── stale? ──────────────────────────────► discard, exit
//!        │
//!        ├─ Err ─────────────────────────────────────────► Failed
//!        ├─ empty batch ─────────────────────────────────► Exhausted
//!        ├─ join + append ── Err ────────────────────────► Failed
//!   release borrow
//!   sleep(throttle).await ──► loop
//! ```
//!
//! A stopped or superseded session is never cancelled. Its loop finds
//! itself stale at the next check and exits; at most one request per
//! loop is ever in flight.

use std::rc::Rc;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use fieldstream_core::{EndOfStream, SessionId, SolveRequest, StreamError};
use fieldstream_transport::Transport;

use crate::config::SessionConfig;
use crate::history::HistorySink;
use crate::join::join;
use crate::state::Shared;

pub(crate) async fn run_producer<T, H>(
    shared: Shared,
    transport: Rc<T>,
    history: Rc<H>,
    session: SessionId,
    config: SessionConfig,
) where
    T: Transport,
    H: HistorySink,
{
    loop {
        let (request, policy) = {
            let mut state = shared.borrow_mut();
            if !state.is_current(session) {
                debug!(%session, "producer exiting: session no longer current");
                return;
            }
            let (Some(parameters), Some(policy)) = (state.parameters.clone(), state.policy)
            else {
                return;
            };
            match state.buffer.seed(policy.seed_depth) {
                Ok(seed) => (SolveRequest { parameters, seed }, policy),
                Err(end) => {
                    info!(%session, reason = %end, "stream finished");
                    state.finish(end);
                    return;
                }
            }
        };
        let seed = request.seed.clone();
        let kind = request.parameters.kind();
        debug!(
            %session,
            %kind,
            seed_time = seed.as_ref().map(|s| s.time()),
            "requesting batch"
        );

        let started = Instant::now();
        let result = transport.solve(request).await;
        let elapsed_us = started.elapsed().as_micros() as u64;

        let mut state = shared.borrow_mut();
        if !state.is_current(session) {
            // A superseded session's counters were reset by its successor.
            if state.id == Some(session) {
                state.metrics.stale_responses += 1;
            }
            debug!(%session, "discarding response for stale session");
            return;
        }
        state.metrics.requests += 1;
        state.metrics.last_request_us = elapsed_us;
        state.metrics.total_request_us += elapsed_us;

        let batch = match result {
            Ok(batch) => batch,
            Err(e) => {
                let error = StreamError::from(e);
                warn!(%session, %error, "solver request failed");
                state.fail(&error);
                return;
            }
        };
        if batch.is_empty() {
            info!(%session, reason = %EndOfStream::EmptyBatch, "stream finished");
            state.finish(EndOfStream::EmptyBatch);
            return;
        }

        let first_frames = state.buffer.is_empty();
        let received = batch.len();
        let appended = join(policy.join, seed.as_ref(), batch, config.echo_tolerance)
            .and_then(|joined| {
                let trimmed = joined.trimmed;
                state.buffer.append(joined).map(|added| (added, trimmed))
            });
        let (added, trimmed) = match appended {
            Ok(counts) => counts,
            Err(error) => {
                warn!(%session, %error, "rejecting batch");
                state.fail(&error);
                return;
            }
        };
        if added == 0 {
            // Only the echo came back; re-requesting would repeat it.
            info!(%session, reason = %EndOfStream::EmptyBatch, "stream finished");
            state.finish(EndOfStream::EmptyBatch);
            return;
        }

        state.metrics.batches_applied += 1;
        state.metrics.frames_appended += added as u64;
        state.metrics.echo_frames_trimmed += trimmed as u64;
        debug!(
            %session,
            frames = received,
            appended = added,
            len = state.buffer.len(),
            latency_us = elapsed_us,
            "batch applied"
        );

        let recorded = if first_frames {
            state.cursor.start();
            state.parameters.clone()
        } else {
            None
        };
        drop(state);
        if let Some(parameters) = recorded {
            history.record(kind, &parameters);
        }

        sleep(config.throttle).await;
    }
}
