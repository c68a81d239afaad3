//! Per-session streaming counters.
//!
//! [`StreamMetrics`] is reset on every session start and updated only
//! by the producer loop. It exists for diagnostics; nothing in the
//! stream's correctness depends on it.

/// Counters collected while a session streams.
///
/// Durations are in microseconds of wall-clock time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamMetrics {
    /// Solver calls issued.
    pub requests: u64,
    /// Non-empty batches applied to the buffer.
    pub batches_applied: u64,
    /// Frames appended to the buffer.
    pub frames_appended: u64,
    /// Leading frames dropped by the seed-echo join.
    pub echo_frames_trimmed: u64,
    /// Responses discarded because this session was stopped while
    /// they were in flight. Responses for an earlier session are not
    /// counted here.
    pub stale_responses: u64,
    /// Latency of the most recent solver call.
    pub last_request_us: u64,
    /// Sum of all solver call latencies.
    pub total_request_us: u64,
}

impl StreamMetrics {
    /// Mean solver latency, or `None` before the first call completes.
    pub fn mean_request_us(&self) -> Option<u64> {
        if self.requests == 0 {
            None
        } else {
            Some(self.total_request_us / self.requests)
        }
    }
}
