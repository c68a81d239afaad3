//! Recording the parameters of sessions that produced frames.
//!
//! A session hands its parameters to the [`HistorySink`] once, after
//! its first non-empty batch lands. Sinks are synchronous and must not
//! block the producer loop; a sink that can fail deals with the
//! failure itself.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::warn;

use fieldstream_core::{SimulationKind, SimulationParameters};

/// Receives the parameters of every session that produced frames.
pub trait HistorySink {
    /// Record one session's parameters.
    fn record(&self, kind: SimulationKind, parameters: &SimulationParameters);
}

impl<H: HistorySink + ?Sized> HistorySink for Rc<H> {
    fn record(&self, kind: SimulationKind, parameters: &SimulationParameters) {
        (**self).record(kind, parameters);
    }
}

/// A sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHistory;

impl HistorySink for NoHistory {
    fn record(&self, _kind: SimulationKind, _parameters: &SimulationParameters) {}
}

/// One recorded session.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    /// Domain of the session.
    pub kind: SimulationKind,
    /// The parameters rendered as JSON.
    pub parameters: String,
    /// Monotonic record number across all kinds.
    pub sequence: u64,
}

/// In-memory history keeping the newest entries per kind.
#[derive(Debug)]
pub struct RecentHistory {
    limit: usize,
    entries: RefCell<IndexMap<SimulationKind, VecDeque<HistoryEntry>>>,
    next_sequence: Cell<u64>,
}

impl Default for RecentHistory {
    fn default() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }
}

impl RecentHistory {
    /// Entries kept per kind unless configured otherwise.
    pub const DEFAULT_LIMIT: usize = 10;

    /// A history keeping [`DEFAULT_LIMIT`](Self::DEFAULT_LIMIT) entries per kind.
    pub fn new() -> Self {
        Self::default()
    }

    /// A history keeping at most `limit` entries per kind.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            entries: RefCell::new(IndexMap::new()),
            next_sequence: Cell::new(0),
        }
    }

    /// Entries for `kind`, newest first.
    pub fn entries(&self, kind: SimulationKind) -> Vec<HistoryEntry> {
        self.entries
            .borrow()
            .get(&kind)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of entries held for `kind`.
    pub fn len(&self, kind: SimulationKind) -> usize {
        self.entries.borrow().get(&kind).map_or(0, VecDeque::len)
    }

    /// Whether nothing has been recorded for any kind.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().values().all(VecDeque::is_empty)
    }

    /// Kinds in the order they were first recorded.
    pub fn kinds(&self) -> Vec<SimulationKind> {
        self.entries.borrow().keys().copied().collect()
    }
}

impl HistorySink for RecentHistory {
    fn record(&self, kind: SimulationKind, parameters: &SimulationParameters) {
        let parameters = match serde_json::to_string(parameters) {
            Ok(json) => json,
            Err(e) => {
                warn!(%kind, error = %e, "could not serialize parameters for history");
                return;
            }
        };
        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence + 1);

        let mut entries = self.entries.borrow_mut();
        let queue = entries.entry(kind).or_default();
        queue.push_front(HistoryEntry {
            kind,
            parameters,
            sequence,
        });
        queue.truncate(self.limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldstream_core::{HeatParams, WaveParams};

    fn heat(alpha: f64) -> SimulationParameters {
        SimulationParameters::from(HeatParams {
            alpha,
            ..HeatParams::default()
        })
    }

    #[test]
    fn newest_first() {
        let h = RecentHistory::new();
        h.record(SimulationKind::Diffusion, &heat(0.1));
        h.record(SimulationKind::Diffusion, &heat(0.2));
        let entries = h.entries(SimulationKind::Diffusion);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sequence, 1);
        assert!(entries[0].parameters.contains("\"alpha\":0.2"));
        assert!(entries[0].parameters.contains("\"simulation_type\":\"heat\""));
    }

    #[test]
    fn limit_evicts_oldest_per_kind() {
        let h = RecentHistory::with_limit(3);
        for i in 0..5 {
            h.record(SimulationKind::Diffusion, &heat(0.1 * f64::from(i + 1)));
        }
        h.record(
            SimulationKind::Wave,
            &SimulationParameters::from(WaveParams::default()),
        );
        assert_eq!(h.len(SimulationKind::Diffusion), 3);
        assert_eq!(h.len(SimulationKind::Wave), 1);
        let seqs: Vec<u64> = h
            .entries(SimulationKind::Diffusion)
            .iter()
            .map(|e| e.sequence)
            .collect();
        assert_eq!(seqs, vec![4, 3, 2]);
        assert_eq!(
            h.kinds(),
            vec![SimulationKind::Diffusion, SimulationKind::Wave]
        );
    }

    #[test]
    fn default_limit_is_ten() {
        let h = RecentHistory::new();
        for _ in 0..12 {
            h.record(SimulationKind::Diffusion, &heat(0.5));
        }
        assert_eq!(h.len(SimulationKind::Diffusion), 10);
        assert!(h.entries(SimulationKind::Reaction).is_empty());
    }

    #[test]
    fn rc_sink_forwards() {
        let h = Rc::new(RecentHistory::new());
        let sink: Rc<RecentHistory> = Rc::clone(&h);
        sink.record(SimulationKind::Diffusion, &heat(0.5));
        assert!(!h.is_empty());
        NoHistory.record(SimulationKind::Diffusion, &heat(0.5));
    }
}
