//! Strongly-typed session identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`SessionId`] allocation.
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one streaming session.
///
/// Allocated from a monotonic atomic counter via [`SessionId::next`].
/// A producer captures the id of the session it was spawned for and
/// compares it against the controller's current id after every await;
/// a mismatch means the session was superseded and the response is
/// dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh, unique session id.
    ///
    /// Each call returns a new id that has never been returned before
    /// within this process.
    pub fn next() -> Self {
        Self(SESSION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
