//! Test utilities for fieldstream development.
//!
//! Provides a [`ScriptedTransport`] that replays canned responses and
//! records every request, a [`ReferenceSolver`] that actually integrates
//! the heat and wave equations in-process, and batch/parameter
//! [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod solver;

pub use solver::ReferenceSolver;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tokio::sync::oneshot;

use fieldstream_core::{Batch, SolveRequest, TransportError};
use fieldstream_transport::Transport;

type Reply = Result<Batch, TransportError>;

enum Step {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

#[derive(Default)]
struct Script {
    steps: RefCell<VecDeque<Step>>,
    requests: RefCell<Vec<SolveRequest>>,
}

/// A transport that answers from a queue of scripted replies.
///
/// Clones share the script, so a test keeps one clone to inspect
/// requests while the controller owns another. Once the script runs
/// out every call returns an empty batch, which ends the stream.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Rc<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch returned immediately.
    pub fn push_batch(&self, batch: Batch) -> &Self {
        self.push(Step::Ready(Ok(batch)))
    }

    /// Queue a failure returned immediately.
    pub fn push_error(&self, error: TransportError) -> &Self {
        self.push(Step::Ready(Err(error)))
    }

    /// Queue a reply the test releases later through the returned [`Gate`].
    ///
    /// The call stays in flight until then, like a slow solver.
    pub fn push_gate(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.push(Step::Gated(rx));
        Gate { tx }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<SolveRequest> {
        self.script.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.requests.borrow().len()
    }

    /// Scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.steps.borrow().len()
    }

    fn push(&self, step: Step) -> &Self {
        self.script.steps.borrow_mut().push_back(step);
        self
    }
}

impl Transport for ScriptedTransport {
    async fn solve(&self, request: SolveRequest) -> Result<Batch, TransportError> {
        self.script.requests.borrow_mut().push(request);
        let step = self.script.steps.borrow_mut().pop_front();
        match step {
            None => Ok(Batch::empty()),
            Some(Step::Ready(reply)) => reply,
            Some(Step::Gated(rx)) => rx.await.unwrap_or_else(|_| {
                Err(TransportError::Network {
                    reason: "gate dropped".into(),
                })
            }),
        }
    }
}

/// Releases one gated [`ScriptedTransport`] reply.
pub struct Gate {
    tx: oneshot::Sender<Reply>,
}

impl Gate {
    pub fn release(self, batch: Batch) {
        // The receiver is gone only if the call was never awaited.
        let _ = self.tx.send(Ok(batch));
    }

    pub fn fail(self, error: TransportError) {
        let _ = self.tx.send(Err(error));
    }
}

/// Yield enough times for every ready local task to run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldstream_core::HeatParams;

    fn request() -> SolveRequest {
        SolveRequest {
            parameters: HeatParams::default().into(),
            seed: None,
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn replies_in_order_then_ends() {
        let t = ScriptedTransport::new();
        t.push_batch(fixtures::ramp_batch(3, 0, 2, 1.0))
            .push_error(TransportError::Timeout);

        assert_eq!(t.solve(request()).await.unwrap().len(), 2);
        assert_eq!(t.solve(request()).await, Err(TransportError::Timeout));
        assert!(t.solve(request()).await.unwrap().is_empty());
        assert_eq!(t.request_count(), 3);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn gated_reply_waits_for_release() {
        let t = ScriptedTransport::new();
        let gate = t.push_gate();
        let pending = t.solve(request());
        gate.release(fixtures::ramp_batch(3, 0, 1, 1.0));
        assert_eq!(pending.await.unwrap().len(), 1);
    }
}
