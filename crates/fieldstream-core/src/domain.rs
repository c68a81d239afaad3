//! Per-domain streaming policies.
//!
//! Each simulation kind declares, once, how consecutive batches are
//! joined, what playback does when it reaches the end of a finished
//! stream, and how many tail frames seed the next request. The engine
//! selects the [`DomainPolicy`] at session start and never branches on
//! the kind again.

use std::fmt;

/// The simulation domains served by the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimulationKind {
    /// Stochastic 1D heat equation, explicit single-step scheme.
    Diffusion,
    /// Damped stochastic 1D wave equation, leapfrog scheme.
    Wave,
    /// Gray-Scott two-species reaction-diffusion on a periodic 2D grid.
    Reaction,
}

impl SimulationKind {
    /// All kinds, in declaration order.
    pub const ALL: [SimulationKind; 3] = [Self::Diffusion, Self::Wave, Self::Reaction];

    /// Stable key used by the solver routes and history records.
    pub fn key(self) -> &'static str {
        match self {
            Self::Diffusion => "heat",
            Self::Wave => "wave",
            Self::Reaction => "reaction",
        }
    }

    /// The streaming policy for this kind.
    pub fn policy(self) -> DomainPolicy {
        match self {
            // The heat solver stores its initial condition as frame 0.
            Self::Diffusion => DomainPolicy {
                join: JoinPolicy::TrimSeedEcho,
                end: EndPolicy::Halt,
                seed_depth: 1,
            },
            // The wave solver stores `u_curr` as frame 0 and needs
            // `u_prev` as well to take a leapfrog step.
            Self::Wave => DomainPolicy {
                join: JoinPolicy::TrimSeedEcho,
                end: EndPolicy::Halt,
                seed_depth: 2,
            },
            // The reaction solver records after the first step; its
            // looping preview wraps back to frame 0.
            Self::Reaction => DomainPolicy {
                join: JoinPolicy::AppendAll,
                end: EndPolicy::Loop,
                seed_depth: 1,
            },
        }
    }
}

impl fmt::Display for SimulationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a new batch's leading frame is reconciled with the seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinPolicy {
    /// The solver returns the seed as frame 0; verify and drop it.
    TrimSeedEcho,
    /// Frame 0 is already the next time step; keep every frame.
    AppendAll,
}

/// What playback does at the last frame once production has stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndPolicy {
    /// Stop automatic playback on the last frame.
    Halt,
    /// Wrap to frame 0 and keep playing.
    Loop,
}

/// The complete streaming strategy for one domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DomainPolicy {
    /// Batch join rule.
    pub join: JoinPolicy,
    /// End-of-buffer playback rule.
    pub end: EndPolicy,
    /// Number of tail frames needed to seed the next request.
    pub seed_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_needs_two_seed_frames() {
        assert_eq!(SimulationKind::Wave.policy().seed_depth, 2);
        assert_eq!(SimulationKind::Diffusion.policy().seed_depth, 1);
        assert_eq!(SimulationKind::Reaction.policy().seed_depth, 1);
    }

    #[test]
    fn only_reaction_loops() {
        for kind in SimulationKind::ALL {
            let expected = if kind == SimulationKind::Reaction {
                EndPolicy::Loop
            } else {
                EndPolicy::Halt
            };
            assert_eq!(kind.policy().end, expected, "{kind}");
        }
    }

    #[test]
    fn keys_are_stable() {
        assert_eq!(SimulationKind::Diffusion.to_string(), "heat");
        assert_eq!(SimulationKind::Wave.key(), "wave");
        assert_eq!(SimulationKind::Reaction.key(), "reaction");
    }
}
