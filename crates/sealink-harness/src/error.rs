//! Harness errors.

use std::fmt;

use sealink_core::ProtocolError;
use thiserror::Error;

use crate::invariants::Violation;

/// Index of a party in a [`crate::SimNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartyId(pub usize);

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party-{}", self.0)
    }
}

/// Errors that stop a simulation.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A party's manager failed with a non-recoverable error
    #[error("{party}: {source}")]
    Protocol {
        /// Failing party
        party: PartyId,
        /// Manager error
        #[source]
        source: ProtocolError,
    },

    /// Messages were still in flight after the step budget
    #[error("simulation did not settle within {0} steps")]
    StepLimit(usize),

    /// An invariant failed after a delivery
    #[error("invariant violated after step {step}: {}", format_violations(.violations))]
    Invariant {
        /// Step after which the check failed
        step: usize,
        /// Every violation found
        violations: Vec<Violation>,
    },
}

fn format_violations(violations: &[Violation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
