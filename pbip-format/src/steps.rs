//! The module containing the individual proof steps.
use std::num::NonZeroU64;

use crate::constraint::Constraint;

/// Identifies a step in the proof. Steps are numbered consecutively from 1.
pub type StepId = NonZeroU64;

/// Whether a step introduces a constraint of the instance, or derives a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// A constraint taken from the input formula. Has no hints.
    Input,
    /// A constraint implied by the steps given as hints.
    Assert,
}

impl StepKind {
    /// The character which starts a step line in the trace.
    pub fn code(self) -> u8 {
        match self {
            StepKind::Input => b'i',
            StepKind::Assert => b'a',
        }
    }

    pub fn from_code(code: u8) -> Option<StepKind> {
        match code {
            b'i' => Some(StepKind::Input),
            b'a' => Some(StepKind::Assert),
            _ => None,
        }
    }
}

/// One step in the proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofStep {
    /// The ID of this step.
    pub id: StepId,
    pub kind: StepKind,
    pub constraint: Constraint,
    /// The steps this constraint was derived from, in the order they were given.
    pub hints: Vec<StepId>,
}

/// Counts of what has been written to a proof.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProofStatistics {
    pub inputs: u64,
    pub asserts: u64,
    pub comments: u64,
}

impl ProofStatistics {
    /// The total number of steps, i.e. the ID of the last step.
    pub fn steps(&self) -> u64 {
        self.inputs + self.asserts
    }
}
