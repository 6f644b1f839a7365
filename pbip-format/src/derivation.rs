//! Building and replaying derivations made of input constraints and merges.
//!
//! A [`Derivation`] keeps every constraint it records in an arena indexed by step ID, so that
//! later merges can refer to earlier steps by ID. [`Derivation::reduce`] combines a set of steps
//! into one with an explicit worklist, which is how pigeonhole-style refutations are built.
//!
//! [`Replay`] is the checking counterpart: it consumes steps read back from a trace and verifies
//! that every derived constraint is the sum of the two steps it names as hints.
use std::collections::VecDeque;
use std::io::Write;

use log::debug;
use log::trace;

use crate::constraint::AlgebraError;
use crate::constraint::Constraint;
use crate::steps::ProofStep;
use crate::steps::StepId;
use crate::steps::StepKind;
use crate::writer::ProofWriter;
use crate::writer::TraceError;

fn index_of(id: StepId) -> usize {
    (id.get() - 1) as usize
}

/// Records a derivation to a [`ProofWriter`] while remembering every constraint.
#[derive(Debug)]
pub struct Derivation<W: Write> {
    writer: ProofWriter<W>,
    /// The ID of the first step recorded through this derivation, which sits at index 0.
    first_step: StepId,
    constraints: Vec<Constraint>,
}

impl<W: Write> Derivation<W> {
    /// Start a derivation on `writer`.
    ///
    /// Steps the writer recorded before are not known to the derivation, and cannot be merged.
    pub fn new(writer: ProofWriter<W>) -> Self {
        Derivation {
            first_step: writer.next_step_id(),
            writer,
            constraints: vec![],
        }
    }

    /// Record a constraint of the instance.
    pub fn input(&mut self, constraint: Constraint) -> Result<StepId, TraceError> {
        let id = self.writer.record_input(&constraint)?;
        self.constraints.push(constraint);
        Ok(id)
    }

    /// Record the sum of two earlier steps, with the two steps as hints.
    pub fn merge(&mut self, left: StepId, right: StepId) -> Result<StepId, TraceError> {
        let merged = self.constraint(left)?.merge(self.constraint(right)?)?;
        trace!("merging {left} and {right} into {merged}");

        let id = self.writer.record_assert(&merged, [left, right])?;
        self.constraints.push(merged);
        Ok(id)
    }

    /// Merge all given steps into one.
    ///
    /// Steps are taken from the front of a queue in pairs, and each sum is put at the back, until
    /// a single step remains. Returns `Ok(None)` if no steps were given, and the step itself if
    /// only one was given.
    pub fn reduce(
        &mut self,
        steps: impl IntoIterator<Item = StepId>,
    ) -> Result<Option<StepId>, TraceError> {
        let mut worklist = steps.into_iter().collect::<VecDeque<_>>();

        while worklist.len() > 1 {
            let left = worklist.pop_front().expect("worklist has two elements");
            let right = worklist.pop_front().expect("worklist has two elements");

            worklist.push_back(self.merge(left, right)?);
        }

        Ok(worklist.pop_front())
    }

    /// Get the constraint recorded at step `id`.
    pub fn constraint(&self, id: StepId) -> Result<&Constraint, TraceError> {
        id.get()
            .checked_sub(self.first_step.get())
            .and_then(|offset| usize::try_from(offset).ok())
            .and_then(|index| self.constraints.get(index))
            .ok_or(TraceError::UnknownStep(id))
    }

    pub fn comment(&mut self, text: &str) -> Result<(), TraceError> {
        self.writer.comment(text)
    }

    pub fn writer(&self) -> &ProofWriter<W> {
        &self.writer
    }

    /// Finish the underlying writer and hand it back.
    pub fn finish(mut self) -> Result<ProofWriter<W>, TraceError> {
        self.writer.finish()?;
        Ok(self.writer)
    }
}

/// The reasons a step is rejected by [`Replay`].
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("expected step {expected}, found step {found}")]
    OutOfOrder { expected: StepId, found: StepId },

    #[error("step {step} refers to step {hint}, which does not precede it")]
    DanglingHint { step: StepId, hint: StepId },

    #[error("step {step} has {count} hints, only the sum of two steps can be checked")]
    UncheckedHints { step: StepId, count: usize },

    #[error("step {step} cannot be derived: {source}")]
    Algebra {
        step: StepId,
        #[source]
        source: AlgebraError,
    },

    #[error("step {step} asserts {asserted}, but the sum of its hints is {derived}")]
    NotImplied {
        step: StepId,
        asserted: Constraint,
        derived: Constraint,
    },
}

/// Checks steps one at a time against the steps before them.
#[derive(Debug, Default)]
pub struct Replay {
    constraints: Vec<Constraint>,
    inputs: u64,
    asserts: u64,
}

impl Replay {
    /// Check the next step and add it to the known steps.
    pub fn check_step(&mut self, step: ProofStep) -> Result<(), ReplayError> {
        let expected = self.constraints.len() as u64 + 1;
        if step.id.get() != expected {
            return Err(ReplayError::OutOfOrder {
                expected: StepId::new(expected).expect("is at least one"),
                found: step.id,
            });
        }

        if let Some(&hint) = step.hints.iter().find(|&&hint| hint >= step.id) {
            return Err(ReplayError::DanglingHint {
                step: step.id,
                hint,
            });
        }

        match step.kind {
            StepKind::Input => self.inputs += 1,

            StepKind::Assert => {
                let [left, right] = step.hints.as_slice() else {
                    return Err(ReplayError::UncheckedHints {
                        step: step.id,
                        count: step.hints.len(),
                    });
                };

                let derived = self.constraints[index_of(*left)]
                    .merge(&self.constraints[index_of(*right)])
                    .map_err(|source| ReplayError::Algebra {
                        step: step.id,
                        source,
                    })?;

                if derived != step.constraint {
                    return Err(ReplayError::NotImplied {
                        step: step.id,
                        asserted: step.constraint,
                        derived,
                    });
                }

                debug!("step {} follows from {left} and {right}", step.id);
                self.asserts += 1;
            }
        }

        self.constraints.push(step.constraint);

        Ok(())
    }

    /// Whether the last checked step is trivially unsatisfiable.
    pub fn concludes_contradiction(&self) -> bool {
        self.constraints
            .last()
            .is_some_and(Constraint::is_contradiction)
    }

    /// The number of input and assert steps checked so far.
    pub fn counts(&self) -> (u64, u64) {
        (self.inputs, self.asserts)
    }
}
