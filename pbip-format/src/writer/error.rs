use crate::constraint::AlgebraError;
use crate::steps::StepId;

/// The errors that can occur while recording a proof trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("failed to write to sink: {0}")]
    Io(#[from] std::io::Error),

    #[error("step {step} refers to step {hint}, which has not been recorded before it")]
    DanglingHint { step: StepId, hint: StepId },

    #[error("the trace is finished and cannot be extended")]
    TraceSealed,

    #[error("step {0} does not exist")]
    UnknownStep(StepId),

    #[error("failed to derive constraint: {0}")]
    Algebra(#[from] AlgebraError),
}
