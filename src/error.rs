use thiserror::Error;

#[derive(Debug, Error)]
pub enum TocsinError {
    #[error("State variable '{0}' uses the reserved next-state prefix")]
    ReservedVariableName(String),
    #[error("Tried to build a transition system over an empty state alphabet")]
    EmptyAlphabet,
    #[error("Next-state constant '{0}' does not correspond to a declared state variable")]
    StrayNextState(String),
    #[error("Formula contains a connective outside the supported LIA fragment: {0}")]
    UnexpectedFormulaShape(String),
    #[error("CNF conversion produced {0} subgoals where exactly one was expected")]
    CnfSplit(usize),
    #[error("The '{0}' tactic failed to apply")]
    Tactic(String),
}
