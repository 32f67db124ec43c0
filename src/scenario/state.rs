//! Session-scoped workflow state and step gating
//!
//! Fields are set only by successful creation steps and persist until
//! cleanup. Step preconditions are declared as [`Gate`] values rather than
//! nested conditionals, so a failed creation skips its dependents instead
//! of cascading into more failures.

/// Entities established during the run
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// First test issue, created alone
    pub alpha: Option<u64>,
    /// Second test issue, created in the batch
    pub beta: Option<u64>,
    /// Third test issue, created in the batch and closed mid-run
    pub gamma: Option<u64>,
    /// Feature branch created for alpha
    pub branch: Option<String>,
    /// Pull request opened from the branch
    pub pr_number: Option<u64>,
    /// Branch that was checked out before the run started
    pub original_branch: String,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            alpha: None,
            beta: None,
            gamma: None,
            branch: None,
            pr_number: None,
            original_branch: "main".to_string(),
        }
    }
}

/// Precondition a step is gated on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    Alpha,
    AlphaBeta,
    AlphaBetaGamma,
    Gamma,
    Branch,
    PrNumber,
}

impl Gate {
    /// Whether the prerequisite entities exist
    pub fn ready(self, state: &WorkflowState) -> bool {
        match self {
            Gate::Always => true,
            Gate::Alpha => state.alpha.is_some(),
            Gate::AlphaBeta => state.alpha.is_some() && state.beta.is_some(),
            Gate::AlphaBetaGamma => {
                state.alpha.is_some() && state.beta.is_some() && state.gamma.is_some()
            }
            Gate::Gamma => state.gamma.is_some(),
            Gate::Branch => state.branch.is_some(),
            Gate::PrNumber => state.pr_number.is_some(),
        }
    }
}
