//! Unconditional best-effort teardown
//!
//! The plan is derived purely from the workflow state, so the "cleanup
//! totality" property is testable without touching a real repository.
//! Execution shells out to the `git` and `gh` CLIs as a side channel
//! outside the RPC protocol; one failing step never blocks the rest.

use std::path::Path;

use tokio::process::Command;

use crate::common::Config;

use super::state::WorkflowState;

/// One teardown action, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `git checkout <original>` to restore the starting branch
    CheckoutOriginal { branch: String },
    /// `gh pr close <n> --delete-branch`
    ClosePullRequest { number: u64 },
    /// `git branch -D <name>`
    DeleteLocalBranch { name: String },
    /// `gh issue close <n> --comment "e2e cleanup"`
    CloseIssue { number: u64 },
    /// Remove the marker file written before the smoke commit
    RemoveMarker,
}

/// Derive the ordered teardown steps for this run
///
/// Gamma is absent on purpose: the scenario closes it mid-run, so only
/// alpha and beta can still be open here.
pub fn plan(state: &WorkflowState, marker_present: bool) -> Vec<Step> {
    let mut steps = vec![Step::CheckoutOriginal {
        branch: state.original_branch.clone(),
    }];

    if let Some(number) = state.pr_number {
        steps.push(Step::ClosePullRequest { number });
    }
    if let Some(name) = &state.branch {
        steps.push(Step::DeleteLocalBranch { name: name.clone() });
    }
    for number in [state.alpha, state.beta].into_iter().flatten() {
        steps.push(Step::CloseIssue { number });
    }
    if marker_present {
        steps.push(Step::RemoveMarker);
    }

    steps
}

/// Run every step, logging failures instead of escalating them
pub async fn execute(config: &Config, steps: &[Step]) {
    for step in steps {
        if let Err(reason) = execute_step(config, step).await {
            tracing::warn!("cleanup step {:?} failed: {}", step, reason);
        }
    }
}

async fn execute_step(config: &Config, step: &Step) -> Result<(), String> {
    match step {
        Step::CheckoutOriginal { branch } => {
            run_quiet("git", &["checkout", branch], &config.repo).await?;
            println!("  checked out {branch}");
            Ok(())
        }
        Step::ClosePullRequest { number } => {
            run_quiet(
                "gh",
                &["pr", "close", &number.to_string(), "--delete-branch"],
                &config.repo,
            )
            .await?;
            println!("  PR #{number} closed");
            Ok(())
        }
        Step::DeleteLocalBranch { name } => {
            run_quiet("git", &["branch", "-D", name], &config.repo).await?;
            println!("  local branch {name} deleted");
            Ok(())
        }
        Step::CloseIssue { number } => {
            run_quiet(
                "gh",
                &["issue", "close", &number.to_string(), "--comment", "e2e cleanup"],
                &config.repo,
            )
            .await?;
            println!("  issue #{number} closed");
            Ok(())
        }
        Step::RemoveMarker => {
            let marker = config.marker_file();
            std::fs::remove_file(&marker).map_err(|e| e.to_string())?;
            println!("  removed {}", marker.display());
            Ok(())
        }
    }
}

/// Run a side-channel command, surfacing stderr as the failure reason
async fn run_quiet(program: &str, args: &[&str], cwd: &Path) -> Result<(), String> {
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}
