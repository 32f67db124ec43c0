//! Scenario runner: the fixed five-phase tool workflow
//!
//! Phases execute strictly in order. Each step is gated on the workflow
//! state; a missing prerequisite skips the step (zero outcomes) rather than
//! failing it, so one failed creation never cascades. Whatever happens
//! inside the scenario body, teardown runs exactly once afterwards.

pub mod cleanup;
pub mod state;

use serde_json::{json, Value};

use crate::check::{check, equals, pred};
use crate::common::{Config, Result};
use crate::report::Reporter;
use crate::rpc::{Client, ToolResult, Transport};

pub use state::{Gate, WorkflowState};

/// Spawn the server, run the scenario, tear everything down, summarize
///
/// Returns `Ok(true)` only when every recorded check passed. Transport
/// failures abort the scenario body but never the teardown.
pub async fn run_harness(config: &Config) -> Result<bool> {
    let transport = Transport::spawn(&config.server, &config.repo).await?;
    let mut client = Client::new(transport);
    client.initialize().await?;

    let mut report = Reporter::new();
    let mut scenario = Scenario::new(config);

    let outcome = scenario.run(&mut client, &mut report).await;

    // Teardown path: reached on normal completion and on error alike.
    let shutdown = client.shutdown().await;

    println!("\n-- Cleanup --");
    let steps = cleanup::plan(&scenario.state, config.marker_file().exists());
    cleanup::execute(config, &steps).await;

    outcome?;
    shutdown?;
    Ok(report.summary())
}

/// The ordered, gated sequence of tool invocations
pub struct Scenario<'a> {
    config: &'a Config,
    pub state: WorkflowState,
}

impl<'a> Scenario<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            state: WorkflowState::default(),
        }
    }

    /// Execute all five phases in order
    pub async fn run(&mut self, client: &mut Client, report: &mut Reporter) -> Result<()> {
        println!("\n[1/5] Read-only tools");
        self.read_only_probes(client, report).await?;

        println!("\n[2/5] Issue management");
        self.issue_management(client, report).await?;

        println!("\n[3/5] Branch & commit workflow");
        self.branch_and_commit(client, report).await?;

        println!("\n[4/5] PR tools");
        self.pull_request_tools(client, report).await?;

        println!("\n[5/5] PR impact analysis");
        self.impact_analysis(client, report).await?;

        Ok(())
    }

    /// Phase 1: baseline probes, no preconditions
    async fn read_only_probes(
        &mut self,
        client: &mut Client,
        report: &mut Reporter,
    ) -> Result<()> {
        let r = client.call("get_project_state", json!({})).await?;
        let issues = r.get("issues").and_then(Value::as_array).map_or(0, Vec::len);
        let prs = r.get("open_prs").and_then(Value::as_array).map_or(0, Vec::len);
        check(
            report,
            "get_project_state",
            &r,
            &format!("{issues} issues, {prs} PRs"),
            &[("issues", pred(nonempty_list))],
        );

        // get_next_task legitimately returns null when the backlog is empty,
        // so it gets bespoke handling instead of the usual null-fails rule.
        let r = client.call("get_next_task", json!({})).await?;
        match &r {
            task if no_tasks(task) => report.ok("get_next_task", "no tasks"),
            task if task.get_u64("number").is_some() => {
                let title: String = task
                    .get_str("title")
                    .unwrap_or_default()
                    .chars()
                    .take(40)
                    .collect();
                let number = task.get_u64("number").unwrap_or(0);
                report.ok("get_next_task", &format!("#{number} {title}"));
            }
            other => report.fail("get_next_task", &format!("{other:?}")),
        }

        let r = client.call("get_current_branch", json!({})).await?;
        if let Some(branch) = r.get_str("branch") {
            self.state.original_branch = branch.to_string();
        }
        let detail = r.get_str("branch").unwrap_or_default().to_string();
        check(
            report,
            "get_current_branch",
            &r,
            &detail,
            &[("branch", pred(nonempty_string))],
        );

        let r = client
            .call(
                "decompose_feature",
                json!({"feature_description": "add full-text search"}),
            )
            .await?;
        let labels = r
            .get("available_labels")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        check(
            report,
            "decompose_feature",
            &r,
            &format!("{labels} labels"),
            &[
                ("available_labels", pred(nonempty_list)),
                ("instructions", pred(|v| v.is_string())),
            ],
        );

        Ok(())
    }

    /// Phase 2: issue creation, update, linking, closure
    async fn issue_management(
        &mut self,
        client: &mut Client,
        report: &mut Reporter,
    ) -> Result<()> {
        let r = client
            .call(
                "create_issue",
                json!({
                    "title": "[TEST] MCP e2e alpha",
                    "body": "E2E test.",
                    "labels": ["type:infra"],
                }),
            )
            .await?;
        let detail = format!(
            "#{} {}",
            r.get_u64("number").unwrap_or(0),
            r.get_str("url").unwrap_or_default()
        );
        if check(
            report,
            "create_issue",
            &r,
            &detail,
            &[("number", pred(positive_number))],
        ) {
            self.state.alpha = r.get_u64("number");
        }

        let r = client
            .call(
                "create_issues_batch",
                json!({
                    "issues": [
                        {"title": "[TEST] MCP e2e batch-beta",  "body": "batch 1", "labels": ["type:infra"]},
                        {"title": "[TEST] MCP e2e batch-gamma", "body": "batch 2", "labels": ["type:infra"]},
                    ],
                }),
            )
            .await?;
        match batch_numbers(&r) {
            Some((beta, gamma)) => {
                self.state.beta = Some(beta);
                self.state.gamma = Some(gamma);
                report.ok("create_issues_batch", &format!("#{beta}, #{gamma}"));
            }
            None => report.fail("create_issues_batch", &format!("unexpected: {r:?}")),
        }

        if let Some(alpha) = self.gated(Gate::Alpha, self.state.alpha) {
            let r = client
                .call(
                    "update_issue",
                    json!({
                        "issue_number": alpha,
                        "title": "[TEST] MCP e2e alpha (updated)",
                        "add_labels": ["priority:p2"],
                    }),
                )
                .await?;
            check(
                report,
                "update_issue",
                &r,
                &format!("#{alpha}"),
                &[("updated", equals(alpha))],
            );
        }

        if Gate::AlphaBetaGamma.ready(&self.state) {
            let (alpha, beta, gamma) = (
                self.state.alpha.unwrap_or_default(),
                self.state.beta.unwrap_or_default(),
                self.state.gamma.unwrap_or_default(),
            );
            let r = client
                .call(
                    "prioritize_issues",
                    json!({"issue_numbers": [gamma, beta, alpha]}),
                )
                .await?;
            let detail = r
                .get("prioritized")
                .map(Value::to_string)
                .unwrap_or_default();
            check(
                report,
                "prioritize_issues",
                &r,
                &detail,
                &[("prioritized", pred(|v| v.as_array().is_some_and(|a| a.len() == 3)))],
            );
        }

        if Gate::AlphaBeta.ready(&self.state) {
            let (alpha, beta) = (
                self.state.alpha.unwrap_or_default(),
                self.state.beta.unwrap_or_default(),
            );
            let r = client
                .call(
                    "link_issues",
                    json!({"issue_number": alpha, "blocks": [beta]}),
                )
                .await?;
            // Servers report linked ids as numbers or strings; accept both.
            let linked = r.get("linked").and_then(Value::as_array);
            let found = linked.is_some_and(|items| {
                items
                    .iter()
                    .any(|v| v.as_u64() == Some(beta) || v.as_str() == Some(&beta.to_string()))
            });
            if found {
                report.ok("link_issues", &format!("#{alpha} blocks #{beta}"));
            } else {
                report.fail(
                    "link_issues",
                    &format!("#{beta} not in {}", r.resolve("linked")),
                );
            }
        }

        if let Some(gamma) = self.gated(Gate::Gamma, self.state.gamma) {
            let r = client
                .call("close_issue", json!({"issue_number": gamma}))
                .await?;
            check(
                report,
                "close_issue",
                &r,
                &format!("#{gamma}"),
                &[("closed", equals(gamma))],
            );
        }

        Ok(())
    }

    /// Phase 3: branch creation, smoke commit, push
    async fn branch_and_commit(
        &mut self,
        client: &mut Client,
        report: &mut Reporter,
    ) -> Result<()> {
        if let Some(alpha) = self.gated(Gate::Alpha, self.state.alpha) {
            let r = client
                .call(
                    "create_branch",
                    json!({"issue_number": alpha, "branch_type": "fix"}),
                )
                .await?;
            let detail = r.get_str("branch").unwrap_or_default().to_string();
            let prefix = format!("fix/{alpha}-");
            if check(
                report,
                "create_branch",
                &r,
                &detail,
                &[("branch", pred(move |v| {
                    v.as_str().is_some_and(|s| s.contains(&prefix))
                }))],
            ) {
                self.state.branch = r.get_str("branch").map(String::from);
            }
        }

        let Some(branch) = self.gated(Gate::Branch, self.state.branch.clone()) else {
            return Ok(());
        };
        let alpha = self.state.alpha.unwrap_or_default();

        let r = client.call("get_current_branch", json!({})).await?;
        let detail = r.get_str("branch").unwrap_or_default().to_string();
        let expected_branch = branch.clone();
        check(
            report,
            "get_current_branch (fix branch)",
            &r,
            &detail,
            &[
                ("branch", equals(expected_branch)),
                ("issue_number", equals(alpha)),
            ],
        );

        std::fs::write(self.config.marker_file(), format!("e2e {branch}\n"))?;

        let r = client
            .call(
                "commit_with_context",
                json!({"message": "test: MCP e2e smoke commit"}),
            )
            .await?;
        let detail = r.get_str("ref").unwrap_or_default().to_string();
        check(
            report,
            "commit_with_context",
            &r,
            &detail,
            &[("committed", equals(true))],
        );

        let r = client.call("push_branch", json!({})).await?;
        let detail = r.get_str("branch").unwrap_or_default().to_string();
        check(report, "push_branch", &r, &detail, &[("pushed", equals(true))]);

        let r = client.call("list_open_prs", json!({})).await?;
        match r.as_array() {
            Some(items) => report.ok("list_open_prs", &format!("{} PRs", items.len())),
            None => report.fail("list_open_prs", &format!("not a list: {r:?}")),
        }

        Ok(())
    }

    /// Phase 4: pull-request creation, status, membership, first impact pass
    async fn pull_request_tools(
        &mut self,
        client: &mut Client,
        report: &mut Reporter,
    ) -> Result<()> {
        if Gate::Branch.ready(&self.state) {
            let alpha = self.state.alpha.unwrap_or_default();
            let r = client
                .call(
                    "create_pr",
                    json!({
                        "title": format!("[TEST] MCP e2e PR #{alpha}"),
                        "body": format!("E2E test PR.\n\nCloses #{alpha}."),
                    }),
                )
                .await?;
            let detail = format!(
                "#{} {}",
                r.get_u64("number").unwrap_or(0),
                r.get_str("url").unwrap_or_default()
            );
            if check(
                report,
                "create_pr",
                &r,
                &detail,
                &[("number", pred(positive_number))],
            ) {
                self.state.pr_number = r.get_u64("number");
            }
        }

        let Some(pr_number) = self.gated(Gate::PrNumber, self.state.pr_number) else {
            return Ok(());
        };

        let r = client
            .call("get_pr_status", json!({"pr_number": pr_number}))
            .await?;
        let detail = format!(
            "state={} mergeable={}",
            r.resolve("state"),
            r.resolve("mergeable")
        );
        check(
            report,
            "get_pr_status",
            &r,
            &detail,
            &[("number", equals(pr_number))],
        );

        let r = client.call("list_open_prs", json!({})).await?;
        let membership = r.as_array().map(|items| {
            (
                items.len(),
                items
                    .iter()
                    .any(|p| p.get("number").and_then(Value::as_u64) == Some(pr_number)),
            )
        });
        match membership {
            Some((count, true)) => report.ok(
                "list_open_prs (with PR)",
                &format!("PR #{pr_number} in {count} PRs"),
            ),
            _ => report.fail(
                "list_open_prs (with PR)",
                &format!("PR #{pr_number} not found"),
            ),
        }

        let r = client
            .call("review_pr_impact", json!({"pr_number": pr_number}))
            .await?;
        let files = r
            .get("files_changed")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let syms = r.get("symbols").and_then(Value::as_array).map_or(0, Vec::len);
        let tool = r.get_str("search_tool").unwrap_or_default().to_string();
        check(
            report,
            "review_pr_impact",
            &r,
            &format!("{files} files, {syms} syms, tool={tool}"),
            &[
                ("files_changed", pred(nonempty_list)),
                ("search_tool", pred(known_search_tool)),
            ],
        );

        Ok(())
    }

    /// Phase 5: impact analysis (valid case, bad input, symbol schema)
    async fn impact_analysis(
        &mut self,
        client: &mut Client,
        report: &mut Reporter,
    ) -> Result<()> {
        let Some(pr_number) = self.gated(Gate::PrNumber, self.state.pr_number) else {
            return Ok(());
        };

        let r_valid = client
            .call("review_pr_impact", json!({"pr_number": pr_number}))
            .await?;
        check(
            report,
            "review_pr_impact (valid PR)",
            &r_valid,
            "",
            &[
                ("files_changed", pred(nonempty_list)),
                ("symbols", pred(|v| v.is_array())),
                ("search_tool", pred(known_search_tool)),
            ],
        );

        // Deliberately invalid identifier: a structured error here is the
        // expected behavior and counts as a passing negative case.
        let r_bad = client
            .call("review_pr_impact", json!({"pr_number": 999_999}))
            .await?;
        match r_bad.error_message().filter(|m| !m.is_empty()) {
            Some(message) => {
                let brief: String = message.chars().take(40).collect();
                report.ok("review_pr_impact (bad PR)", &format!("error={brief}"));
            }
            None => report.fail(
                "review_pr_impact (bad PR)",
                &format!("expected error, got {r_bad:?}"),
            ),
        }

        match r_valid.get("symbols").and_then(Value::as_array) {
            Some(symbols) => {
                if symbols_well_formed(symbols) {
                    report.ok(
                        "review_pr_impact (schema)",
                        &format!("{} symbols validated", symbols.len()),
                    );
                } else {
                    report.fail("review_pr_impact (schema)", "symbol missing required fields");
                }
            }
            None => report.ok("review_pr_impact (schema)", "no symbols to validate"),
        }

        Ok(())
    }

    /// Skip-on-missing-prerequisite: yields the captured value only when the
    /// gate is open, logging the skip at debug level
    fn gated<T>(&self, gate: Gate, value: Option<T>) -> Option<T> {
        if gate.ready(&self.state) {
            value
        } else {
            tracing::debug!("skipping step gated on {:?}", gate);
            None
        }
    }
}

/// An empty backlog arrives as JSON null, or as the literal string "null"
/// from servers that stringify the payload an extra time
fn no_tasks(result: &ToolResult) -> bool {
    match result {
        ToolResult::Value(Value::Null) => true,
        ToolResult::Value(Value::String(s)) => s == "null",
        _ => false,
    }
}

/// Exactly two entries, each a mapping with a positive `number`
fn batch_numbers(result: &ToolResult) -> Option<(u64, u64)> {
    let items = result.as_array()?;
    if items.len() != 2 {
        return None;
    }
    let numbers: Vec<u64> = items
        .iter()
        .filter_map(|item| item.get("number").and_then(Value::as_u64))
        .filter(|&n| n > 0)
        .collect();
    match numbers[..] {
        [beta, gamma] => Some((beta, gamma)),
        _ => None,
    }
}

/// Every symbol entry carries name, file and referenced_by
fn symbols_well_formed(symbols: &[Value]) -> bool {
    symbols.iter().all(|sym| {
        sym.get("name").is_some() && sym.get("file").is_some() && sym.get("referenced_by").is_some()
    })
}

fn nonempty_list(v: &Value) -> bool {
    v.as_array().is_some_and(|a| !a.is_empty())
}

fn nonempty_string(v: &Value) -> bool {
    v.as_str().is_some_and(|s| !s.is_empty())
}

fn positive_number(v: &Value) -> bool {
    v.as_u64().is_some_and(|n| n > 0)
}

fn known_search_tool(v: &Value) -> bool {
    matches!(v.as_str(), Some("zigrep" | "rg" | "grep" | "none"))
}
