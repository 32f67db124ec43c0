//! Mock gitagent server binary for integration testing
//!
//! Speaks the same newline-delimited JSON-RPC wire protocol as the real
//! server, backed by in-memory state, so the harness can be exercised
//! without a repository or network access. Setting `MOCK_FAIL_TOOLS` to a
//! comma-separated list of tool names makes those tools return an error
//! envelope, which the integration tests use to exercise gating.

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};

use serde_json::{json, Value};

fn main() {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let mut state = MockState::new();

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            break; // EOF: harness closed its write side, exit cleanly
        }

        let message: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => continue,
        };

        if let Some(response) = state.process_message(&message) {
            send_line(&mut writer, &response);
        }
    }
}

fn send_line<W: Write>(writer: &mut W, message: &Value) {
    let body = serde_json::to_string(message).unwrap();
    writer.write_all(body.as_bytes()).ok();
    writer.write_all(b"\n").ok();
    writer.flush().ok();
}

struct MockState {
    next_issue: u64,
    next_pr: u64,
    issues: Vec<(u64, String)>,
    open_prs: Vec<(u64, String)>,
    current_branch: String,
    branch_issue: Option<u64>,
    fail_tools: HashSet<String>,
}

impl MockState {
    fn new() -> Self {
        let fail_tools = std::env::var("MOCK_FAIL_TOOLS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            next_issue: 100,
            next_pr: 40,
            issues: vec![(1, "Seed issue".to_string())],
            open_prs: Vec::new(),
            current_branch: "main".to_string(),
            branch_issue: None,
            fail_tools,
        }
    }

    fn process_message(&mut self, message: &Value) -> Option<Value> {
        let id = message.get("id")?.as_u64()?;
        let method = message.get("method")?.as_str()?;
        let params = message.get("params").cloned().unwrap_or(json!({}));

        match method {
            "initialize" => Some(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "protocolVersion": "2025-03-26", "capabilities": {} }
            })),
            "invoke-tool" => {
                let tool = params
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

                if self.fail_tools.contains(&tool) {
                    return Some(error_response(
                        id,
                        &format!("induced failure for {tool}"),
                    ));
                }

                match self.invoke(&tool, &arguments) {
                    Ok(payload) => Some(tool_response(id, &payload)),
                    Err(message) => Some(error_response(id, &message)),
                }
            }
            other => Some(error_response(id, &format!("unknown method: {other}"))),
        }
    }

    fn invoke(&mut self, tool: &str, args: &Value) -> Result<Value, String> {
        match tool {
            "get_project_state" => Ok(json!({
                "issues": self.issues.iter()
                    .map(|(n, t)| json!({"number": n, "title": t}))
                    .collect::<Vec<_>>(),
                "open_prs": self.open_prs.iter()
                    .map(|(n, t)| json!({"number": n, "title": t}))
                    .collect::<Vec<_>>(),
            })),
            "get_next_task" => Ok(json!({"number": 1, "title": "Seed issue"})),
            "get_current_branch" => {
                let mut payload = json!({"branch": self.current_branch});
                if let Some(issue) = self.branch_issue {
                    payload["issue_number"] = json!(issue);
                }
                Ok(payload)
            }
            "decompose_feature" => Ok(json!({
                "available_labels": ["type:infra", "type:feat", "type:bug"],
                "instructions": "Split the feature into labeled issues.",
            })),
            "create_issue" => {
                let number = self.create_issue(args.get("title"));
                Ok(json!({"number": number, "url": format!("https://example.test/issues/{number}")}))
            }
            "create_issues_batch" => {
                let items = args
                    .get("issues")
                    .and_then(Value::as_array)
                    .ok_or("issues must be a list")?
                    .clone();
                let created: Vec<Value> = items
                    .iter()
                    .map(|item| {
                        let number = self.create_issue(item.get("title"));
                        json!({"number": number, "url": format!("https://example.test/issues/{number}")})
                    })
                    .collect();
                Ok(json!(created))
            }
            "update_issue" => {
                let number = require_u64(args, "issue_number")?;
                Ok(json!({"updated": number}))
            }
            "prioritize_issues" => {
                let numbers = args
                    .get("issue_numbers")
                    .and_then(Value::as_array)
                    .ok_or("issue_numbers must be a list")?;
                Ok(json!({"prioritized": numbers}))
            }
            "link_issues" => {
                let blocks = args
                    .get("blocks")
                    .and_then(Value::as_array)
                    .ok_or("blocks must be a list")?;
                Ok(json!({"linked": blocks}))
            }
            "close_issue" => {
                let number = require_u64(args, "issue_number")?;
                self.issues.retain(|(n, _)| *n != number);
                Ok(json!({"closed": number}))
            }
            "create_branch" => {
                let number = require_u64(args, "issue_number")?;
                let branch_type = args
                    .get("branch_type")
                    .and_then(Value::as_str)
                    .unwrap_or("fix");
                let branch = format!("{branch_type}/{number}-e2e-smoke");
                self.current_branch = branch.clone();
                self.branch_issue = Some(number);
                Ok(json!({"branch": branch}))
            }
            "commit_with_context" => Ok(json!({"committed": true, "ref": "abc1234"})),
            "push_branch" => Ok(json!({"pushed": true, "branch": self.current_branch})),
            "list_open_prs" => Ok(json!(self
                .open_prs
                .iter()
                .map(|(n, t)| json!({"number": n, "title": t}))
                .collect::<Vec<_>>())),
            "create_pr" => {
                let number = self.next_pr;
                self.next_pr += 1;
                let title = args
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or("untitled")
                    .to_string();
                self.open_prs.push((number, title));
                Ok(json!({"number": number, "url": format!("https://example.test/pulls/{number}")}))
            }
            "get_pr_status" => {
                let number = require_u64(args, "pr_number")?;
                if self.open_prs.iter().any(|(n, _)| *n == number) {
                    Ok(json!({"number": number, "state": "open", "mergeable": true}))
                } else {
                    Ok(json!({"error": format!("PR #{number} not found")}))
                }
            }
            "review_pr_impact" => {
                let number = require_u64(args, "pr_number")?;
                if self.open_prs.iter().any(|(n, _)| *n == number) {
                    Ok(json!({
                        "files_changed": [".mcp-e2e-test"],
                        "symbols": [
                            {"name": "marker", "file": ".mcp-e2e-test", "referenced_by": []}
                        ],
                        "search_tool": "rg",
                    }))
                } else {
                    Ok(json!({"error": format!("PR #{number} not found")}))
                }
            }
            other => Err(format!("unknown tool: {other}")),
        }
    }

    fn create_issue(&mut self, title: Option<&Value>) -> u64 {
        let number = self.next_issue;
        self.next_issue += 1;
        let title = title
            .and_then(Value::as_str)
            .unwrap_or("untitled")
            .to_string();
        self.issues.push((number, title));
        number
    }
}

fn require_u64(args: &Value, field: &str) -> Result<u64, String> {
    args.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("missing {field}"))
}

fn tool_response(id: u64, payload: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "content": [
                { "type": "text", "text": payload.to_string() }
            ]
        }
    })
}

fn error_response(id: u64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": -32000, "message": message }
    })
}
