//! End-to-end tests against the mock gitagent server
//!
//! These drive the real transport, client, scenario runner and cleanup
//! planner against the `mock-gitagent` binary, so everything except the
//! `git`/`gh` side channel is exercised for real.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use harness::common::Config;
use harness::report::Reporter;
use harness::scenario::{cleanup, Scenario};
use harness::{Client, ToolResult, Transport};

fn mock_server() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mock-gitagent"))
}

async fn connect(server: &Path, repo: &Path) -> Client {
    let transport = Transport::spawn(server, repo).await.expect("spawn mock");
    let mut client = Client::new(transport);
    client.initialize().await.expect("handshake");
    client
}

/// Wrapper script that injects MOCK_FAIL_TOOLS without touching the test
/// process environment (tests run in parallel).
#[cfg(unix)]
fn failing_server(dir: &Path, tools: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("mock-failing.sh");
    let body = format!(
        "#!/bin/sh\nMOCK_FAIL_TOOLS={tools} exec {} \"$@\"\n",
        mock_server().display()
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[tokio::test]
async fn test_full_scenario_all_checks_pass() {
    let repo = tempfile::tempdir().unwrap();
    let config = Config::resolve(Some(mock_server()), Some(repo.path().to_path_buf())).unwrap();

    let mut client = connect(&config.server, &config.repo).await;
    let mut report = Reporter::new();
    let mut scenario = Scenario::new(&config);

    scenario.run(&mut client, &mut report).await.unwrap();

    assert_eq!(report.failed(), &[] as &[String], "no check may fail");
    assert_eq!(report.passed().len(), 22);

    // 1 handshake + 21 tool calls, ids allocated strictly in sequence.
    assert_eq!(client.next_id(), 22);

    // Creation steps populated the workflow state.
    assert_eq!(scenario.state.alpha, Some(100));
    assert_eq!(scenario.state.beta, Some(101));
    assert_eq!(scenario.state.gamma, Some(102));
    assert_eq!(scenario.state.branch.as_deref(), Some("fix/100-e2e-smoke"));
    assert_eq!(scenario.state.pr_number, Some(40));
    assert_eq!(scenario.state.original_branch, "main");

    // The marker file was written and shows up in the teardown plan.
    assert!(config.marker_file().exists());
    let steps = cleanup::plan(&scenario.state, config.marker_file().exists());
    assert!(steps.contains(&cleanup::Step::RemoveMarker));
    assert!(steps.contains(&cleanup::Step::ClosePullRequest { number: 40 }));

    client.shutdown().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_creation_skips_dependents_not_fails_them() {
    let repo = tempfile::tempdir().unwrap();
    let server = failing_server(repo.path(), "create_issue");
    let config = Config::resolve(Some(server), Some(repo.path().to_path_buf())).unwrap();

    let mut client = connect(&config.server, &config.repo).await;
    let mut report = Reporter::new();
    let mut scenario = Scenario::new(&config);

    scenario.run(&mut client, &mut report).await.unwrap();

    // Exactly one failure: the creation itself. Everything gated on alpha
    // produced zero outcomes.
    assert_eq!(report.failed(), ["create_issue"]);
    assert_eq!(
        report.passed(),
        [
            "get_project_state",
            "get_next_task",
            "get_current_branch",
            "decompose_feature",
            "create_issues_batch",
            "close_issue",
        ]
    );

    assert_eq!(scenario.state.alpha, None);
    assert!(scenario.state.branch.is_none());
    assert!(scenario.state.pr_number.is_none());

    // Cleanup still closes the batch issue that did get created.
    let steps = cleanup::plan(&scenario.state, false);
    assert_eq!(
        steps,
        vec![
            cleanup::Step::CheckoutOriginal {
                branch: "main".to_string()
            },
            cleanup::Step::CloseIssue { number: 100 },
        ]
    );

    client.shutdown().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_pr_creation_skips_pr_tools() {
    let repo = tempfile::tempdir().unwrap();
    let server = failing_server(repo.path(), "create_pr");
    let config = Config::resolve(Some(server), Some(repo.path().to_path_buf())).unwrap();

    let mut client = connect(&config.server, &config.repo).await;
    let mut report = Reporter::new();
    let mut scenario = Scenario::new(&config);

    scenario.run(&mut client, &mut report).await.unwrap();

    assert_eq!(report.failed(), ["create_pr"]);
    // Nothing gated on the PR number ran.
    for name in report.passed() {
        assert!(!name.contains("pr_status"), "unexpected outcome {name}");
        assert!(!name.contains("review_pr_impact"), "unexpected outcome {name}");
    }
    assert_eq!(scenario.state.pr_number, None);

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_tool_results_and_strictly_increasing_ids() {
    let repo = tempfile::tempdir().unwrap();
    let mut client = connect(&mock_server(), repo.path()).await;

    assert_eq!(client.next_id(), 1, "handshake consumed id 0");

    let r = client
        .call("create_issue", json!({"title": "[TEST] direct", "body": "", "labels": []}))
        .await
        .unwrap();
    assert!(r.get("number").and_then(Value::as_u64).unwrap() > 0);
    assert_eq!(client.next_id(), 2);

    let r = client
        .call(
            "create_issues_batch",
            json!({"issues": [{"title": "a"}, {"title": "b"}]}),
        )
        .await
        .unwrap();
    let items = r.as_array().unwrap();
    assert_eq!(items.len(), 2);
    for item in items {
        assert!(item.get("number").and_then(Value::as_u64).unwrap() > 0);
    }

    let r = client
        .call("prioritize_issues", json!({"issue_numbers": [3, 2, 1]}))
        .await
        .unwrap();
    assert_eq!(
        r.get("prioritized").and_then(Value::as_array).unwrap().len(),
        3
    );

    assert_eq!(client.next_id(), 4);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_tool_normalizes_to_error_result() {
    let repo = tempfile::tempdir().unwrap();
    let mut client = connect(&mock_server(), repo.path()).await;

    let r = client.call("no_such_tool", json!({})).await.unwrap();
    match r {
        ToolResult::Error(msg) => assert!(msg.contains("unknown tool")),
        other => panic!("expected error result, got {other:?}"),
    }

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bad_pr_number_is_structured_error_payload() {
    let repo = tempfile::tempdir().unwrap();
    let mut client = connect(&mock_server(), repo.path()).await;

    let r = client
        .call("review_pr_impact", json!({"pr_number": 999999}))
        .await
        .unwrap();
    let message = r.error_message().expect("structured error expected");
    assert!(!message.is_empty());

    client.shutdown().await.unwrap();
}
