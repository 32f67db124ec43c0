//! Declarative per-field result validation
//!
//! A check evaluates a list of `(field, expectation)` pairs against one
//! normalized tool result and records exactly one outcome in the reporter.
//! Evaluation is pure over its inputs, so an identical (name, result,
//! expectations) triple always yields an identical outcome.

use serde_json::Value;

use crate::report::Reporter;
use crate::rpc::ToolResult;

/// One expectation against a resolved field value
pub enum Expect {
    /// Must structurally equal the literal
    Equals(Value),
    /// Must evaluate true
    Pred(Box<dyn Fn(&Value) -> bool>),
}

/// Literal expectation
pub fn equals(value: impl Into<Value>) -> Expect {
    Expect::Equals(value.into())
}

/// Predicate expectation
pub fn pred<F>(f: F) -> Expect
where
    F: Fn(&Value) -> bool + 'static,
{
    Expect::Pred(Box::new(f))
}

/// Evaluate `expects` against `result`, record one outcome, return pass/fail
///
/// A null result fails with "returned nothing"; a result carrying an error
/// fails with that message; otherwise each pair is evaluated in order and
/// the first violation becomes the recorded failure reason. Fields resolve
/// against the mapping's member, or against the result itself for scalar
/// and sequence payloads.
pub fn check(
    report: &mut Reporter,
    name: &str,
    result: &ToolResult,
    detail: &str,
    expects: &[(&str, Expect)],
) -> bool {
    match evaluate(result, expects) {
        None => {
            report.ok(name, detail);
            true
        }
        Some(reason) => {
            report.fail(name, &reason);
            false
        }
    }
}

/// First violation, or `None` when every expectation holds
fn evaluate(result: &ToolResult, expects: &[(&str, Expect)]) -> Option<String> {
    if result.is_null() {
        return Some("returned nothing".to_string());
    }
    if let Some(message) = result.error_message() {
        return Some(message.to_string());
    }

    for (field, expect) in expects {
        let value = result.resolve(field);
        match expect {
            Expect::Pred(predicate) => {
                if !predicate(&value) {
                    return Some(format!("{field}={value} failed"));
                }
            }
            Expect::Equals(expected) => {
                if &value != expected {
                    return Some(format!("{field}: expected {expected}, got {value}"));
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(v: Value) -> ToolResult {
        ToolResult::Value(v)
    }

    #[test]
    fn test_null_result_fails() {
        let mut report = Reporter::new();
        assert!(!check(&mut report, "t", &mapping(Value::Null), "", &[]));
        assert_eq!(report.failed(), ["t"]);
    }

    #[test]
    fn test_error_result_fails_with_message() {
        let mut report = Reporter::new();
        let result = ToolResult::Error("server exploded".to_string());
        assert!(!check(&mut report, "t", &result, "", &[]));
    }

    #[test]
    fn test_payload_error_field_fails() {
        let mut report = Reporter::new();
        let result = mapping(json!({"error": "bad input"}));
        assert!(!check(&mut report, "t", &result, "", &[]));
    }

    #[test]
    fn test_predicate_and_literal_pass() {
        let mut report = Reporter::new();
        let result = mapping(json!({"number": 42, "closed": 42}));
        let passed = check(
            &mut report,
            "t",
            &result,
            "detail",
            &[
                ("number", pred(|v| v.as_u64().is_some_and(|n| n > 0))),
                ("closed", equals(42)),
            ],
        );
        assert!(passed);
        assert_eq!(report.passed(), ["t"]);
    }

    #[test]
    fn test_first_violation_wins() {
        let mut report = Reporter::new();
        let result = mapping(json!({"a": 1, "b": 2}));
        check(
            &mut report,
            "t",
            &result,
            "",
            &[("a", equals(9)), ("b", equals(9))],
        );
        // Only one outcome is ever recorded per name.
        assert_eq!(report.failed().len(), 1);
    }

    #[test]
    fn test_sequence_resolves_as_itself() {
        let mut report = Reporter::new();
        let result = mapping(json!([{"number": 1}, {"number": 2}]));
        let passed = check(
            &mut report,
            "batch",
            &result,
            "",
            &[("items", pred(|v| v.as_array().is_some_and(|a| a.len() == 2)))],
        );
        assert!(passed);
    }

    #[test]
    fn test_idempotent_outcome() {
        let result = mapping(json!({"n": 3}));
        let expects = |n: i64| vec![("n", equals(n))];
        for _ in 0..3 {
            let mut report = Reporter::new();
            check(&mut report, "same", &result, "", &expects(4));
            assert_eq!(report.failed(), ["same"]);
        }
    }
}
