//! Wire protocol message types
//!
//! Requests are built with `serde_json::json!`; only the response envelope
//! gets a typed representation. The decoded tool payload keeps whatever
//! shape the tool produced (mapping, sequence, scalar or null), so the
//! validator dispatches on `serde_json::Value` rather than a fixed schema.

use serde::Deserialize;
use serde_json::Value;

/// One response line from the server
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Response {
    /// Human-readable message from the error envelope, if present.
    ///
    /// Falls back to the whole envelope rendered as JSON when the server
    /// omits the conventional `message` member.
    pub fn error_message(&self) -> Option<String> {
        let err = self.error.as_ref()?;
        Some(match err.get("message").and_then(Value::as_str) {
            Some(msg) => msg.to_string(),
            None => err.to_string(),
        })
    }
}

/// Normalized outcome of one tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// Protocol-level error envelope, or a payload that failed to decode
    Error(String),
    /// The decoded payload, unmodified, of whatever shape it is
    Value(Value),
}

impl ToolResult {
    /// Error text carried by this result, if any.
    ///
    /// Covers both the normalized [`ToolResult::Error`] variant and a
    /// decoded mapping that itself carries an `error` string (tools report
    /// bad input that way rather than through the protocol envelope).
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ToolResult::Error(msg) => Some(msg),
            ToolResult::Value(Value::Object(map)) => {
                map.get("error").and_then(Value::as_str)
            }
            _ => None,
        }
    }

    /// True for a null payload ("returned nothing").
    pub fn is_null(&self) -> bool {
        matches!(self, ToolResult::Value(Value::Null))
    }

    /// Resolve a named field for validation.
    ///
    /// Mappings resolve to the field's value (null when absent); every
    /// other shape resolves to the payload itself, so scalar and sequence
    /// expectations can be written against any field name.
    pub fn resolve(&self, field: &str) -> Value {
        match self {
            ToolResult::Value(Value::Object(map)) => {
                map.get(field).cloned().unwrap_or(Value::Null)
            }
            ToolResult::Value(other) => other.clone(),
            ToolResult::Error(_) => Value::Null,
        }
    }

    /// Field lookup on a mapping payload, `None` for any other shape.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            ToolResult::Value(Value::Object(map)) => map.get(field),
            _ => None,
        }
    }

    /// Unsigned integer field convenience used for captured ids.
    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.get(field).and_then(Value::as_u64)
    }

    /// String field convenience used for captured names.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// The payload as a sequence, if it is one.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            ToolResult::Value(Value::Array(items)) => Some(items),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_error_message_prefers_message_member() {
        let resp: Response =
            serde_json::from_str(r#"{"id":3,"error":{"code":-32000,"message":"no such tool"}}"#)
                .unwrap();
        assert_eq!(resp.error_message().unwrap(), "no such tool");
    }

    #[test]
    fn test_response_error_message_falls_back_to_envelope() {
        let resp: Response = serde_json::from_str(r#"{"id":3,"error":{"code":-1}}"#).unwrap();
        assert_eq!(resp.error_message().unwrap(), r#"{"code":-1}"#);
    }

    #[test]
    fn test_tool_result_error_from_payload_mapping() {
        let r = ToolResult::Value(json!({"error": "PR not found"}));
        assert_eq!(r.error_message(), Some("PR not found"));

        let ok = ToolResult::Value(json!({"number": 7}));
        assert_eq!(ok.error_message(), None);
    }

    #[test]
    fn test_resolve_mapping_and_scalar() {
        let mapping = ToolResult::Value(json!({"branch": "main"}));
        assert_eq!(mapping.resolve("branch"), json!("main"));
        assert_eq!(mapping.resolve("missing"), Value::Null);

        let seq = ToolResult::Value(json!([1, 2, 3]));
        assert_eq!(seq.resolve("anything"), json!([1, 2, 3]));
    }
}
