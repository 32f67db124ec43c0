//! RPC client: envelopes, id allocation, result normalization
//!
//! One `call` is one request line and exactly one response line. Request ids
//! increase strictly for the life of the session, and a response carrying a
//! different id than the request fails the run immediately instead of
//! letting the session desynchronize silently.

use serde_json::{json, Value};

use crate::common::{Error, Result};

use super::transport::Transport;
use super::types::{Response, ToolResult};

/// Protocol version sent in the handshake
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Longest slice of a non-JSON payload echoed back in a failure reason
const TRUNCATE_CHARS: usize = 200;

/// JSON-RPC client over a [`Transport`]
pub struct Client {
    transport: Transport,
    next_id: u64,
}

impl Client {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            next_id: 0,
        }
    }

    /// Id the next request will carry
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Perform the fixed handshake (request id 0)
    ///
    /// The response is consumed and checked for well-formedness and id
    /// correlation only; its contents are otherwise ignored.
    pub async fn initialize(&mut self) -> Result<()> {
        let id = self.allocate_id();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            },
        });

        self.transport.send(&request).await?;
        let line = self.transport.recv_line().await?;
        let response = parse_response(&line)?;
        correlate(&response, id)?;
        Ok(())
    }

    /// Invoke one tool and normalize its result
    ///
    /// Protocol errors and undecodable payloads come back as
    /// [`ToolResult::Error`]; only transport-level failures are `Err`.
    pub async fn call(&mut self, tool: &str, arguments: Value) -> Result<ToolResult> {
        let id = self.allocate_id();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "invoke-tool",
            "params": {
                "name": tool,
                "arguments": arguments,
            },
        });

        self.transport.send(&request).await?;
        let line = self.transport.recv_line().await?;
        let response = parse_response(&line)?;
        correlate(&response, id)?;
        Ok(normalize(response))
    }

    /// Close the session and wait for the server to exit
    pub async fn shutdown(self) -> Result<()> {
        self.transport.shutdown().await
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn parse_response(line: &str) -> Result<Response> {
    serde_json::from_str(line)
        .map_err(|e| Error::MalformedResponse(format!("{e}: {}", truncate(line.trim_end()))))
}

fn correlate(response: &Response, expected: u64) -> Result<()> {
    match response.id {
        Some(id) if id == expected => Ok(()),
        other => Err(Error::Desynchronized {
            expected,
            got: other,
        }),
    }
}

/// Normalize a correlated response into a [`ToolResult`]
///
/// The success shape wraps a content list whose first element's `text`
/// member is itself a JSON-encoded string; that nested string is the
/// actual tool payload.
fn normalize(response: Response) -> ToolResult {
    if response.error.is_some() {
        return ToolResult::Error(
            response
                .error_message()
                .unwrap_or_else(|| "unknown error".to_string()),
        );
    }

    let text = response
        .result
        .as_ref()
        .and_then(|r| r.get("content"))
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|item| item.get("text"))
        .and_then(Value::as_str);

    let Some(text) = text else {
        let raw = response
            .result
            .map(|r| r.to_string())
            .unwrap_or_else(|| "null".to_string());
        return ToolResult::Error(format!("missing text payload: {}", truncate(&raw)));
    };

    match serde_json::from_str(text) {
        Ok(value) => ToolResult::Value(value),
        Err(_) => ToolResult::Error(format!("non-JSON: {}", truncate(text))),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= TRUNCATE_CHARS {
        text.to_string()
    } else {
        text.chars().take(TRUNCATE_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(line: &str) -> Response {
        parse_response(line).unwrap()
    }

    #[test]
    fn test_normalize_success_payload() {
        let resp = response(
            r#"{"id":1,"result":{"content":[{"type":"text","text":"{\"number\":12}"}]}}"#,
        );
        assert_eq!(
            normalize(resp),
            ToolResult::Value(serde_json::json!({"number": 12}))
        );
    }

    #[test]
    fn test_normalize_error_envelope() {
        let resp = response(r#"{"id":1,"error":{"message":"unknown tool"}}"#);
        assert_eq!(normalize(resp), ToolResult::Error("unknown tool".to_string()));
    }

    #[test]
    fn test_normalize_non_json_payload_is_truncated() {
        let long = "x".repeat(300);
        let line = format!(
            r#"{{"id":1,"result":{{"content":[{{"type":"text","text":"{long}"}}]}}}}"#
        );
        let result = normalize(response(&line));
        match result {
            ToolResult::Error(msg) => {
                assert!(msg.starts_with("non-JSON: "));
                assert_eq!(msg.len(), "non-JSON: ".len() + 200);
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_missing_payload() {
        let resp = response(r#"{"id":1,"result":{"content":[]}}"#);
        assert!(matches!(normalize(resp), ToolResult::Error(_)));
    }

    #[test]
    fn test_correlate_rejects_mismatched_id() {
        let resp = response(r#"{"id":7,"result":null}"#);
        let err = correlate(&resp, 6).unwrap_err();
        assert!(matches!(
            err,
            Error::Desynchronized {
                expected: 6,
                got: Some(7)
            }
        ));
    }

    #[test]
    fn test_correlate_reports_absent_id_as_missing() {
        let resp = response(r#"{"result":null}"#);
        let err = correlate(&resp, 0).unwrap_err();
        assert!(matches!(err, Error::Desynchronized { got: None, .. }));
        assert!(err.to_string().contains("<missing>"));
    }

    #[test]
    fn test_parse_rejects_garbage_line() {
        assert!(matches!(
            parse_response("not json at all"),
            Err(Error::MalformedResponse(_))
        ));
    }
}
