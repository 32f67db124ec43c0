//! End-to-end test harness for the gitagent JSON-RPC tool server
//!
//! The harness spawns the server, performs the protocol handshake, drives a
//! fixed five-phase workflow of tool invocations with declarative result
//! checks, and tears every created entity back down regardless of outcome.

pub mod check;
pub mod common;
pub mod report;
pub mod rpc;
pub mod scenario;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use rpc::{Client, ToolResult, Transport};
