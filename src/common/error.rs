//! Error types for the harness
//!
//! Only transport-level conditions are fatal `Error`s. Anything recoverable
//! inside the run (an error envelope from a tool, a payload that fails to
//! decode, an expectation that does not hold) is reported as a failed check
//! and never aborts the scenario.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("Failed to launch server '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Server closed the connection (no response line)")]
    ConnectionClosed,

    #[error("Server did not exit within {0} seconds after stdin was closed")]
    ShutdownTimeout(u64),

    // === Protocol Errors ===
    #[error(
        "Response id {} does not match request id {expected}; session desynchronized",
        .got.map_or_else(|| "<missing>".to_string(), |id| id.to_string())
    )]
    Desynchronized { expected: u64, got: Option<u64> },

    #[error("Malformed response line: {0}")]
    MalformedResponse(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
