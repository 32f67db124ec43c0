//! JSON-RPC client side of the gitagent wire protocol
//!
//! Messages are newline-delimited JSON over the server's standard streams,
//! strictly half-duplex: one request line out, one response line in.

pub mod client;
pub mod transport;
pub mod types;

pub use client::Client;
pub use transport::Transport;
pub use types::{Response, ToolResult};
