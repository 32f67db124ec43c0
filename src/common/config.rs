//! Harness configuration
//!
//! The harness takes no behavioral flags: the only inputs are the server
//! binary to launch and the repository it should operate on, either as
//! positional arguments or through the environment.

use std::env;
use std::path::PathBuf;

use super::{Error, Result};

/// Environment variable naming the server binary.
pub const SERVER_ENV: &str = "GITAGENT_MCP_BIN";

/// Environment variable naming the target repository, also passed through
/// to the server process.
pub const REPO_ENV: &str = "REPO_PATH";

/// Bound on how long `Transport::shutdown` waits for the server to exit.
pub const SHUTDOWN_WAIT_SECS: u64 = 5;

/// Resolved harness configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the gitagent server binary
    pub server: PathBuf,
    /// Path to the repository the server operates on
    pub repo: PathBuf,
}

impl Config {
    /// Resolve configuration from optional CLI values with env fallback
    pub fn resolve(server: Option<PathBuf>, repo: Option<PathBuf>) -> Result<Self> {
        let server = server
            .or_else(|| env::var_os(SERVER_ENV).map(PathBuf::from))
            .ok_or_else(|| {
                Error::Config(format!(
                    "no server binary given (pass it as the first argument or set {SERVER_ENV})"
                ))
            })?;

        let repo = repo
            .or_else(|| env::var_os(REPO_ENV).map(PathBuf::from))
            .ok_or_else(|| {
                Error::Config(format!(
                    "no repository path given (pass it as the second argument or set {REPO_ENV})"
                ))
            })?;

        if !repo.is_dir() {
            return Err(Error::Config(format!(
                "repository path '{}' is not a directory",
                repo.display()
            )));
        }

        Ok(Self { server, repo })
    }

    /// Path of the marker file the workflow writes before committing
    pub fn marker_file(&self) -> PathBuf {
        self.repo.join(".mcp-e2e-test")
    }
}
