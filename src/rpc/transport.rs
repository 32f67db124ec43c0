//! Child process transport
//!
//! Owns the server subprocess and its two stream endpoints. Every message is
//! one line of JSON, written with an immediate flush; reads block until a
//! full line is available. There is no read timeout: a hung server hangs the
//! harness (documented limitation, preserved on purpose).

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::common::config::{REPO_ENV, SHUTDOWN_WAIT_SECS};
use crate::common::{Error, Result};

/// Newline-delimited JSON channel over a server subprocess
#[derive(Debug)]
pub struct Transport {
    child: Child,
    reader: BufReader<ChildStdout>,
    /// Write side; dropped by `shutdown` to signal end of session
    writer: Option<BufWriter<ChildStdin>>,
}

impl Transport {
    /// Spawn the server with the repository path in its environment
    pub async fn spawn(program: &Path, repo: &Path) -> Result<Self> {
        let mut cmd = Command::new(program);
        cmd.env(REPO_ENV, repo)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| Error::Launch {
            program: program.display().to_string(),
            source: e,
        })?;

        let stdin = child.stdin.take().ok_or_else(|| Error::Launch {
            program: program.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "failed to open server stdin"),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| Error::Launch {
            program: program.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "failed to open server stdout"),
        })?;

        Ok(Self {
            child,
            reader: BufReader::new(stdout),
            writer: Some(BufWriter::new(stdin)),
        })
    }

    /// Write one message followed by a newline and flush immediately
    pub async fn send(&mut self, message: &Value) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::ConnectionClosed)?;
        let json = serde_json::to_string(message)?;
        tracing::debug!(">>> {}", json);

        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Block until one full line is available
    pub async fn recv_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Err(Error::ConnectionClosed);
        }
        tracing::debug!("<<< {}", line.trim_end());
        Ok(line)
    }

    /// Close the write side and wait for the server to exit
    ///
    /// The wait is bounded; a server that outlives it is a hard error
    /// rather than getting force-killed, since a well-behaved peer exits
    /// promptly once its stdin closes.
    pub async fn shutdown(mut self) -> Result<()> {
        drop(self.writer.take());

        match tokio::time::timeout(
            Duration::from_secs(SHUTDOWN_WAIT_SECS),
            self.child.wait(),
        )
        .await
        {
            Ok(status) => {
                let status = status?;
                tracing::debug!("server exited: {}", status);
                Ok(())
            }
            Err(_) => Err(Error::ShutdownTimeout(SHUTDOWN_WAIT_SECS)),
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // Last-resort kill so a failed run never leaves an orphan server.
        // The normal path goes through shutdown(), which consumes self
        // after the child has already exited.
        let _ = self.child.start_kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// `cat` echoes lines back untouched, which is all the transport
    /// contract needs: one line out, one line in, EOF on close.
    #[tokio::test]
    async fn test_round_trip_through_cat() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = Transport::spawn(Path::new("cat"), dir.path())
            .await
            .unwrap();

        transport.send(&json!({"id": 1})).await.unwrap();
        let line = transport.recv_line().await.unwrap();
        assert_eq!(line.trim_end(), r#"{"id":1}"#);

        transport.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_recv_after_peer_exit_is_connection_closed() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = Transport::spawn(Path::new("true"), dir.path())
            .await
            .unwrap();

        let err = transport.recv_line().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Transport::spawn(Path::new("/nonexistent/gitagent-mcp"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Launch { .. }));
    }
}
