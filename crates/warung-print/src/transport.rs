//! # Printer Transport
//!
//! Delivers a rendered receipt to a network thermal printer with a small,
//! fixed retry budget.
//!
//! ## Delivery Protocol
//! ```text
//! connect ──fail──► wait retry_delay ──► connect (max_attempts total)
//!    │
//!  write_all + flush          write errors are fatal, never retried
//!    │
//!  wait settle_delay          cheap printers drop bytes if the socket
//!    │                        closes before the buffer drains
//!  close
//! ```
//!
//! The connector is a seam: production uses [`TcpConnector`], tests plug
//! in fakes to script connect failures and capture written bytes.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{PrintError, PrintResult};

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded retry schedule for the connect phase.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total connect attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
    /// Pause after a successful write before closing the socket.
    pub settle_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            settle_delay: Duration::from_secs(2),
        }
    }
}

// =============================================================================
// Connector Seam
// =============================================================================

/// Opens a writable link to the printer. One call per delivery attempt.
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncWrite + Unpin + Send;

    fn connect(&self) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Production connector for network thermal printers (usually port 9100).
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        TcpConnector { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> io::Result<TcpStream> {
        TcpStream::connect(&self.addr).await
    }
}

// =============================================================================
// Transport
// =============================================================================

/// One printer endpoint plus its retry schedule.
#[derive(Debug, Clone)]
pub struct PrinterTransport<C> {
    connector: C,
    target: String,
    policy: RetryPolicy,
}

impl PrinterTransport<TcpConnector> {
    pub fn tcp(addr: impl Into<String>, policy: RetryPolicy) -> Self {
        let connector = TcpConnector::new(addr);
        let target = connector.addr().to_string();
        PrinterTransport {
            connector,
            target,
            policy,
        }
    }
}

impl<C: Connector> PrinterTransport<C> {
    pub fn new(connector: C, target: impl Into<String>, policy: RetryPolicy) -> Self {
        PrinterTransport {
            connector,
            target: target.into(),
            policy,
        }
    }

    /// Delivers one payload. Connect failures burn through the retry
    /// budget; a write failure aborts immediately.
    pub async fn print(&self, payload: &[u8]) -> PrintResult<()> {
        let mut stream = self.connect_with_retry().await?;

        if let Err(source) = self.write_payload(&mut stream, payload).await {
            return Err(PrintError::WriteFailed {
                target: self.target.clone(),
                source,
            });
        }

        // Let the printer drain its buffer before we drop the socket.
        tokio::time::sleep(self.policy.settle_delay).await;
        let _ = stream.shutdown().await;

        info!(target = %self.target, bytes = payload.len(), "receipt delivered");
        Ok(())
    }

    async fn connect_with_retry(&self) -> PrintResult<C::Stream> {
        let mut attempt = 1u32;
        loop {
            match self.connector.connect().await {
                Ok(stream) => {
                    debug!(target = %self.target, attempt, "printer connected");
                    return Ok(stream);
                }
                Err(source) if attempt < self.policy.max_attempts => {
                    warn!(
                        target = %self.target,
                        attempt,
                        error = %source,
                        "printer connect failed, retrying"
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                    attempt += 1;
                }
                Err(source) => {
                    return Err(PrintError::ConnectFailed {
                        target: self.target.clone(),
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }

    async fn write_payload(&self, stream: &mut C::Stream, payload: &[u8]) -> io::Result<()> {
        stream.write_all(payload).await?;
        stream.flush().await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
