//! # Print Spooler
//!
//! Background delivery queue. Checkout hands a rendered receipt to the
//! spooler and moves on; the worker owns the transport and works through
//! jobs one at a time. Delivery failures are logged and dropped - a dead
//! printer must never block or fail a sale.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::transport::{Connector, PrinterTransport};

/// Jobs waiting behind a stuck printer before enqueue starts dropping.
/// 3 retries x 1s plus the settle delay bounds one job at ~5s, so a
/// backlog this size means the printer has been dead for minutes.
const QUEUE_DEPTH: usize = 64;

/// Cloneable handle to the background print worker.
#[derive(Debug, Clone)]
pub struct PrintSpooler {
    tx: mpsc::Sender<Vec<u8>>,
}

impl PrintSpooler {
    /// Spawns the worker task that owns `transport`. The worker exits
    /// when every handle has been dropped.
    pub fn spawn<C: Connector>(transport: PrinterTransport<C>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(QUEUE_DEPTH);

        let worker = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                if let Err(err) = transport.print(&payload).await {
                    error!(error = %err, bytes = payload.len(), "receipt dropped");
                }
            }
            info!("print spooler stopped");
        });

        (PrintSpooler { tx }, worker)
    }

    /// Queues a payload for delivery. Fire-and-forget: a full queue or a
    /// stopped worker logs a warning and drops the job.
    pub fn enqueue(&self, payload: Vec<u8>) {
        if let Err(err) = self.tx.try_send(payload) {
            warn!(error = %err, "print queue rejected job");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RetryPolicy;
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::AsyncWrite;

    struct SinkStream {
        sink: Arc<Mutex<Vec<u8>>>,
    }

    impl AsyncWrite for SinkStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.sink.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct SinkConnector {
        sink: Arc<Mutex<Vec<u8>>>,
        refuse: bool,
    }

    impl Connector for SinkConnector {
        type Stream = SinkStream;

        async fn connect(&self) -> io::Result<SinkStream> {
            if self.refuse {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "offline"));
            }
            Ok(SinkStream {
                sink: Arc::clone(&self.sink),
            })
        }
    }

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            retry_delay: Duration::from_millis(1),
            settle_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn jobs_are_delivered_in_order() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let connector = SinkConnector {
            sink: Arc::clone(&sink),
            refuse: false,
        };
        let transport = PrinterTransport::new(connector, "printer", instant_policy());
        let (spooler, worker) = PrintSpooler::spawn(transport);

        spooler.enqueue(b"first|".to_vec());
        spooler.enqueue(b"second".to_vec());
        drop(spooler);
        worker.await.unwrap();

        assert_eq!(sink.lock().unwrap().as_slice(), b"first|second");
    }

    #[tokio::test]
    async fn failed_delivery_does_not_stop_the_worker() {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let connector = SinkConnector {
            sink: Arc::clone(&sink),
            refuse: true,
        };
        let transport = PrinterTransport::new(connector, "printer", instant_policy());
        let (spooler, worker) = PrintSpooler::spawn(transport);

        spooler.enqueue(b"lost".to_vec());
        drop(spooler);
        // The worker drains the queue and exits cleanly despite the failure.
        worker.await.unwrap();
        assert!(sink.lock().unwrap().is_empty());
    }
}
