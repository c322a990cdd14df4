//! Signal handling for graceful cancellation
//!
//! A Ctrl-C or SIGTERM flips a `watch` flag. The batch runner checks the flag
//! before starting each entry, so entries already in flight finish normally.

use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Create a cancellation flag, initially unset
pub fn cancellation_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Whether cancellation has been requested
pub fn is_cancelled(flag: &watch::Receiver<bool>) -> bool {
    *flag.borrow()
}

/// Sets the cancellation flag when the process is asked to stop
pub struct SignalHandler {
    cancel_tx: watch::Sender<bool>,
}

impl SignalHandler {
    pub fn new(cancel_tx: watch::Sender<bool>) -> Self {
        Self { cancel_tx }
    }

    /// Spawn the task that waits for Ctrl-C or SIGTERM
    pub fn spawn(self) -> JoinHandle<()> {
        let cancel_tx = self.cancel_tx;

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, finishing in-flight entries");
                },
                _ = terminate => {
                    info!("Received terminate signal, finishing in-flight entries");
                },
            }

            cancel_tx.send_replace(true);
        })
    }
}
