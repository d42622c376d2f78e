//! Process shutdown.
//!
//! A single `watch` flag flips to `true` once; every [`ShutdownSignal`]
//! observes it. The flag is flipped by a termination signal or by
//! [`ShutdownHandle::trigger`].

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Cloneable trigger for the shared shutdown flag.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Flips the flag and wakes every waiter. Later calls are no-ops.
    pub fn trigger(&self) {
        self.flag.send_if_modified(|stopped| !std::mem::replace(stopped, true));
    }

    /// Returns a waiter that resolves once the flag is set, immediately if
    /// it already is.
    pub fn wait(&self) -> ShutdownSignal {
        ShutdownSignal(self.flag.subscribe())
    }
}

/// Resolves once shutdown has been triggered.
#[derive(Debug)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
    /// Waits until shutdown is triggered.
    pub async fn wait(mut self) {
        // The sender lives in an Arc held by every handle; losing it also ends the wait.
        let _ = self.0.wait_for(|stopped| *stopped).await;
    }
}

/// Owns the shutdown flag and ties it to SIGTERM/SIGINT (Ctrl+C elsewhere).
#[derive(Debug)]
pub struct SignalHandler {
    handle: ShutdownHandle,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    /// Creates a handler with the flag unset. No signal is watched until
    /// [`spawn_listener`](Self::spawn_listener) is called.
    pub fn new() -> Self {
        Self {
            handle: ShutdownHandle::new(),
        }
    }

    /// Starts a background task that triggers shutdown on the first
    /// termination signal.
    pub fn spawn_listener(&self) {
        let handle = self.shutdown_handle();
        tokio::spawn(async move {
            match termination().await {
                Ok(name) => {
                    info!(signal = name, "Shutting down");
                    handle.trigger();
                }
                Err(e) => warn!(error = %e, "Signal handling unavailable"),
            }
        });
    }

    /// Returns a waiter for the shutdown flag.
    pub fn shutdown(&self) -> ShutdownSignal {
        self.handle.wait()
    }

    /// Returns a handle that can trigger shutdown without a signal.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.clone()
    }
}

/// Waits for the first termination signal and returns its name.
#[cfg(unix)]
async fn termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    Ok(tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn resolves(signal: ShutdownSignal) -> bool {
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn trigger_from_another_task_releases_waiters() {
        let handler = SignalHandler::new();
        let first = handler.shutdown();
        let second = handler.shutdown();
        let handle = handler.shutdown_handle();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.trigger();
        });

        let both = async {
            first.wait().await;
            second.wait().await;
        };
        assert!(tokio::time::timeout(Duration::from_millis(500), both).await.is_ok());
    }

    #[tokio::test]
    async fn waiter_created_after_trigger_returns_immediately() {
        let handler = SignalHandler::new();
        let handle = handler.shutdown_handle();
        handle.trigger();
        handle.trigger();

        assert!(resolves(handle.wait()).await);
        assert!(resolves(handler.shutdown()).await);
    }

    #[tokio::test]
    async fn untriggered_signal_stays_pending() {
        let handler = SignalHandler::new();
        assert!(!resolves(handler.shutdown()).await);
    }
}
