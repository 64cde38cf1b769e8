//! Graceful shutdown.
//!
//! A [`ShutdownSignal`] stops the accept loop; a [`ConnectionTracker`] lets
//! the server wait for in-flight connections before returning. Both are thin
//! wrappers over a shared `tokio::sync::watch` channel.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable shutdown trigger.
///
/// Every clone observes the same trigger.
///
/// # Example
///
/// ```rust
/// use hermes_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let observer = shutdown.clone();
///
/// shutdown.trigger();
/// assert!(observer.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    state: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Triggers shutdown. Idempotent.
    pub fn trigger(&self) {
        self.state.send_if_modified(|stopped| !std::mem::replace(stopped, true));
    }

    /// Returns `true` if shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.state.borrow()
    }

    /// Completes once shutdown is triggered, at once if it already was.
    pub fn recv(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut state = self.state.subscribe();
        async move {
            // `Err` only if every signal is gone, which can no longer trigger.
            if state.wait_for(|stopped| *stopped).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Creates a signal triggered by SIGTERM or SIGINT (Ctrl+C elsewhere).
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            os_signal().await;
            trigger.trigger();
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                    _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
                }
                return;
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!(error = %err, "failed to register signal handlers, falling back to Ctrl+C");
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
        Err(err) => {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

/// Counts live connections so shutdown can wait for them.
///
/// # Example
///
/// ```rust
/// use hermes_server::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<watch::Sender<usize>>,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(watch::Sender::new(0)),
        }
    }

    /// Registers a connection until the returned token is dropped.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.send_modify(|count| *count += 1);
        ConnectionToken {
            active: Arc::clone(&self.active),
        }
    }

    /// Number of connections whose token is still alive.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        *self.active.borrow()
    }

    /// Waits until every token has been dropped.
    pub async fn wait_idle(&self) {
        let mut active = self.active.subscribe();
        // The tracker holds the sender, so the channel cannot close here.
        let _ = active.wait_for(|count| *count == 0).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// A live connection. Dropping it releases the slot in its tracker.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<watch::Sender<usize>>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        self.active.send_modify(|count| *count = count.saturating_sub(1));
    }
}
