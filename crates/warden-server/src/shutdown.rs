//! Process-wide graceful shutdown signal.
//!
//! A [`ShutdownSignal`] is entered at most once, either by an OS signal
//! (SIGINT/SIGTERM) or by the application adapter when a request fails with
//! an integrity error. Every clone observes the same state; the transition
//! from running to shutting down is terminal.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_server::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::with_os_signals();
//!
//! tokio::select! {
//!     () = shutdown.recv() => tracing::info!("shutdown started"),
//!     () = tokio::time::sleep(Duration::from_secs(60)) => tracing::info!("timeout"),
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// A signal used to trigger and await graceful shutdown.
///
/// # Example
///
/// ```rust
/// use warden_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let clone = shutdown.clone();
///
/// assert!(clone.trigger());
/// assert!(!shutdown.trigger());
/// assert!(shutdown.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    /// Whether shutdown has been triggered
    triggered: Arc<AtomicBool>,

    /// Broadcast sender for notifying waiters
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    /// Creates a signal in the running state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Triggers shutdown.
    ///
    /// Returns `true` for the call that performed the transition and
    /// `false` for every later call, which has no effect.
    pub fn trigger(&self) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // No receivers is fine: late waiters see the flag.
            let _ = self.sender.send(());
            tracing::info!("shutdown signal triggered");
            true
        } else {
            false
        }
    }

    /// Returns `true` if shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Completes when shutdown is triggered, immediately if it already was.
    pub async fn recv(&self) {
        // Subscribe before checking the flag so a trigger in between is
        // not missed.
        let mut receiver = self.sender.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = receiver.recv().await;
    }

    /// Creates a signal that is also triggered by SIGTERM or SIGINT.
    ///
    /// Must be called within a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let signal_clone = signal.clone();

        tokio::spawn(async move {
            match wait_for_os_signal().await {
                Ok(()) => {
                    signal_clone.trigger();
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to listen for OS signals");
                }
            }
        });

        signal
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for an OS shutdown signal.
///
/// SIGTERM or SIGINT on Unix, Ctrl+C elsewhere.
async fn wait_for_os_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!(signal = "SIGTERM", "received signal, starting graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!(signal = "SIGINT", "received signal, starting graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!(signal = "ctrl-c", "received signal, starting graceful shutdown");
    }

    Ok(())
}
