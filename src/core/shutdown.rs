//! Host termination signalling
//!
//! The manager never installs its own exit hook. The host owns a
//! `ShutdownCoordinator`, waits on it from its event loop and calls
//! `PluginManager::shutdown` once the coordinator fires.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Exit status used when a second termination signal forces an exit
pub const FORCED_EXIT_CODE: i32 = 130;

/// Fan-out of a single "application is about to quit" event
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(8);
        Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the quit event
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Request shutdown; idempotent
    pub fn trigger_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Resolve once shutdown has been requested, even if the request came
    /// before this call.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutdown_requested() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Route SIGINT/SIGTERM/SIGHUP (or Ctrl-C elsewhere) into this
    /// coordinator. A second signal exits the process immediately.
    /// Must be called from within a tokio runtime.
    pub fn install_signal_handlers(&self) {
        let signal_count = Arc::new(AtomicUsize::new(0));

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            // SAFETY: restoring the default disposition for SIGPIPE has no
            // preconditions.
            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            }

            for kind in [
                SignalKind::interrupt(),
                SignalKind::terminate(),
                SignalKind::hangup(),
            ] {
                let coordinator = self.clone();
                let counter = signal_count.clone();
                tokio::spawn(async move {
                    let Ok(mut sig) = signal(kind) else {
                        log::warn!("Could not register handler for signal {:?}", kind);
                        return;
                    };
                    while sig.recv().await.is_some() {
                        coordinator.on_signal(&counter);
                    }
                });
            }
        }

        #[cfg(not(unix))]
        {
            let coordinator = self.clone();
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    coordinator.on_signal(&signal_count);
                }
            });
        }
    }

    fn on_signal(&self, counter: &AtomicUsize) {
        let previous = counter.fetch_add(1, Ordering::AcqRel);
        if previous >= 1 {
            log::warn!("Second termination signal received; exiting without teardown");
            std::process::exit(FORCED_EXIT_CODE);
        }
        log::info!("Termination signal received; shutting down");
        self.trigger_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
