//! Process-wide shutdown signal.
//!
//! One trigger (normally Ctrl+C) flips an `AtomicBool` the capture thread
//! polls every iteration, and a `watch` channel the async side awaits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            tx: Arc::new(tx),
        }
    }

    /// Flag for synchronous loops.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        wait_for_shutdown(self.subscribe()).await
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the watched value becomes `true`. Never resolves if the
/// sender is dropped without triggering.
pub async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow_and_update();
        if stop {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Set up the Ctrl+C handler.
///
/// The first Ctrl+C starts a graceful shutdown; a second one exits at once.
/// Call once at program startup.
pub fn install_ctrlc_handler(shutdown: &Shutdown) -> Result<(), ctrlc::Error> {
    let shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        if shutdown.is_triggered() {
            eprintln!("\nReceived second Ctrl+C, exiting");
            std::process::exit(130);
        }
        eprintln!("\nReceived Ctrl+C, shutting down...");
        shutdown.trigger();
    })
}
