//! Process-wide shutdown state for the command-line host.
//!
//! The engine itself keeps no global state; only Ctrl+C handling lives here.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Wakes the watch loop when shutdown is requested
static SHUTDOWN_SIGNAL: LazyLock<Notify> = LazyLock::new(Notify::new);

/// Setup the global Ctrl+C handler. Call once at program start
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(request_shutdown)
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Flag shutdown and wake anyone waiting in [`wait_for_shutdown`].
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
    // notify_one stores a permit, so a waiter arriving late still wakes
    SHUTDOWN_SIGNAL.notify_one();
}

/// Check if shutdown has been requested
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Resolve once shutdown has been requested.
pub async fn wait_for_shutdown() {
    if is_shutdown() {
        return;
    }
    SHUTDOWN_SIGNAL.notified().await;
}
