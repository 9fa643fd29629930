//! OS signal handling.

use crate::lifecycle::shutdown::Shutdown;

/// Spawn a task that triggers `shutdown` on Ctrl-C.
///
/// A second Ctrl-C exits the process without waiting for pending receipts.
pub fn spawn_ctrl_c_handler(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::warn!("Interrupt received, cancelling pending waits");
        shutdown.trigger();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt, exiting immediately");
            std::process::exit(130);
        }
    })
}
