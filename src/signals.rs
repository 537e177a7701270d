//! Optional adapter wiring process signals to [`crate::Lifecycle::shutdown`].
//!
//! The core lifecycle state machine and shutdown coordinator never touch
//! `tokio::signal` themselves — only this module does, and only if a binary
//! chooses to spawn it. This mirrors `capture-server`'s `shutdown()` helper:
//! the signal wiring lives next to, not inside of, the thing it drives.
//!
//! ```no_run
//! # async fn doc(lifecycle: std::sync::Arc<lifecycle::Lifecycle>) {
//! tokio::spawn(async move {
//!     lifecycle::signals::shutdown_signal().await;
//!     lifecycle.shutdown().await;
//! });
//! # }
//! ```

use tracing::info;

/// Resolves once SIGTERM, SIGINT, or SIGHUP is received (on unix), or once
/// Ctrl+C is received (elsewhere). Intended to be raced against nothing and
/// simply awaited before calling `Lifecycle::shutdown`.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        let mut int = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
        let mut hup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");

        tokio::select! {
            _ = term.recv() => info!("received SIGTERM"),
            _ = int.recv() => info!("received SIGINT"),
            _ = hup.recv() => info!("received SIGHUP"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to register Ctrl+C handler");
        info!("received Ctrl+C");
    }
}
