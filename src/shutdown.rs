use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Cancel the returned token on the first SIGTERM or SIGINT.
///
/// The HTTP server and the simulator's stop path watch this token, so a
/// signal drains in-flight jobs instead of killing them.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, stopping workers"),
            _ = sigint.recv() => tracing::info!("Received SIGINT, stopping workers"),
        }
        trigger.cancel();
    });

    Ok(token)
}
