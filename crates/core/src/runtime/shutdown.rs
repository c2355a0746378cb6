use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Owns the process-wide cancellation token. Every background task
/// (consumer loop, mailbox sweep, silence breaker) watches a clone.
#[derive(Debug, Clone, Default)]
pub struct ShutdownGuard {
    token: CancellationToken,
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel on SIGTERM or Ctrl+C.
    pub fn spawn_signal_listener(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(sigterm) => sigterm,
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to register SIGTERM handler");
                            return;
                        }
                    };
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                    _ = signal::ctrl_c() => tracing::info!("received Ctrl+C, shutting down"),
                    _ = token.cancelled() => return,
                }
            }
            #[cfg(not(unix))]
            {
                tokio::select! {
                    _ = signal::ctrl_c() => tracing::info!("received Ctrl+C, shutting down"),
                    _ = token.cancelled() => return,
                }
            }
            token.cancel();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_token() {
        let guard = ShutdownGuard::new();
        let token = guard.token();
        assert!(!token.is_cancelled());
        guard.clone().token().cancel();
        assert!(token.is_cancelled());
    }
}
