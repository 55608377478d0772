// SPDX-License-Identifier: MIT

//! Signal handling and the cancel-on-first-fatal-error supervisor pattern
//! (§5 "Scheduling model", §7 "Propagation").

use tokio_util::sync::CancellationToken;

/// Resolves on SIGINT or SIGTERM (Unix), or Ctrl+C elsewhere.
#[allow(clippy::expect_used)]
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("install Ctrl+C handler");
        tracing::info!("received ctrl-c");
    }
}

/// Root of a service's task tree: cancels every sibling task as soon as one
/// returns a fatal error, and on process shutdown signal.
#[derive(Clone)]
pub struct Supervisor {
    token: CancellationToken,
}

impl Supervisor {
    pub fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run until `shutdown_signal()` fires or the token is cancelled by a
    /// failing task, whichever comes first.
    pub async fn wait(&self) {
        tokio::select! {
            _ = shutdown_signal() => self.cancel(),
            _ = self.token.cancelled() => {}
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelling_one_task_is_observed_by_token_holders() {
        let supervisor = Supervisor::new();
        let token = supervisor.token();
        assert!(!token.is_cancelled());
        supervisor.cancel();
        assert!(token.is_cancelled());
        assert!(supervisor.is_cancelled());
    }
}
