//! Background maintenance for the stateful stores.
//!
//! Revocation entries and reset tokens are useless once they expire; the
//! sweeper drops them on a fixed interval until it is shut down.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::identity::ports::CredentialStore;
use crate::identity::ports::ResetTokenStore;
use crate::identity::ports::RevocationLedger;
use crate::identity::service::AuthService;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(self) {
        // The receiver is gone only if the task already ended
        let _ = self.shutdown.send(());

        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Sweeper task failed");
        }
    }
}

/// Spawn a task that calls `sweep_expired` every `interval`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_sweeper<CS, RL, RS>(
    service: Arc<AuthService<CS, RL, RS>>,
    interval: Duration,
) -> SweeperHandle
where
    CS: CredentialStore,
    RL: RevocationLedger,
    RS: ResetTokenStore,
{
    let (shutdown, mut shutdown_rx) = oneshot::channel();
    let period = interval.max(MIN_SWEEP_INTERVAL);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = period.as_millis() as u64, "Sweeper started");

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    match service.sweep_expired(Utc::now()).await {
                        Ok(report) => {
                            if report.revocations > 0 || report.reset_tokens > 0 {
                                tracing::debug!(
                                    revocations = report.revocations,
                                    reset_tokens = report.reset_tokens,
                                    "Expired entries swept"
                                );
                            }
                        }
                        Err(e) => tracing::error!(error = %e, "Sweep failed"),
                    }
                }
            }
        }

        tracing::info!("Sweeper stopped");
    });

    SweeperHandle { shutdown, task }
}
