//! Hosting-page glue for the receiving window.
//!
//! The receiver itself owns no deadline; the page that mounts it decides
//! how long to wait before falling back to its login path. That timer and
//! the credential-exchange seam live here.

use crate::receiver::ReceiverState;
use handover_core::StorageSnapshot;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;

/// How long the hosting page waits for a transfer before giving up.
pub const DEFAULT_TRANSFER_DEADLINE: Duration = Duration::from_secs(20);

/// What the hosting page observed, exactly once per wait.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// Data arrived and was stored.
    Completed(StorageSnapshot),
    /// The receiver raised an error.
    Failed(String),
    /// Neither data nor an error within the deadline.
    TimedOut,
}

/// Watch receiver state until data lands, an error is raised, or the
/// deadline expires.
pub async fn await_completion(
    mut state: watch::Receiver<ReceiverState>,
    deadline: Duration,
) -> TransferOutcome {
    let watched = tokio::time::timeout(deadline, async {
        loop {
            {
                let s = state.borrow_and_update();
                if s.is_data_received {
                    return TransferOutcome::Completed(s.snapshot.clone().unwrap_or_default());
                }
                if s.has_error {
                    return TransferOutcome::Failed(
                        s.error_message
                            .clone()
                            .unwrap_or_else(|| "transfer failed".to_string()),
                    );
                }
            }
            if state.changed().await.is_err() {
                return TransferOutcome::Failed("receiver went away".to_string());
            }
        }
    })
    .await;

    match watched {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!("transfer deadline of {:?} expired", deadline);
            TransferOutcome::TimedOut
        }
    }
}

/// The credential-store collaborator on either page.
///
/// The sending page asks it which entries carry the session; the receiving
/// page, after a completed transfer, exchanges the stored values for live
/// credentials. Implementations live with the hosting application.
#[allow(async_fn_in_trait)]
pub trait CredentialExchanger {
    type Error: std::fmt::Display;

    /// The credential-bearing entries to hand to a companion window.
    fn saved_token(&self) -> HashMap<String, String>;

    /// Exchange transferred local values for an authenticated session.
    async fn build_credentials(&mut self) -> Result<(), Self::Error>;

    /// Flip once the session is live (or lost).
    fn set_authenticated(&mut self, authenticated: bool);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::ReceiverPhase;
    use handover_core::StorageValue;

    fn state_channel() -> (watch::Sender<ReceiverState>, watch::Receiver<ReceiverState>) {
        watch::channel(ReceiverState::default())
    }

    #[tokio::test(start_paused = true)]
    async fn silent_receiver_times_out() {
        let (tx, rx) = state_channel();
        tx.send_modify(|s| s.is_initialized = true);

        let outcome = await_completion(rx, DEFAULT_TRANSFER_DEADLINE).await;
        assert_eq!(outcome, TransferOutcome::TimedOut);

        // Nothing arrived, nothing errored: the timeout path was the only
        // fallback, exactly as the hosting page expects.
        let s = tx.borrow();
        assert!(!s.is_data_received);
        assert!(!s.has_error);
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_on_data() {
        let (tx, rx) = state_channel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            tx.send_modify(|s| {
                let mut snapshot = StorageSnapshot::new();
                snapshot.insert("token", StorageValue::Raw("abc123".to_string()));
                s.phase = ReceiverPhase::Completed;
                s.is_data_received = true;
                s.snapshot = Some(snapshot);
            });
        });

        let outcome = await_completion(rx, DEFAULT_TRANSFER_DEADLINE).await;
        let TransferOutcome::Completed(snapshot) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(
            snapshot.get("token"),
            Some(&StorageValue::Raw("abc123".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_on_error() {
        let (tx, rx) = state_channel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send_modify(|s| {
                s.has_error = true;
                s.error_message = Some("message from unexpected origin".to_string());
            });
        });

        let outcome = await_completion(rx, DEFAULT_TRANSFER_DEADLINE).await;
        assert_eq!(
            outcome,
            TransferOutcome::Failed("message from unexpected origin".to_string())
        );
    }
}
