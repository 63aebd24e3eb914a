//! The transfer receiver (companion-window side).

use handover_core::{KeyValueStore, Origin, StorageSnapshot, TransferMessage, apply};
use handover_window::{CrossWindowChannel, Envelope, Window};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{RwLock, watch};

/// Phases of the receiving side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverPhase {
    #[default]
    WaitingForData,
    Receiving,
    Completed,
    Failed,
}

/// Observable receiver state.
#[derive(Debug, Clone, Default)]
pub struct ReceiverState {
    pub phase: ReceiverPhase,
    /// The last snapshot received, kept for the hosting page.
    pub snapshot: Option<StorageSnapshot>,
    pub received_at: Option<SystemTime>,
    /// Success latch for the page lifetime.
    pub is_data_received: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
    /// True once the message listener is attached.
    pub is_initialized: bool,
}

/// Receiver-side tunables.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// The only origin transfers are accepted from.
    pub source_origin: Origin,
    /// Spacing between readiness announce attempts.
    pub ready_interval: Duration,
    /// How many times to look for a live opener before giving up.
    pub ready_attempts: u32,
}

impl ReceiverConfig {
    pub fn new(source_origin: Origin) -> Self {
        Self {
            source_origin,
            ready_interval: Duration::from_millis(500),
            ready_attempts: 10,
        }
    }
}

/// Runs in the companion window: announces readiness to the opener, then
/// applies the transferred snapshot into this window's local store.
pub struct TransferReceiver<S> {
    window: Window,
    store: Arc<RwLock<S>>,
    channel: CrossWindowChannel,
    config: ReceiverConfig,
    state: watch::Sender<ReceiverState>,
}

impl<S: KeyValueStore> TransferReceiver<S> {
    pub fn new(window: Window, store: Arc<RwLock<S>>, config: ReceiverConfig) -> Self {
        let channel = CrossWindowChannel::new(window.origin().clone());
        let (state, _) = watch::channel(ReceiverState::default());
        Self {
            window,
            store,
            channel,
            config,
            state,
        }
    }

    /// Subscribe to state updates.
    pub fn state(&self) -> watch::Receiver<ReceiverState> {
        self.state.subscribe()
    }

    /// Listen until the window goes away. Announces readiness with bounded
    /// retry while handling inbound messages.
    pub async fn run(mut self) {
        self.update(|s| s.is_initialized = true);

        let mut ticks = tokio::time::interval(self.config.ready_interval);
        let mut attempts_left = self.config.ready_attempts;
        let mut announced = false;

        loop {
            tokio::select! {
                _ = ticks.tick(), if !announced && attempts_left > 0 => {
                    attempts_left -= 1;
                    match self.window.opener() {
                        Some(opener) if !opener.is_closed() => {
                            if let Err(e) = self.channel.send(
                                opener,
                                &self.config.source_origin,
                                &TransferMessage::ReceiverReady,
                            ) {
                                tracing::warn!("could not announce readiness: {}", e);
                            }
                            announced = true;
                        }
                        _ => {
                            if attempts_left == 0 {
                                tracing::warn!(
                                    "no opener window after {} attempts, giving up on announce",
                                    self.config.ready_attempts
                                );
                            }
                        }
                    }
                }
                event = self.window.recv() => {
                    let Some(envelope) = event else { break };
                    self.handle_envelope(envelope).await;
                }
            }
        }
    }

    async fn handle_envelope(&mut self, envelope: Envelope) {
        if envelope.origin != self.config.source_origin {
            tracing::warn!("rejecting message from unexpected origin {}", envelope.origin);
            self.update(|s| {
                s.has_error = true;
                s.error_message = Some("message from unexpected origin".to_string());
            });
            return;
        }

        let message = match TransferMessage::from_json(&envelope.data) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("invalid message: {}", e);
                return;
            }
        };

        match message {
            TransferMessage::ReceiverReady => {
                tracing::debug!("ignoring readiness ping addressed to a receiver");
            }
            TransferMessage::TransferStorage { data } => self.accept(data).await,
        }
    }

    async fn accept(&mut self, data: StorageSnapshot) {
        self.update(|s| s.phase = ReceiverPhase::Receiving);

        let written = {
            let mut store = self.store.write().await;
            apply(&mut *store, &data)
        };

        if written == 0 && !data.is_empty() {
            tracing::warn!("none of the transferred keys could be stored");
            self.update(|s| {
                s.phase = ReceiverPhase::Failed;
                s.has_error = true;
                s.error_message = Some("transferred data could not be stored".to_string());
            });
            return;
        }

        tracing::info!("stored {} transferred keys", written);
        self.update(|s| {
            s.phase = ReceiverPhase::Completed;
            s.is_data_received = true;
            s.snapshot = Some(data);
            s.received_at = Some(SystemTime::now());
        });
    }

    fn update(&self, f: impl FnOnce(&mut ReceiverState)) {
        self.state.send_modify(f);
    }
}
