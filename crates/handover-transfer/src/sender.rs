//! The transfer initiator (sender side).

use handover_core::{KeyValueStore, Origin, OriginParseError, TransferMessage, capture};
use handover_window::{CrossWindowChannel, Window, WindowError, WindowOpener};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;

/// Phases of a transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderPhase {
    #[default]
    Idle,
    Preparing,
    WaitingForReceiver,
    Complete,
    Failed,
}

impl fmt::Display for SenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SenderPhase::Idle => "idle",
            SenderPhase::Preparing => "Preparing to open a new window...",
            SenderPhase::WaitingForReceiver => "Waiting for receiver ready...",
            SenderPhase::Complete => "Transfer complete!",
            SenderPhase::Failed => "Transfer failed!",
        };
        f.write_str(text)
    }
}

/// Observable sender status.
///
/// A terminal phase stays visible until the next attempt starts; whether an
/// attempt is currently running is reported by `in_progress`, not by the
/// phase.
#[derive(Debug, Clone, Default)]
pub struct SenderStatus {
    pub phase: SenderPhase,
    pub in_progress: bool,
    pub error: Option<String>,
}

/// Sender-side tunables.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// How long to wait for the receiver's readiness announcement. The
    /// receiver announces for up to 10 x 500 ms, so twice that window.
    pub ready_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(10),
        }
    }
}

/// A failed transfer attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("target url is not a valid origin: {0}")]
    BadTargetUrl(#[from] OriginParseError),
    #[error("target window failed to open or is already closed: {0}")]
    InvalidTargetWindow(#[source] WindowError),
    #[error("receiver never announced readiness within {0:?}")]
    HandshakeTimeout(Duration),
    #[error(transparent)]
    Channel(#[from] WindowError),
}

/// Orchestrates a transfer out of this window: opens the companion window,
/// waits for its readiness announcement, and posts the snapshot.
pub struct TransferInitiator<S, O> {
    window: Window,
    store: S,
    opener: O,
    channel: CrossWindowChannel,
    config: SenderConfig,
    status: watch::Sender<SenderStatus>,
}

impl<S: KeyValueStore, O: WindowOpener> TransferInitiator<S, O> {
    pub fn new(window: Window, store: S, opener: O) -> Self {
        Self::with_config(window, store, opener, SenderConfig::default())
    }

    pub fn with_config(window: Window, store: S, opener: O, config: SenderConfig) -> Self {
        let channel = CrossWindowChannel::new(window.origin().clone());
        let (status, _) = watch::channel(SenderStatus::default());
        Self {
            window,
            store,
            opener,
            channel,
            config,
            status,
        }
    }

    /// Subscribe to status updates.
    pub fn status(&self) -> watch::Receiver<SenderStatus> {
        self.status.subscribe()
    }

    /// Run one transfer attempt: open a window at `target_url` and hand it
    /// the stored values under `keys`.
    pub async fn initiate(
        &mut self,
        target_url: &str,
        keys: &[impl AsRef<str>],
    ) -> Result<(), TransferError> {
        self.update(|s| {
            s.phase = SenderPhase::Preparing;
            s.in_progress = true;
            s.error = None;
        });

        let result = self.attempt(target_url, keys).await;
        match &result {
            Ok(()) => {
                tracing::info!("transfer to {} complete", target_url);
                self.update(|s| {
                    s.phase = SenderPhase::Complete;
                    s.in_progress = false;
                });
            }
            Err(e) => {
                tracing::warn!("transfer to {} failed: {}", target_url, e);
                let message = e.to_string();
                self.update(|s| {
                    s.phase = SenderPhase::Failed;
                    s.in_progress = false;
                    s.error = Some(message);
                });
            }
        }
        result
    }

    async fn attempt(
        &mut self,
        target_url: &str,
        keys: &[impl AsRef<str>],
    ) -> Result<(), TransferError> {
        let target_origin = Origin::parse(target_url)?;

        let target = self
            .opener
            .open(target_url)
            .map_err(TransferError::InvalidTargetWindow)?;
        if target.is_closed() {
            return Err(TransferError::InvalidTargetWindow(WindowError::TargetGone));
        }

        let snapshot = capture(&self.store, keys);
        tracing::debug!("captured {} of {} requested keys", snapshot.len(), keys.len());

        self.update(|s| s.phase = SenderPhase::WaitingForReceiver);
        self.await_receiver_ready(&target_origin).await?;

        self.channel.send(
            &target,
            &target_origin,
            &TransferMessage::TransferStorage { data: snapshot },
        )?;
        Ok(())
    }

    /// Block until the companion window announces readiness, bounded by the
    /// configured timeout. Announcements from other origins are ignored.
    async fn await_receiver_ready(&mut self, target_origin: &Origin) -> Result<(), TransferError> {
        let deadline = tokio::time::sleep(self.config.ready_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    return Err(TransferError::HandshakeTimeout(self.config.ready_timeout));
                }
                event = self.window.recv() => {
                    let Some(envelope) = event else {
                        return Err(TransferError::Channel(WindowError::TargetGone));
                    };
                    match TransferMessage::from_json(&envelope.data) {
                        Ok(TransferMessage::ReceiverReady) if envelope.origin == *target_origin => {
                            return Ok(());
                        }
                        Ok(TransferMessage::ReceiverReady) => {
                            tracing::debug!("ignoring readiness from {}", envelope.origin);
                        }
                        Ok(_) => {
                            tracing::debug!("ignoring unexpected message from {}", envelope.origin);
                        }
                        Err(e) => {
                            tracing::warn!("invalid message while waiting for receiver: {}", e);
                        }
                    }
                }
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut SenderStatus)) {
        self.status.send_modify(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handover_core::MemoryStore;
    use handover_window::WindowHandle;
    use std::sync::{Arc, Mutex};

    fn origin(s: &str) -> Origin {
        Origin::parse(s).unwrap()
    }

    /// Opener that keeps the opened window alive but never loads a page
    /// into it, so no readiness announcement ever arrives.
    struct SilentCompanion {
        kept: Option<Window>,
    }

    impl WindowOpener for SilentCompanion {
        fn open(&mut self, url: &str) -> Result<WindowHandle, WindowError> {
            let window = Window::root(Origin::parse(url).map_err(|e| WindowError::OpenFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?);
            let handle = window.handle();
            self.kept = Some(window);
            Ok(handle)
        }
    }

    struct BlockedPopup;

    impl WindowOpener for BlockedPopup {
        fn open(&mut self, url: &str) -> Result<WindowHandle, WindowError> {
            Err(WindowError::OpenFailed {
                url: url.to_string(),
                reason: "popup blocked".to_string(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_times_out_without_receiver() {
        let app = Window::root(origin("https://app.example.com"));
        let mut initiator =
            TransferInitiator::new(app, MemoryStore::new(), SilentCompanion { kept: None });
        let status = initiator.status();

        let err = initiator
            .initiate("https://codes.example.com", &["token"])
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::HandshakeTimeout(_)));
        assert_eq!(status.borrow().phase, SenderPhase::Failed);
        assert!(!status.borrow().in_progress);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_popup_is_an_invalid_target_window() {
        let app = Window::root(origin("https://app.example.com"));
        let mut initiator = TransferInitiator::new(app, MemoryStore::new(), BlockedPopup);
        let status = initiator.status();

        let err = initiator
            .initiate("https://codes.example.com", &["token"])
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidTargetWindow(_)));
        assert_eq!(status.borrow().phase, SenderPhase::Failed);
        let error = status.borrow().error.clone().unwrap();
        assert!(error.contains("popup blocked"), "unexpected error: {error}");
    }

    /// First attempt is blocked by the popup blocker, the second opens a
    /// window nobody loads a page into.
    struct FlakyCompanion {
        blocked_once: bool,
        kept: Option<Window>,
    }

    impl WindowOpener for FlakyCompanion {
        fn open(&mut self, url: &str) -> Result<WindowHandle, WindowError> {
            if !self.blocked_once {
                self.blocked_once = true;
                return Err(WindowError::OpenFailed {
                    url: url.to_string(),
                    reason: "popup blocked".to_string(),
                });
            }
            let window = Window::root(Origin::parse(url).map_err(|e| WindowError::OpenFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?);
            let handle = window.handle();
            self.kept = Some(window);
            Ok(handle)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_is_retained_until_next_attempt() {
        let app = Window::root(origin("https://app.example.com"));
        let opener = FlakyCompanion {
            blocked_once: false,
            kept: None,
        };
        let mut initiator = TransferInitiator::new(app, MemoryStore::new(), opener);
        let status = initiator.status();

        let _ = initiator
            .initiate("https://codes.example.com", &["token"])
            .await;
        assert_eq!(status.borrow().phase, SenderPhase::Failed);
        assert!(status.borrow().error.clone().unwrap().contains("popup"));

        // Starting a new attempt replaces the retained failure; this one
        // dies later, waiting for a receiver that never loads.
        let _ = initiator
            .initiate("https://codes.example.com", &["token"])
            .await;
        assert_eq!(status.borrow().phase, SenderPhase::Failed);
        assert!(status.borrow().error.clone().unwrap().contains("readiness"));
    }

    /// Companion that records the sender phase at open time and answers the
    /// handshake from a spawned page task.
    struct ScriptedCompanion {
        app_handle: WindowHandle,
        status: Arc<Mutex<Option<watch::Receiver<SenderStatus>>>>,
        kept: Option<Window>,
    }

    impl WindowOpener for ScriptedCompanion {
        fn open(&mut self, url: &str) -> Result<WindowHandle, WindowError> {
            let status = self.status.lock().unwrap().clone().unwrap();
            // The window is opened while the sender reports Preparing.
            assert_eq!(status.borrow().phase, SenderPhase::Preparing);

            let window = Window::root(Origin::parse(url).map_err(|e| WindowError::OpenFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?);
            let handle = window.handle();
            let channel = CrossWindowChannel::new(window.origin().clone());
            self.kept = Some(window);

            let app_handle = self.app_handle.clone();
            tokio::spawn(async move {
                // By the time the page runs, the sender is waiting on it.
                assert_eq!(status.borrow().phase, SenderPhase::WaitingForReceiver);
                channel
                    .send(
                        &app_handle,
                        app_handle.origin(),
                        &TransferMessage::ReceiverReady,
                    )
                    .unwrap();
            });
            Ok(handle)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn phases_progress_preparing_waiting_complete() {
        let app = Window::root(origin("https://app.example.com"));
        let app_handle = app.handle();
        let status_slot = Arc::new(Mutex::new(None));

        let opener = ScriptedCompanion {
            app_handle,
            status: status_slot.clone(),
            kept: None,
        };
        let mut store = MemoryStore::new();
        store.insert("token", "abc123");

        let mut initiator = TransferInitiator::new(app, store, opener);
        *status_slot.lock().unwrap() = Some(initiator.status());
        let status = initiator.status();

        initiator
            .initiate("https://codes.example.com", &["token"])
            .await
            .unwrap();

        assert_eq!(status.borrow().phase, SenderPhase::Complete);
        assert!(!status.borrow().in_progress);
    }

    /// Readiness pings from a third-party origin must not satisfy the
    /// handshake.
    #[tokio::test(start_paused = true)]
    async fn foreign_readiness_is_ignored() {
        let app = Window::root(origin("https://app.example.com"));
        let app_handle = app.handle();
        let mut initiator =
            TransferInitiator::new(app, MemoryStore::new(), SilentCompanion { kept: None });

        let intruder = CrossWindowChannel::new(origin("https://evil.example.com"));
        tokio::spawn(async move {
            let _ = intruder.send(
                &app_handle,
                &origin("https://app.example.com"),
                &TransferMessage::ReceiverReady,
            );
        });

        let err = initiator
            .initiate("https://codes.example.com", &["token"])
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::HandshakeTimeout(_)));
    }
}
