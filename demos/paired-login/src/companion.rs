//! The companion ("codes") host.
//!
//! Opening a window against this host loads the receiving page into it: a
//! `TransferReceiver` wired to the companion's local store. The host hands
//! the page's state feed back so the demo can play the hosting page's role.

use handover_core::{MemoryStore, Origin};
use handover_transfer::{ReceiverConfig, ReceiverState, TransferReceiver};
use handover_window::{Window, WindowError, WindowHandle, WindowOpener};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, watch};

/// State feeds of the pages this host has served.
pub struct PageStates {
    rx: mpsc::UnboundedReceiver<watch::Receiver<ReceiverState>>,
}

impl PageStates {
    pub async fn recv(&mut self) -> Option<watch::Receiver<ReceiverState>> {
        self.rx.recv().await
    }
}

/// Serves the receiving page into every window opened against it.
pub struct CompanionHost {
    parent: WindowHandle,
    /// The origin the served page is told to trust and announce to.
    source_origin: Origin,
    store: Arc<RwLock<MemoryStore>>,
    states: mpsc::UnboundedSender<watch::Receiver<ReceiverState>>,
}

impl CompanionHost {
    pub fn new(
        parent: WindowHandle,
        source_origin: Origin,
        store: Arc<RwLock<MemoryStore>>,
    ) -> (Self, PageStates) {
        let (tx, rx) = mpsc::unbounded_channel();
        let host = Self {
            parent,
            source_origin,
            store,
            states: tx,
        };
        (host, PageStates { rx })
    }
}

impl WindowOpener for CompanionHost {
    fn open(&mut self, url: &str) -> Result<WindowHandle, WindowError> {
        let at = Origin::parse(url).map_err(|e| WindowError::OpenFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let window = Window::opened_by(at.clone(), self.parent.clone());
        let handle = window.handle();

        let receiver = TransferReceiver::new(
            window,
            self.store.clone(),
            ReceiverConfig::new(self.source_origin.clone()),
        );
        let _ = self.states.send(receiver.state());
        tokio::spawn(receiver.run());

        tracing::debug!("companion page loaded at {}", at);
        Ok(handle)
    }
}
