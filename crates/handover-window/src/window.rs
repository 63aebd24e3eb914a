//! Windows, handles, and message events.

use crate::channel::WindowError;
use handover_core::Origin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// A delivered message event: the posted JSON text plus the origin the
/// platform stamped on it.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Origin of the posting window.
    pub origin: Origin,
    /// The message as JSON text.
    pub data: String,
}

/// A cloneable handle to a window, as held by an opener or an opened page.
#[derive(Debug, Clone)]
pub struct WindowHandle {
    origin: Origin,
    events: mpsc::UnboundedSender<Envelope>,
    closed: Arc<AtomicBool>,
}

impl WindowHandle {
    /// The origin the window is loaded at.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// True once the window was closed or its page is gone.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.events.is_closed()
    }

    /// Enqueue a raw event on the window, the way the platform delivers a
    /// message. The typed path is [`CrossWindowChannel::send`].
    ///
    /// [`CrossWindowChannel::send`]: crate::CrossWindowChannel::send
    pub fn deliver(&self, envelope: Envelope) -> Result<(), WindowError> {
        if self.is_closed() {
            return Err(WindowError::TargetGone);
        }
        self.events
            .send(envelope)
            .map_err(|_| WindowError::TargetGone)
    }
}

/// The endpoint owned by the page running in a window: its own handle, the
/// inbound event queue, and the opener handle if some other window opened it.
#[derive(Debug)]
pub struct Window {
    handle: WindowHandle,
    events: mpsc::UnboundedReceiver<Envelope>,
    opener: Option<WindowHandle>,
}

impl Window {
    fn new(origin: Origin, opener: Option<WindowHandle>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = WindowHandle {
            origin,
            events: tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        Self {
            handle,
            events: rx,
            opener,
        }
    }

    /// A top-level window with no opener.
    pub fn root(origin: Origin) -> Self {
        Self::new(origin, None)
    }

    /// A window opened by another, as `window.open` produces.
    pub fn opened_by(origin: Origin, opener: WindowHandle) -> Self {
        Self::new(origin, Some(opener))
    }

    /// A handle to this window.
    pub fn handle(&self) -> WindowHandle {
        self.handle.clone()
    }

    pub fn origin(&self) -> &Origin {
        self.handle.origin()
    }

    /// The window that opened this one, if any.
    pub fn opener(&self) -> Option<&WindowHandle> {
        self.opener.as_ref()
    }

    /// Wait for the next message event. Pends forever once the window is
    /// idle; callers race this against their own timers.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.events.recv().await
    }

    /// Drain one pending event without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.events.try_recv().ok()
    }

    /// Close the window. Posting to it fails from here on.
    pub fn close(&self) {
        self.handle.closed.store(true, Ordering::SeqCst);
    }
}

/// The `window.open` seam.
///
/// Implementations create the companion window, hand its [`Window`] end to
/// whatever runs the page, and return the handle the opener keeps.
pub trait WindowOpener {
    fn open(&mut self, url: &str) -> Result<WindowHandle, WindowError>;
}
