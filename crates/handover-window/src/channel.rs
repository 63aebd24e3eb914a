//! The low-level send primitive.

use crate::window::{Envelope, WindowHandle};
use handover_core::{Origin, TransferMessage};

/// Errors from the window runtime.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    /// Target window is null, closed, or its page is gone.
    #[error("target window is closed or gone")]
    TargetGone,
    /// The platform refused to open a window (blocked popup, bad URL).
    #[error("failed to open window at {url}: {reason}")]
    OpenFailed { url: String, reason: String },
    /// The message could not be encoded for posting.
    #[error("message could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Posts typed messages to other windows, stamped with the local origin.
#[derive(Debug, Clone)]
pub struct CrossWindowChannel {
    local_origin: Origin,
}

impl CrossWindowChannel {
    pub fn new(local_origin: Origin) -> Self {
        Self { local_origin }
    }

    pub fn local_origin(&self) -> &Origin {
        &self.local_origin
    }

    /// Post `message` to `target`, restricted to `target_origin`.
    ///
    /// Fails when the target window is closed or gone. A `target_origin`
    /// that does not match the window's actual origin drops the message
    /// without error, as the platform does.
    pub fn send(
        &self,
        target: &WindowHandle,
        target_origin: &Origin,
        message: &TransferMessage,
    ) -> Result<(), WindowError> {
        if target.is_closed() {
            return Err(WindowError::TargetGone);
        }
        if target.origin() != target_origin {
            tracing::debug!(
                "dropping message for {}: window is at {}",
                target_origin,
                target.origin()
            );
            return Ok(());
        }
        let data = message.to_json()?;
        target.deliver(Envelope {
            origin: self.local_origin.clone(),
            data,
        })
    }
}
