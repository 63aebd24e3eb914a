//! Transfer state machines for the cross-window storage handover.
//!
//! The sender opens a companion window, waits for it to announce readiness,
//! and posts a snapshot of selected storage keys. The receiver runs in the
//! companion window: it announces readiness to its opener with bounded
//! retry, validates the origin of everything it hears, and applies the
//! received snapshot to its own local store. The host module carries the
//! receiving page's deadline watcher and its credential-exchange seam.

mod host;
mod receiver;
mod sender;

pub use host::{
    CredentialExchanger, DEFAULT_TRANSFER_DEADLINE, TransferOutcome, await_completion,
};
pub use receiver::{ReceiverConfig, ReceiverPhase, ReceiverState, TransferReceiver};
pub use sender::{SenderConfig, SenderPhase, SenderStatus, TransferError, TransferInitiator};
