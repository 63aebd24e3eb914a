//! Core types for the cross-window storage handover protocol.
//!
//! This crate provides the protocol primitives: canonical origins, storage
//! snapshots with explicit value encodings, and the wire messages the two
//! windows exchange. The window runtime and the transfer state machines
//! live in separate crates.

mod message;
mod origin;
mod snapshot;
mod store;

pub use message::TransferMessage;
pub use origin::{Origin, OriginParseError};
pub use snapshot::{StorageSnapshot, StorageValue, apply, capture};
pub use store::{KeyValueStore, MemoryStore, StoreError};
