//! Simulated browser-window runtime.
//!
//! Each window is an in-process endpoint owning an inbound event queue;
//! posting a message to another window enqueues an [`Envelope`] stamped with
//! the poster's origin, exactly the information a message event carries.
//! Delivery is fire-and-forget: acknowledgment, if any, is layered on top
//! by the transfer protocol.

mod channel;
mod window;

pub use channel::{CrossWindowChannel, WindowError};
pub use window::{Envelope, Window, WindowHandle, WindowOpener};
