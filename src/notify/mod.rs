//! Live notification fan-out.
//!
//! Single-process and in-memory: a viewer only receives events published on
//! the same instance while their stream is open, with no replay on reconnect.

mod broker;
mod session;

pub use broker::{NotificationBroker, Subscription};
pub use session::{Frame, SessionState, StreamSession};
