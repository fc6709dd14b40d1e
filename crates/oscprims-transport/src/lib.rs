//! UDP transport for OSC messages.
//!
//! - [`OscSender`] pushes encoded messages to one fixed peer.
//! - [`OscListener`] owns a bound socket and one background receive loop
//!   that decodes datagrams and hands them to a registered handler.
//!
//! Everything here is blocking std I/O; the listener is the only component
//! that spawns a thread.

pub mod error;
pub mod listener;
pub mod sender;

pub use error::{Result, TransportError};
pub use listener::{
    ListenerConfig, ListenerStats, MessageHandler, OscListener, DEFAULT_JOIN_TIMEOUT,
    DEFAULT_MAX_DATAGRAM_SIZE, DEFAULT_POLL_INTERVAL,
};
pub use sender::{OscSender, SenderConfig, SenderStats, DEFAULT_HOST, DEFAULT_PORT};
