use std::net::SocketAddr;
use std::time::Duration;

use oscprims_wire::WireError;

/// Errors that can occur in OSC transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not acquire its local address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// The sender could not resolve or attach to its destination.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// `send` was called before a successful `connect`.
    #[error("sender is not connected")]
    NotConnected,

    /// A single datagram could not be sent. The sender remains usable.
    #[error("failed to send to {target}: {source}")]
    Send {
        target: SocketAddr,
        source: std::io::Error,
    },

    /// The message could not be encoded.
    #[error("encode error: {0}")]
    Wire(#[from] WireError),

    /// The receive loop did not exit within the join timeout.
    #[error("listener thread did not stop within {0:?}")]
    JoinTimeout(Duration),

    /// The receive loop panicked, most likely inside the message handler.
    #[error("listener thread panicked")]
    ListenerPanicked,

    /// An I/O error occurred while setting up a socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
