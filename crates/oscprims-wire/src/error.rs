/// Errors that can occur while encoding or decoding OSC packets.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The packet does not carry a parseable address and type-tag header,
    /// or a recognized argument runs past the end of the datagram.
    #[error("malformed OSC packet: {0}")]
    MalformedPacket(String),

    /// The address cannot be written as an OSC string.
    #[error("invalid OSC address {0:?}")]
    InvalidAddress(String),
}

impl WireError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPacket(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
