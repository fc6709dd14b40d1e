/// Errors that can occur while interpreting or sending chunk messages.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The address does not end in a `/<index>` segment.
    #[error("address {0:?} is not a chunk address")]
    NotAChunk(String),

    /// A chunk message carries something other than floats.
    #[error("chunk {address} has a non-float argument at position {position} (tag '{tag}')")]
    TypeMismatch {
        address: String,
        position: usize,
        tag: char,
    },

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] oscprims_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, ChunkError>;
