//! OSC 1.0 messaging over UDP, with chunked transfer of float arrays.
//!
//! oscprims sends and receives Open Sound Control messages carrying `f`, `i`
//! and `s` arguments, and layers a small convention on top for moving float
//! arrays too large for one datagram.
//!
//! # Crate Structure
//!
//! - [`wire`]: message model and the OSC 1.0 binary codec
//! - [`transport`]: UDP sender and background listener
//! - [`chunk`]: chunked float-array sender, reassembly and receiver (behind `chunk` feature)

/// Re-export wire types.
pub mod wire {
    pub use oscprims_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use oscprims_transport::*;
}

/// Re-export chunk transfer types (requires `chunk` feature).
#[cfg(feature = "chunk")]
pub mod chunk {
    pub use oscprims_chunk::*;
}
