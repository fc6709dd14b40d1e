//! Chunked float-array transfer over OSC.
//!
//! A float sequence of any length is split into messages addressed
//! `<title>/<index>`, each carrying at most a fixed number of `f` arguments.
//! The receiving side reassembles them per title:
//!
//! - completion means every index from 0 up to the highest one seen is present
//! - a fresh chunk 0 for a title with pending chunks restarts the transfer
//! - a completed array is handed out once and its state removed
//!
//! There is no total-count field and no acknowledgement; gap detection is
//! the only completeness signal.

pub mod address;
pub mod assembler;
pub mod error;
pub mod receiver;
pub mod sender;

pub use address::{chunk_address, chunk_values, parse_chunk_address, trim_title, ChunkMessage};
pub use assembler::{ChunkAssembler, Ingest};
pub use error::{ChunkError, Result};
pub use receiver::{ChunkReceiver, ReceiverConfig, ReceiverStats};
pub use sender::{chunk_messages, ChunkSendReport, ChunkedSender, MessageSink};
