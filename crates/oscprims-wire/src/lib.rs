//! Open Sound Control message model and binary codec.
//!
//! This is the lowest layer of oscprims. Every OSC message is laid out as:
//! - A NUL-terminated ASCII address, zero-padded to a multiple of 4 bytes
//! - A NUL-terminated type-tag string (`,` plus one tag per argument), padded the same way
//! - The argument payloads in order: `f`/`i` as 4-byte big-endian, `s` as a padded string
//!
//! Only `f` (f32), `i` (i32) and `s` (string) arguments are supported. Bundles
//! and time tags are not.

pub mod codec;
pub mod error;
pub mod message;

mod reader;
mod writer;

pub use codec::{
    decode_message, encode_message, Decoded, EncodeSummary, MIN_PACKET_SIZE, TYPE_TAG_PREFIX,
};
pub use error::{Result, WireError};
pub use message::{Argument, Message, TAG_FLOAT, TAG_INT, TAG_STRING};
