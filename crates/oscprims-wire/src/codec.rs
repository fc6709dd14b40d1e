use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::error::{Result, WireError};
use crate::message::{Argument, Message, TAG_FLOAT, TAG_INT, TAG_STRING};
use crate::reader::PacketReader;
use crate::writer::{osc_string_len, put_osc_string};

/// Leading character of every type-tag string.
pub const TYPE_TAG_PREFIX: char = ',';

/// Smallest datagram that can hold an address field.
pub const MIN_PACKET_SIZE: usize = 4;

/// Outcome of encoding one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Arguments written to the packet.
    pub encoded: usize,
    /// Arguments dropped because they cannot be represented on the wire.
    pub dropped: usize,
    /// Bytes appended to the destination buffer.
    pub bytes: usize,
}

/// A decoded message plus how far decoding got.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The message decoded so far.
    pub message: Message,
    /// The first type tag the decoder did not recognize, if any.
    ///
    /// When set, `message.args` holds only the arguments before that tag.
    pub unsupported_tag: Option<char>,
}

impl Decoded {
    /// Whether decoding stopped early at an unsupported type tag.
    pub fn is_partial(&self) -> bool {
        self.unsupported_tag.is_some()
    }
}

/// Encode a message into the OSC wire format.
///
/// Wire format:
/// ```text
/// ┌────────────────────┬──────────────────────┬───────────────────────┐
/// │ Address            │ Type tags            │ Arguments             │
/// │ ASCII, NUL, pad %4 │ ",fis", NUL, pad %4  │ f/i: 4B BE            │
/// │                    │                      │ s: ASCII, NUL, pad %4 │
/// └────────────────────┴──────────────────────┴───────────────────────┘
/// ```
///
/// String arguments that are not ASCII or contain NUL are left out of both
/// the tag string and the payload; `EncodeSummary::dropped` counts them.
pub fn encode_message(message: &Message, dst: &mut BytesMut) -> Result<EncodeSummary> {
    validate_address(&message.address)?;

    let encodable: Vec<&Argument> = message
        .args
        .iter()
        .filter(|arg| arg.is_encodable())
        .collect();
    let dropped = message.args.len() - encodable.len();
    if dropped > 0 {
        warn!(
            address = %message.address,
            dropped,
            "dropping OSC arguments that cannot be encoded"
        );
    }

    let tags = message.type_tags();
    let start = dst.len();
    dst.reserve(osc_string_len(&message.address) + osc_string_len(&tags) + encodable.len() * 4);

    put_osc_string(dst, &message.address);
    put_osc_string(dst, &tags);
    for arg in &encodable {
        match arg {
            Argument::Float(value) => dst.put_f32(*value),
            Argument::Int(value) => dst.put_i32(*value),
            Argument::String(value) => put_osc_string(dst, value),
        }
    }

    Ok(EncodeSummary {
        encoded: encodable.len(),
        dropped,
        bytes: dst.len() - start,
    })
}

/// Decode one OSC message from a datagram.
///
/// Fails with `WireError::MalformedPacket` when the address or type-tag
/// header cannot be parsed, or a recognized argument is truncated. An
/// unrecognized type tag ends decoding early and yields the arguments read
/// so far; see [`Decoded::is_partial`].
pub fn decode_message(src: &[u8]) -> Result<Decoded> {
    if src.len() < MIN_PACKET_SIZE {
        return Err(WireError::malformed(format!(
            "packet too short ({} bytes, min {MIN_PACKET_SIZE})",
            src.len()
        )));
    }

    let mut reader = PacketReader::new(src);
    let address = reader.read_string("address")?;
    if address.is_empty() {
        return Err(WireError::malformed("empty address"));
    }
    if reader.remaining() == 0 {
        return Err(WireError::malformed("missing type tag string"));
    }

    let raw_tags = reader.read_string("type tag string")?;
    let tags = raw_tags.strip_prefix(TYPE_TAG_PREFIX).ok_or_else(|| {
        WireError::malformed(format!(
            "type tag string {raw_tags:?} does not start with '{TYPE_TAG_PREFIX}'"
        ))
    })?;

    let mut args = Vec::with_capacity(tags.len());
    let mut unsupported_tag = None;
    for tag in tags.chars() {
        let arg = match tag {
            TAG_FLOAT => Argument::Float(reader.read_f32("float argument")?),
            TAG_INT => Argument::Int(reader.read_i32("int argument")?),
            TAG_STRING => Argument::String(reader.read_string_lossy("string argument")?),
            other => {
                debug!(address, tag = %other, decoded = args.len(), "unsupported OSC type tag");
                unsupported_tag = Some(other);
                break;
            }
        };
        args.push(arg);
    }

    Ok(Decoded {
        message: Message::with_args(address, args),
        unsupported_tag,
    })
}

impl Message {
    /// Encode this message into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        encode_message(self, &mut buf)?;
        Ok(buf.freeze())
    }
}

fn validate_address(address: &str) -> Result<()> {
    if address.is_empty() || !address.is_ascii() || address.contains('\0') {
        return Err(WireError::InvalidAddress(address.to_string()));
    }
    Ok(())
}
