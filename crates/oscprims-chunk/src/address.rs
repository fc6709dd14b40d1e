use oscprims_wire::{Argument, Message};

use crate::error::{ChunkError, Result};

/// Separator between the base title and the chunk index.
pub const INDEX_SEPARATOR: char = '/';

/// Address of chunk `index` of the transfer named `title`.
pub fn chunk_address(title: &str, index: u32) -> String {
    format!("{title}{INDEX_SEPARATOR}{index}")
}

/// Split a chunk address into its base title and index.
///
/// The index is the last `/` segment and must be plain decimal digits; the
/// title is everything before it and may itself contain `/`. Returns `None`
/// when either part is empty or the index does not fit in a `u32`.
pub fn parse_chunk_address(address: &str) -> Option<(&str, u32)> {
    let (title, index) = address.rsplit_once(INDEX_SEPARATOR)?;
    if title.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    index.parse().ok().map(|index| (title, index))
}

/// Normalize a title for lookup by dropping trailing `/`.
pub fn trim_title(title: &str) -> &str {
    title.trim_end_matches(INDEX_SEPARATOR)
}

/// Extract the float payload of a chunk message.
///
/// Every argument must be a float; the first other argument rejects the
/// whole message. No arguments is an empty chunk, not an error.
pub fn chunk_values(message: &Message) -> Result<Vec<f32>> {
    message
        .args
        .iter()
        .enumerate()
        .map(|(position, arg)| match arg {
            Argument::Float(value) => Ok(*value),
            other => Err(ChunkError::TypeMismatch {
                address: message.address.clone(),
                position,
                tag: other.type_tag(),
            }),
        })
        .collect()
}

/// A validated chunk: base title, index and float payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMessage {
    pub title: String,
    pub index: u32,
    pub values: Vec<f32>,
}

impl ChunkMessage {
    /// Build the OSC message carrying this chunk.
    pub fn to_message(&self) -> Message {
        Message::from_floats(chunk_address(&self.title, self.index), &self.values)
    }
}

impl TryFrom<&Message> for ChunkMessage {
    type Error = ChunkError;

    fn try_from(message: &Message) -> Result<Self> {
        let (title, index) = parse_chunk_address(&message.address)
            .ok_or_else(|| ChunkError::NotAChunk(message.address.clone()))?;
        Ok(Self {
            title: title.to_string(),
            index,
            values: chunk_values(message)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_titles() {
        assert_eq!(parse_chunk_address("/blend/0"), Some(("/blend", 0)));
        assert_eq!(
            parse_chunk_address("/rig/face/blend/12"),
            Some(("/rig/face/blend", 12))
        );
        assert_eq!(parse_chunk_address("/blend/007"), Some(("/blend", 7)));
    }

    #[test]
    fn rejects_non_chunk_addresses() {
        for address in [
            "/blend",
            "/blend/",
            "/blend/x",
            "/blend/-1",
            "/blend/+1",
            "/blend/1.5",
            "/0",
            "12",
            "/blend/99999999999",
        ] {
            assert_eq!(parse_chunk_address(address), None, "{address}");
        }
    }

    #[test]
    fn address_roundtrip() {
        let address = chunk_address("/a/b", 42);
        assert_eq!(address, "/a/b/42");
        assert_eq!(parse_chunk_address(&address), Some(("/a/b", 42)));
    }

    #[test]
    fn trim_title_drops_trailing_separators() {
        assert_eq!(trim_title("/blend/"), "/blend");
        assert_eq!(trim_title("/blend//"), "/blend");
        assert_eq!(trim_title("/blend"), "/blend");
        assert_eq!(trim_title("/"), "");
    }

    #[test]
    fn chunk_message_from_float_message() {
        let message = Message::from_floats("/blend/3", &[0.1, 0.2]);
        let chunk = ChunkMessage::try_from(&message).unwrap();
        assert_eq!(chunk.title, "/blend");
        assert_eq!(chunk.index, 3);
        assert_eq!(chunk.values, vec![0.1, 0.2]);
        assert_eq!(chunk.to_message(), message);
    }

    #[test]
    fn non_float_argument_is_type_mismatch() {
        let message = Message::new("/blend/0").arg(1.0f32).arg(2).arg(3.0f32);
        let err = ChunkMessage::try_from(&message).unwrap_err();
        assert!(matches!(
            err,
            ChunkError::TypeMismatch {
                position: 1,
                tag: 'i',
                ..
            }
        ));
    }

    #[test]
    fn empty_chunk_is_valid() {
        let chunk = ChunkMessage::try_from(&Message::new("/blend/4")).unwrap();
        assert!(chunk.values.is_empty());
    }

    #[test]
    fn bad_address_is_not_a_chunk() {
        let err = ChunkMessage::try_from(&Message::new("/blend").arg(1.0f32)).unwrap_err();
        assert!(matches!(err, ChunkError::NotAChunk(_)));
    }
}
