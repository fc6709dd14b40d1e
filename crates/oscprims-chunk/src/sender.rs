use std::sync::Arc;

use oscprims_transport::{OscSender, TransportError};
use oscprims_wire::Message;
use tracing::{debug, warn};

use crate::address::{chunk_address, trim_title};

/// Anything that can send one OSC message.
///
/// Implemented for [`OscSender`]; tests substitute an in-memory sink.
pub trait MessageSink {
    fn send_message(&self, message: &Message) -> Result<(), TransportError>;
}

impl MessageSink for OscSender {
    fn send_message(&self, message: &Message) -> Result<(), TransportError> {
        self.send(message).map(|_| ())
    }
}

impl<S: MessageSink + ?Sized> MessageSink for &S {
    fn send_message(&self, message: &Message) -> Result<(), TransportError> {
        (**self).send_message(message)
    }
}

impl<S: MessageSink + ?Sized> MessageSink for Arc<S> {
    fn send_message(&self, message: &Message) -> Result<(), TransportError> {
        (**self).send_message(message)
    }
}

/// Result of one chunked send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkSendReport {
    /// Chunks the input was split into.
    pub chunks: usize,
    /// Chunks handed to the transport successfully.
    pub sent: usize,
    /// Chunks whose send failed.
    pub failed: usize,
}

impl ChunkSendReport {
    /// Whether every chunk was sent.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.sent == self.chunks
    }
}

/// Split `values` into chunk messages of at most `max_per_chunk` floats.
///
/// Chunk `i` is addressed `<title>/<i>`. Yields nothing when `values` is
/// empty, `max_per_chunk` is 0 or the title is empty after trimming
/// trailing `/`.
pub fn chunk_messages<'a>(
    values: &'a [f32],
    title: &'a str,
    max_per_chunk: usize,
) -> impl Iterator<Item = Message> + 'a {
    let title = trim_title(title);
    let values = if max_per_chunk == 0 || title.is_empty() {
        &[][..]
    } else {
        values
    };

    values
        .chunks(max_per_chunk.max(1))
        .enumerate()
        .map(move |(index, chunk)| Message::from_floats(chunk_address(title, index as u32), chunk))
}

/// Sends float arrays as a sequence of chunk messages.
///
/// Delivery is best effort: no acknowledgement and no retry. A chunk that
/// fails to send is logged and counted; the remaining chunks are still sent
/// so the receiver can detect the gap.
#[derive(Debug)]
pub struct ChunkedSender<S> {
    sink: S,
}

impl<S: MessageSink> ChunkedSender<S> {
    /// Wrap a message sink.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Send `values` as chunks of at most `max_per_chunk` floats under `title`.
    ///
    /// Empty input, an empty title or a zero chunk size is a no-op that
    /// returns an empty report.
    pub fn send(&self, values: &[f32], title: &str, max_per_chunk: usize) -> ChunkSendReport {
        let mut report = ChunkSendReport::default();

        for message in chunk_messages(values, title, max_per_chunk) {
            report.chunks += 1;
            match self.sink.send_message(&message) {
                Ok(()) => report.sent += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(address = %message.address, error = %err, "chunk send failed");
                }
            }
        }

        if report.chunks > 0 {
            debug!(
                title = trim_title(title),
                floats = values.len(),
                chunks = report.chunks,
                failed = report.failed,
                "sent chunked transfer"
            );
        }
        report
    }

    /// Borrow the underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the sender and return the sink.
    pub fn into_inner(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::address::ChunkMessage;
    use crate::assembler::ChunkAssembler;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<Message>>,
        fail_on: Option<String>,
    }

    impl MessageSink for RecordingSink {
        fn send_message(&self, message: &Message) -> Result<(), TransportError> {
            if self.fail_on.as_deref() == Some(message.address.as_str()) {
                return Err(TransportError::NotConnected);
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn sample(len: usize) -> Vec<f32> {
        (0..len).map(|i| i as f32 * 0.5 - 3.0).collect()
    }

    #[test]
    fn splits_into_bounded_ordered_chunks() {
        let sender = ChunkedSender::new(RecordingSink::default());
        let report = sender.send(&sample(7), "/blend", 3);

        assert_eq!(
            report,
            ChunkSendReport {
                chunks: 3,
                sent: 3,
                failed: 0
            }
        );
        let sent = sender.sink().sent.lock().unwrap();
        let addresses: Vec<&str> = sent.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(addresses, vec!["/blend/0", "/blend/1", "/blend/2"]);
        assert_eq!(sent[2].args.len(), 1);
        assert!(sent.iter().all(|m| m.type_tags().chars().skip(1).all(|t| t == 'f')));
    }

    #[test]
    fn split_then_reassemble_yields_input() {
        for len in [1usize, 2, 5, 64, 100, 257] {
            for max_per_chunk in [1usize, 3, 64, 1000] {
                let values = sample(len);
                let sink = RecordingSink::default();
                ChunkedSender::new(&sink).send(&values, "/rig/face", max_per_chunk);

                let assembler = ChunkAssembler::new();
                for message in sink.sent.lock().unwrap().iter() {
                    let chunk = ChunkMessage::try_from(message).unwrap();
                    assembler.on_chunk_received(&chunk.title, chunk.index, chunk.values);
                }
                assert_eq!(
                    assembler.try_get_complete("/rig/face"),
                    Some(values),
                    "len={len} max={max_per_chunk}"
                );
            }
        }
    }

    #[test]
    fn invalid_input_is_a_silent_noop() {
        let sender = ChunkedSender::new(RecordingSink::default());
        assert_eq!(sender.send(&[], "/blend", 4), ChunkSendReport::default());
        assert_eq!(sender.send(&[1.0], "", 4), ChunkSendReport::default());
        assert_eq!(sender.send(&[1.0], "/", 4), ChunkSendReport::default());
        assert_eq!(sender.send(&[1.0], "//", 4), ChunkSendReport::default());
        assert_eq!(sender.send(&[1.0], "/blend", 0), ChunkSendReport::default());
        assert!(sender.sink().sent.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_chunk_does_not_stop_the_rest() {
        let sink = RecordingSink {
            fail_on: Some("/blend/1".to_string()),
            ..RecordingSink::default()
        };
        let sender = ChunkedSender::new(sink);
        let report = sender.send(&sample(6), "/blend", 2);

        assert_eq!(report.chunks, 3);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.is_complete());

        let sent = sender.into_inner().sent.into_inner().unwrap();
        let addresses: Vec<String> = sent.into_iter().map(|m| m.address).collect();
        assert_eq!(addresses, vec!["/blend/0", "/blend/2"]);
    }

    #[test]
    fn trailing_slash_in_title_is_ignored() {
        let messages: Vec<Message> = chunk_messages(&[1.0, 2.0], "/blend/", 1).collect();
        assert_eq!(messages[0].address, "/blend/0");
        assert_eq!(messages[1].address, "/blend/1");
    }
}
