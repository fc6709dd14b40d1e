use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oscprims_transport::{ListenerConfig, ListenerStats, OscListener};
use oscprims_wire::Decoded;
use tracing::{debug, trace};

use crate::address::{chunk_values, parse_chunk_address, trim_title};
use crate::assembler::{ChunkAssembler, Ingest};
use crate::error::Result;

/// Configuration for a [`ChunkReceiver`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiverConfig {
    /// Socket and thread settings for the underlying listener.
    pub listener: ListenerConfig,
    /// Accept only chunks whose base title equals this. Trailing `/` is ignored.
    pub title_filter: Option<String>,
}

impl ReceiverConfig {
    /// Listen on `port` on all IPv4 interfaces, accepting every title.
    pub fn with_port(port: u16) -> Self {
        Self {
            listener: ListenerConfig::with_port(port),
            title_filter: None,
        }
    }

    /// Use an explicit listener configuration.
    pub fn with_listener(mut self, listener: ListenerConfig) -> Self {
        self.listener = listener;
        self
    }

    /// Accept only chunks for `title`. An empty title (after trimming) accepts everything.
    pub fn with_title_filter(mut self, title: impl Into<String>) -> Self {
        self.title_filter = Some(title.into());
        self
    }

    fn normalized_filter(&self) -> Option<String> {
        self.title_filter
            .as_deref()
            .map(trim_title)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
    }
}

/// Counters for messages seen by a [`ChunkReceiver`].
#[derive(Debug, Default)]
pub struct ReceiverStats {
    accepted: AtomicU64,
    restarted: AtomicU64,
    filtered: AtomicU64,
    not_chunk: AtomicU64,
    type_mismatch: AtomicU64,
}

impl ReceiverStats {
    /// Chunks stored in the assembler.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Accepted chunks that discarded a pending transfer.
    pub fn restarted(&self) -> u64 {
        self.restarted.load(Ordering::Relaxed)
    }

    /// Chunks ignored because their title did not match the filter.
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    /// Messages whose address has no numeric index segment.
    pub fn not_chunk(&self) -> u64 {
        self.not_chunk.load(Ordering::Relaxed)
    }

    /// Chunks rejected because an argument was not a float, including
    /// chunks whose decode stopped at an unsupported type tag.
    pub fn type_mismatch(&self) -> u64 {
        self.type_mismatch.load(Ordering::Relaxed)
    }
}

/// Listens for chunk messages and reassembles them per title.
///
/// Chunks are ingested on the listener thread; callers poll
/// [`try_get_complete`](Self::try_get_complete) from any thread.
#[derive(Debug)]
pub struct ChunkReceiver {
    listener: OscListener,
    assembler: Arc<ChunkAssembler>,
    stats: Arc<ReceiverStats>,
}

impl ChunkReceiver {
    /// Create a stopped receiver.
    pub fn new(config: ReceiverConfig) -> Self {
        let assembler = Arc::new(ChunkAssembler::new());
        let stats = Arc::new(ReceiverStats::default());
        let ingest = ChunkIngest {
            filter: config.normalized_filter(),
            assembler: Arc::clone(&assembler),
            stats: Arc::clone(&stats),
        };

        let listener = OscListener::new(config.listener).with_handler(move |decoded| {
            ingest.handle(decoded);
        });

        Self {
            listener,
            assembler,
            stats,
        }
    }

    /// Create and start a receiver on `port`.
    pub fn bind(port: u16) -> Result<Self> {
        let mut receiver = Self::new(ReceiverConfig::with_port(port));
        receiver.start()?;
        Ok(receiver)
    }

    /// Bind the socket and start ingesting chunks.
    pub fn start(&mut self) -> Result<()> {
        self.listener.start()?;
        Ok(())
    }

    /// Stop ingesting and release the socket. Pending chunks are kept.
    pub fn stop(&mut self) -> Result<()> {
        self.listener.stop()?;
        Ok(())
    }

    /// Take the reassembled array for `title` if it is complete.
    ///
    /// Trailing `/` in `title` is ignored; an empty title yields `None`.
    pub fn try_get_complete(&self, title: &str) -> Option<Vec<f32>> {
        let title = trim_title(title);
        if title.is_empty() {
            return None;
        }
        self.assembler.try_get_complete(title)
    }

    /// Whether the listener is running.
    pub fn is_listening(&self) -> bool {
        self.listener.is_listening()
    }

    /// Bound address while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Chunk counters.
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Datagram counters of the underlying listener.
    pub fn listener_stats(&self) -> Arc<ListenerStats> {
        self.listener.stats()
    }

    /// The reassembly table, for clearing or eviction.
    pub fn assembler(&self) -> &ChunkAssembler {
        &self.assembler
    }
}

struct ChunkIngest {
    filter: Option<String>,
    assembler: Arc<ChunkAssembler>,
    stats: Arc<ReceiverStats>,
}

impl ChunkIngest {
    fn handle(&self, decoded: Decoded) {
        let message = &decoded.message;
        let Some((title, index)) = parse_chunk_address(&message.address) else {
            self.stats.not_chunk.fetch_add(1, Ordering::Relaxed);
            trace!(address = %message.address, "ignoring message without chunk index");
            return;
        };

        if self.filter.as_deref().is_some_and(|filter| filter != title) {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
            trace!(title, "ignoring chunk for unfiltered title");
            return;
        }

        // A partial decode is missing its trailing floats.
        if let Some(tag) = decoded.unsupported_tag {
            self.stats.type_mismatch.fetch_add(1, Ordering::Relaxed);
            debug!(
                address = %message.address,
                position = message.args.len(),
                tag = %tag,
                "dropping chunk with unsupported type tag"
            );
            return;
        }

        let values = match chunk_values(message) {
            Ok(values) => values,
            Err(err) => {
                self.stats.type_mismatch.fetch_add(1, Ordering::Relaxed);
                debug!(error = %err, "dropping chunk");
                return;
            }
        };

        trace!(title, index, floats = values.len(), "chunk received");
        if self.assembler.on_chunk_received(title, index, values) == Ingest::Restarted {
            self.stats.restarted.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::time::{Duration, Instant};

    use oscprims_transport::OscSender;
    use oscprims_wire::Message;

    use super::*;
    use crate::sender::ChunkedSender;

    fn loopback_config() -> ReceiverConfig {
        ReceiverConfig::default().with_listener(
            ListenerConfig::with_bind_addr("127.0.0.1:0".parse().unwrap())
                .with_poll_interval(Duration::from_millis(20)),
        )
    }

    fn started(config: ReceiverConfig) -> (ChunkReceiver, OscSender) {
        let mut receiver = ChunkReceiver::new(config);
        receiver.start().expect("receiver should start");
        let port = receiver.local_addr().expect("bound address").port();
        let sender = OscSender::connect_to("127.0.0.1", port).expect("sender should connect");
        (receiver, sender)
    }

    fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline {
            if let Some(value) = poll() {
                return Some(value);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn reassembles_over_loopback() {
        let (receiver, sender) = started(loopback_config());
        let values: Vec<f32> = (0..150).map(|i| i as f32 / 10.0).collect();

        let report = ChunkedSender::new(&sender).send(&values, "/blend", 64);
        assert!(report.is_complete());
        assert_eq!(report.chunks, 3);

        let received = wait_for(|| receiver.try_get_complete("/blend/"));
        assert_eq!(received, Some(values));
        assert_eq!(receiver.stats().accepted(), 3);
        assert_eq!(receiver.try_get_complete("/blend"), None);
    }

    #[test]
    fn title_filter_drops_other_transfers() {
        let (receiver, sender) = started(loopback_config().with_title_filter("/wanted/"));
        let chunks = ChunkedSender::new(&sender);

        chunks.send(&[1.0, 2.0], "/other", 1);
        chunks.send(&[3.0, 4.0], "/wanted", 1);

        let received = wait_for(|| receiver.try_get_complete("/wanted"));
        assert_eq!(received, Some(vec![3.0, 4.0]));
        wait_for(|| (receiver.stats().filtered() == 2).then_some(()))
            .expect("filtered chunks should be counted");
        assert_eq!(receiver.try_get_complete("/other"), None);
        assert_eq!(receiver.assembler().pending_len(), 0);
    }

    #[test]
    fn non_chunk_and_mismatched_messages_are_dropped() {
        let (receiver, sender) = started(loopback_config());

        sender.send(&Message::new("/blend").arg(1.0f32)).unwrap();
        sender
            .send(&Message::new("/blend/0").arg(1.0f32).arg("oops"))
            .unwrap();
        sender.send(&Message::from_floats("/blend/0", &[7.0])).unwrap();

        let received = wait_for(|| receiver.try_get_complete("/blend"));
        assert_eq!(received, Some(vec![7.0]));
        assert_eq!(receiver.stats().not_chunk(), 1);
        assert_eq!(receiver.stats().type_mismatch(), 1);
        assert_eq!(receiver.stats().accepted(), 1);
    }

    #[test]
    fn chunk_with_unsupported_tag_is_never_stored() {
        let (receiver, sender) = started(loopback_config());
        let port = receiver.local_addr().expect("bound address").port();

        // "/blend/1" ",ffd": two floats then a double the decoder cannot read.
        let mut packet = b"/blend/1\0\0\0\0,ffd\0\0\0\0".to_vec();
        packet.extend_from_slice(&1.0f32.to_be_bytes());
        packet.extend_from_slice(&2.0f32.to_be_bytes());
        packet.extend_from_slice(&3.0f64.to_be_bytes());
        let raw = UdpSocket::bind("127.0.0.1:0").unwrap();
        raw.send_to(&packet, ("127.0.0.1", port)).unwrap();

        wait_for(|| (receiver.stats().type_mismatch() == 1).then_some(()))
            .expect("partial chunk should be rejected");
        assert_eq!(receiver.assembler().chunk_count("/blend"), 0);
        assert_eq!(receiver.listener_stats().partial(), 1);

        sender.send(&Message::from_floats("/blend/0", &[7.0])).unwrap();
        let received = wait_for(|| receiver.try_get_complete("/blend"));
        assert_eq!(received, Some(vec![7.0]));
        assert_eq!(receiver.stats().accepted(), 1);
    }

    #[test]
    fn empty_title_never_completes() {
        let receiver = ChunkReceiver::new(loopback_config());
        receiver.assembler().on_chunk_received("", 0, vec![1.0]);
        assert_eq!(receiver.try_get_complete(""), None);
        assert_eq!(receiver.try_get_complete("/"), None);
    }

    #[test]
    fn stop_keeps_pending_chunks() {
        let (mut receiver, sender) = started(loopback_config());
        sender.send(&Message::from_floats("/blend/1", &[2.0])).unwrap();
        wait_for(|| (receiver.assembler().chunk_count("/blend") == 1).then_some(()))
            .expect("chunk should be stored");

        receiver.stop().expect("stop should succeed");
        assert!(!receiver.is_listening());
        assert_eq!(receiver.assembler().pending_titles(), vec!["/blend"]);

        receiver.assembler().on_chunk_received("/blend", 0, vec![1.0]);
        // Chunk 0 with pending chunks restarts the transfer.
        assert_eq!(receiver.try_get_complete("/blend"), Some(vec![1.0]));
    }

    #[test]
    fn normalized_filter_ignores_empty_titles() {
        assert_eq!(
            ReceiverConfig::default().with_title_filter("/").normalized_filter(),
            None
        );
        assert_eq!(
            ReceiverConfig::default()
                .with_title_filter("/a/b//")
                .normalized_filter()
                .as_deref(),
            Some("/a/b")
        );
    }
}
