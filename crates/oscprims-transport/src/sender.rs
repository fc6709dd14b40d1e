use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};

use oscprims_wire::Message;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};

/// Default destination host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default OSC port for both sender destination and listener bind.
pub const DEFAULT_PORT: u16 = 9000;

/// Configuration for an [`OscSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Destination host name or IP literal.
    pub host: String,
    /// Destination UDP port.
    pub port: u16,
    /// Local address to bind. Default: unspecified address of the peer's family, port 0.
    pub local_addr: Option<SocketAddr>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            local_addr: None,
        }
    }
}

impl SenderConfig {
    /// Create a config for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            local_addr: None,
        }
    }

    /// Bind the sending socket to an explicit local address.
    pub fn with_local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    /// Human-readable destination for diagnostics.
    pub fn target(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Send counters for one sender.
#[derive(Debug, Default)]
pub struct SenderStats {
    sent: AtomicU64,
    failed: AtomicU64,
}

impl SenderStats {
    /// Datagrams handed to the socket successfully.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Send attempts that failed to encode or transmit.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

/// Sends OSC messages as UDP datagrams to a single peer.
///
/// `send` takes `&self`; a connected sender can be shared between threads
/// behind an `Arc`.
#[derive(Debug)]
pub struct OscSender {
    config: SenderConfig,
    socket: Option<UdpSocket>,
    peer: Option<SocketAddr>,
    stats: SenderStats,
}

impl OscSender {
    /// Create an unconnected sender.
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config,
            socket: None,
            peer: None,
            stats: SenderStats::default(),
        }
    }

    /// Create a sender and connect it immediately.
    pub fn connect_to(host: impl Into<String>, port: u16) -> Result<Self> {
        let mut sender = Self::new(SenderConfig::new(host, port));
        sender.connect()?;
        Ok(sender)
    }

    /// Resolve the destination and attach a UDP socket to it.
    ///
    /// On failure the sender is left unconnected and `send` keeps returning
    /// `TransportError::NotConnected`. Calling this on a connected sender
    /// replaces its socket.
    pub fn connect(&mut self) -> Result<()> {
        self.close();

        let target = self.config.target();
        let connect_err = |source: io::Error| TransportError::Connect {
            target: target.clone(),
            source,
        };

        let peer = resolve(&self.config).map_err(connect_err)?;
        let local = self
            .config
            .local_addr
            .unwrap_or_else(|| unspecified_for(&peer));
        let socket = UdpSocket::bind(local).map_err(connect_err)?;
        socket.connect(peer).map_err(connect_err)?;

        info!(%peer, "OSC sender connected");
        self.socket = Some(socket);
        self.peer = Some(peer);
        Ok(())
    }

    /// Encode and send one message as a single datagram.
    ///
    /// Returns the number of bytes sent. A failure affects only this call.
    pub fn send(&self, message: &Message) -> Result<usize> {
        let (Some(socket), Some(peer)) = (&self.socket, self.peer) else {
            return Err(TransportError::NotConnected);
        };

        let packet = message.to_bytes().inspect_err(|_| {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        })?;

        match socket.send(&packet) {
            Ok(sent) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                trace!(%peer, address = %message.address, bytes = sent, "sent OSC message");
                Ok(sent)
            }
            Err(source) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(%peer, address = %message.address, error = %source, "OSC send failed");
                Err(TransportError::Send {
                    target: peer,
                    source,
                })
            }
        }
    }

    /// Drop the socket. Safe to call when not connected.
    pub fn close(&mut self) {
        if let Some(peer) = self.peer.take() {
            self.socket = None;
            debug!(%peer, "OSC sender disconnected");
        }
    }

    /// Whether `connect` has succeeded and `close` has not been called since.
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Resolved destination, once connected.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Local address of the sending socket, once connected.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|socket| socket.local_addr().ok())
    }

    /// Sender configuration.
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Send counters.
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }
}

fn resolve(config: &SenderConfig) -> io::Result<SocketAddr> {
    (config.host.as_str(), config.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses"))
}

fn unspecified_for(peer: &SocketAddr) -> SocketAddr {
    let ip = match peer {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    SocketAddr::new(ip, 0)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use oscprims_wire::{decode_message, Argument};

    use super::*;

    fn loopback_receiver() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("receiver should bind");
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("timeout should apply");
        socket
    }

    #[test]
    fn send_before_connect_is_rejected() {
        let sender = OscSender::new(SenderConfig::default());
        let err = sender.send(&Message::new("/x")).unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
        assert!(!sender.is_connected());
    }

    #[test]
    fn sends_encoded_datagram_to_peer() {
        let receiver = loopback_receiver();
        let port = receiver.local_addr().unwrap().port();

        let sender = OscSender::connect_to("127.0.0.1", port).expect("sender should connect");
        let msg = Message::new("/fader/1").arg(0.75f32).arg("main");
        let sent = sender.send(&msg).expect("send should succeed");

        let mut buf = [0u8; 1024];
        let (len, from) = receiver.recv_from(&mut buf).expect("datagram should arrive");
        assert_eq!(len, sent);
        assert_eq!(Some(from.port()), sender.local_addr().map(|addr| addr.port()));

        let decoded = decode_message(&buf[..len]).unwrap();
        assert_eq!(decoded.message.address, "/fader/1");
        assert_eq!(decoded.message.args[0], Argument::Float(0.75));
        assert_eq!(sender.stats().sent(), 1);
        assert_eq!(sender.stats().failed(), 0);
    }

    #[test]
    fn connect_failure_leaves_sender_unconnected() {
        // TEST-NET-3 is never assigned to a local interface.
        let config = SenderConfig::new("127.0.0.1", 9)
            .with_local_addr("203.0.113.7:0".parse().unwrap());
        let mut sender = OscSender::new(config);

        let err = sender.connect().unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(!sender.is_connected());
        assert!(matches!(
            sender.send(&Message::new("/x")),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn encode_failure_is_per_call() {
        let receiver = loopback_receiver();
        let port = receiver.local_addr().unwrap().port();
        let sender = OscSender::connect_to("127.0.0.1", port).unwrap();

        let err = sender.send(&Message::new("")).unwrap_err();
        assert!(matches!(err, TransportError::Wire(_)));
        assert_eq!(sender.stats().failed(), 1);

        sender
            .send(&Message::new("/still/usable"))
            .expect("sender should remain usable");
        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let decoded = decode_message(&buf[..len]).unwrap();
        assert_eq!(decoded.message.address, "/still/usable");
    }

    #[test]
    fn close_then_reconnect() {
        let receiver = loopback_receiver();
        let port = receiver.local_addr().unwrap().port();
        let mut sender = OscSender::connect_to("127.0.0.1", port).unwrap();

        sender.close();
        assert!(!sender.is_connected());
        assert!(sender.peer_addr().is_none());
        sender.close();

        sender.connect().expect("reconnect should succeed");
        assert!(sender.is_connected());
        sender.send(&Message::new("/again")).unwrap();
    }

    #[test]
    fn shared_sender_sends_from_many_threads() {
        let receiver = loopback_receiver();
        let port = receiver.local_addr().unwrap().port();
        let sender = std::sync::Arc::new(OscSender::connect_to("127.0.0.1", port).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sender = std::sync::Arc::clone(&sender);
                std::thread::spawn(move || {
                    sender.send(&Message::new("/thread").arg(i)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = Vec::new();
        let mut buf = [0u8; 64];
        for _ in 0..4 {
            let (len, _) = receiver.recv_from(&mut buf).unwrap();
            let decoded = decode_message(&buf[..len]).unwrap();
            seen.push(decoded.message.args[0].as_i32().unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(sender.stats().sent(), 4);
    }

    #[test]
    fn target_brackets_ipv6_literals() {
        assert_eq!(SenderConfig::new("::1", 9000).target(), "[::1]:9000");
        assert_eq!(SenderConfig::default().target(), "127.0.0.1:9000");
    }
}
