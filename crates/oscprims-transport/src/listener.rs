use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use oscprims_wire::{decode_message, Decoded};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, TransportError};
use crate::sender::DEFAULT_PORT;

/// Receive buffer size; the largest IPv4 UDP payload.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 65_507;

/// Receive timeout used as a fallback for noticing a stop request.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long `stop` waits for the receive loop to exit.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Callback invoked on the listener thread for every decoded message.
///
/// Receives the full [`Decoded`] so handlers can tell a partial decode
/// (stopped at an unsupported type tag) from a complete one.
pub type MessageHandler = Arc<dyn Fn(Decoded) + Send + Sync + 'static>;

/// Configuration for an [`OscListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Local address to bind.
    pub bind_addr: SocketAddr,
    /// Size of the receive buffer. Longer datagrams are truncated by the OS.
    pub max_datagram_size: usize,
    /// Socket read timeout between stop-flag checks.
    pub poll_interval: Duration,
    /// Upper bound on how long `stop` blocks joining the receive thread.
    pub join_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::with_port(DEFAULT_PORT)
    }
}

impl ListenerConfig {
    /// Listen on `port` on all IPv4 interfaces.
    pub fn with_port(port: u16) -> Self {
        Self::with_bind_addr(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
    }

    /// Listen on an explicit local address.
    pub fn with_bind_addr(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }

    /// Override the stop-flag poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override the join timeout used by `stop`.
    pub fn with_join_timeout(mut self, join_timeout: Duration) -> Self {
        self.join_timeout = join_timeout;
        self
    }
}

/// Receive-side counters for one listener, shared with its receive loop.
#[derive(Debug, Default)]
pub struct ListenerStats {
    received: AtomicU64,
    dispatched: AtomicU64,
    partial: AtomicU64,
    malformed: AtomicU64,
    receive_errors: AtomicU64,
    handler_panics: AtomicU64,
}

impl ListenerStats {
    /// Non-empty datagrams read from the socket.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Messages handed to the handler.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Messages that decoded only up to an unsupported type tag.
    pub fn partial(&self) -> u64 {
        self.partial.load(Ordering::Relaxed)
    }

    /// Datagrams dropped because the header could not be decoded.
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Socket errors swallowed by the receive loop.
    pub fn receive_errors(&self) -> u64 {
        self.receive_errors.load(Ordering::Relaxed)
    }

    /// Handler invocations that panicked. The loop keeps running after each.
    pub fn handler_panics(&self) -> u64 {
        self.handler_panics.load(Ordering::Relaxed)
    }
}

/// Binds a UDP port and dispatches decoded OSC messages from one background thread.
///
/// Lifecycle is explicit: [`start`](Self::start) binds and spawns the
/// receive loop, [`stop`](Self::stop) wakes it, joins it and releases the
/// socket. Both are no-ops when already in the requested state, and `Drop`
/// stops a running listener.
pub struct OscListener {
    config: ListenerConfig,
    handler: Option<MessageHandler>,
    stats: Arc<ListenerStats>,
    running: Option<ListenerThread>,
}

struct ListenerThread {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    done: Receiver<()>,
    waker: UdpSocket,
    local_addr: SocketAddr,
}

impl OscListener {
    /// Create a stopped listener.
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            handler: None,
            stats: Arc::new(ListenerStats::default()),
            running: None,
        }
    }

    /// Register the message handler (builder style).
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Decoded) + Send + Sync + 'static,
    {
        self.set_handler(handler);
        self
    }

    /// Register the message handler, replacing any previous one.
    ///
    /// The handler runs on the receive thread and must return promptly;
    /// while it runs no further datagrams are read. A running loop keeps the
    /// handler it was started with until the next `start`. A panic in the
    /// handler is caught and counted in [`ListenerStats::handler_panics`];
    /// the datagram is lost and the loop carries on.
    pub fn set_handler<F>(&mut self, handler: F)
    where
        F: Fn(Decoded) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
    }

    /// Bind the socket and spawn the receive loop.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            debug!("OSC listener already running");
            return Ok(());
        }

        let addr = self.config.bind_addr;
        let socket =
            UdpSocket::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;
        // A zero read timeout is rejected by the OS.
        socket.set_read_timeout(Some(self.config.poll_interval.max(Duration::from_millis(1))))?;
        let waker = socket.try_clone()?;

        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = mpsc::sync_channel(1);
        let receive_loop = ReceiveLoop {
            socket,
            stop: Arc::clone(&stop),
            handler: self.handler.clone(),
            stats: Arc::clone(&self.stats),
            max_datagram_size: self.config.max_datagram_size.max(1),
        };

        let handle = thread::Builder::new()
            .name(format!("osc-listener-{}", local_addr.port()))
            .spawn(move || {
                receive_loop.run();
                let _ = done_tx.send(());
            })?;

        info!(%local_addr, "OSC listener started");
        self.running = Some(ListenerThread {
            handle,
            stop,
            done,
            waker,
            local_addr,
        });
        Ok(())
    }

    /// Signal the receive loop to exit and join it within the join timeout.
    ///
    /// The listener is stopped when this returns, even on error:
    /// `JoinTimeout` means the thread was detached and still holds the
    /// socket until its handler returns.
    pub fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.stop.store(true, Ordering::SeqCst);
        wake(&running.waker, running.local_addr);

        match running.done.recv_timeout(self.config.join_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => match running.handle.join() {
                Ok(()) => {
                    info!(local_addr = %running.local_addr, "OSC listener stopped");
                    Ok(())
                }
                Err(_) => {
                    warn!(local_addr = %running.local_addr, "OSC listener thread panicked");
                    Err(TransportError::ListenerPanicked)
                }
            },
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    local_addr = %running.local_addr,
                    timeout = ?self.config.join_timeout,
                    "OSC listener thread did not stop in time; detaching"
                );
                Err(TransportError::JoinTimeout(self.config.join_timeout))
            }
        }
    }

    /// Whether a receive loop is running.
    pub fn is_listening(&self) -> bool {
        self.running.is_some()
    }

    /// Bound address while listening. Resolves port 0 to the assigned port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Listener configuration.
    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Receive counters. They accumulate across restarts.
    pub fn stats(&self) -> Arc<ListenerStats> {
        Arc::clone(&self.stats)
    }
}

impl Drop for OscListener {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!(error = %err, "OSC listener did not shut down cleanly");
        }
    }
}

impl std::fmt::Debug for OscListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscListener")
            .field("config", &self.config)
            .field("has_handler", &self.handler.is_some())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

/// Unblock a pending `recv_from` with an empty datagram to our own socket.
fn wake(waker: &UdpSocket, local_addr: SocketAddr) {
    let target = match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local_addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local_addr.port())
        }
        _ => local_addr,
    };
    if let Err(err) = waker.send_to(&[], target) {
        debug!(%target, error = %err, "wake datagram failed; relying on poll interval");
    }
}

struct ReceiveLoop {
    socket: UdpSocket,
    stop: Arc<AtomicBool>,
    handler: Option<MessageHandler>,
    stats: Arc<ListenerStats>,
    max_datagram_size: usize,
}

impl ReceiveLoop {
    fn run(self) {
        let mut buf = vec![0u8; self.max_datagram_size];
        debug!("OSC receive loop running");

        while !self.stop.load(Ordering::SeqCst) {
            let (len, from) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(err) => {
                    if self.stop.load(Ordering::SeqCst) {
                        break;
                    }
                    self.stats.receive_errors.fetch_add(1, Ordering::Relaxed);
                    debug!(error = %err, "OSC receive failed");
                    continue;
                }
            };

            if len == 0 {
                continue;
            }
            self.dispatch(&buf[..len], from);
        }

        debug!("OSC receive loop exiting");
    }

    fn dispatch(&self, datagram: &[u8], from: SocketAddr) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let decoded = match decode_message(datagram) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                debug!(%from, error = %err, "dropping malformed OSC packet");
                return;
            }
        };

        if decoded.is_partial() {
            self.stats.partial.fetch_add(1, Ordering::Relaxed);
        }

        let Some(handler) = &self.handler else {
            trace!(%from, address = %decoded.message.address, "no handler registered");
            return;
        };
        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
        let address = decoded.message.address.clone();
        if panic::catch_unwind(AssertUnwindSafe(|| handler(decoded))).is_err() {
            self.stats.handler_panics.fetch_add(1, Ordering::Relaxed);
            warn!(%from, %address, "OSC message handler panicked");
        }
    }
}
