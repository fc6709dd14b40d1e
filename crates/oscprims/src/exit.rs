use std::fmt;
use std::io;

use oscprims_chunk::ChunkError;
use oscprims_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(err.kind()), format!("{context}: {err}"))
}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Wire(_) => DATA_INVALID,
        TransportError::Io(source) => io_code(source.kind()),
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Send { source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            PERMISSION_DENIED
        }
        TransportError::JoinTimeout(_) => TIMEOUT,
        TransportError::ListenerPanicked => INTERNAL,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn chunk_error(context: &str, err: ChunkError) -> CliError {
    match err {
        ChunkError::Transport(err) => transport_error(context, err),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use oscprims_wire::WireError;

    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9000".parse().expect("literal address should parse")
    }

    #[test]
    fn bind_conflict_is_transport_error() {
        let err = TransportError::Bind {
            addr: addr(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert_eq!(transport_error("bind failed", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn permission_denied_bind_maps_to_50() {
        let err = TransportError::Bind {
            addr: addr(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let cli = transport_error("bind failed", err);
        assert_eq!(cli.code, PERMISSION_DENIED);
        assert!(cli.message.starts_with("bind failed: "));
    }

    #[test]
    fn encode_failure_is_data_invalid() {
        let err = TransportError::Wire(WireError::InvalidAddress("empty".to_string()));
        assert_eq!(transport_error("send failed", err).code, DATA_INVALID);
    }

    #[test]
    fn join_timeout_maps_to_124() {
        let err = TransportError::JoinTimeout(Duration::from_secs(1));
        assert_eq!(transport_error("stop failed", err).code, TIMEOUT);
    }

    #[test]
    fn chunk_errors_unwrap_transport() {
        let err = ChunkError::Transport(TransportError::NotConnected);
        assert_eq!(chunk_error("send failed", err).code, TRANSPORT_ERROR);
        let err = ChunkError::NotAChunk("/x".to_string());
        assert_eq!(chunk_error("receive failed", err).code, DATA_INVALID);
    }
}
