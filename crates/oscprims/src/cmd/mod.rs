use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use oscprims_transport::{DEFAULT_HOST, DEFAULT_PORT};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod receive;
pub mod send;
pub mod send_floats;
pub mod version;

/// Floats per chunk when `--max-per-chunk` is not given.
pub const DEFAULT_MAX_PER_CHUNK: usize = 64;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single OSC message.
    Send(SendArgs),
    /// Send a float array as a chunked transfer.
    SendFloats(SendFloatsArgs),
    /// Listen and print received messages.
    Listen(ListenArgs),
    /// Receive chunked transfers and print each completed array.
    Receive(ReceiveArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::SendFloats(args) => send_floats::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Receive(args) => receive::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Destination host.
    #[arg(long, env = "OSCPRIMS_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Destination UDP port.
    #[arg(long, short = 'p', env = "OSCPRIMS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// OSC address pattern, e.g. /synth/1/freq.
    pub address: String,
    /// Arguments: `i:42`, `f:0.5`, `s:text`, or untyped (integer, float, else string).
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct SendFloatsArgs {
    /// Base title; chunks are addressed <TITLE>/<index>.
    pub title: String,
    /// Comma-separated float values.
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        conflicts_with = "file",
        required_unless_present = "file"
    )]
    pub values: Option<Vec<f32>>,
    /// Read floats from a file (separated by whitespace or commas).
    #[arg(long, conflicts_with = "values")]
    pub file: Option<PathBuf>,
    /// Maximum floats per chunk message.
    #[arg(long, default_value_t = DEFAULT_MAX_PER_CHUNK)]
    pub max_per_chunk: usize,
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// UDP port to bind.
    #[arg(long, short = 'p', env = "OSCPRIMS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up after this long without reaching --count (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// UDP port to bind.
    #[arg(long, short = 'p', env = "OSCPRIMS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,
    /// Only accept chunks for this title.
    #[arg(long)]
    pub title: Option<String>,
    /// Exit after N completed arrays.
    #[arg(long)]
    pub count: Option<usize>,
    /// Give up after this long without reaching --count (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

pub fn parse_bind_addr(bind: &str, port: u16) -> CliResult<std::net::SocketAddr> {
    let ip: std::net::IpAddr = bind
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid bind address: {bind}")))?;
    Ok(std::net::SocketAddr::new(ip, port))
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_bind_addr_accepts_ip_literals() {
        assert_eq!(
            parse_bind_addr("127.0.0.1", 9000).unwrap().to_string(),
            "127.0.0.1:9000"
        );
        assert_eq!(parse_bind_addr("::1", 9).unwrap().to_string(), "[::1]:9");
        assert_eq!(parse_bind_addr("localhost", 9).unwrap_err().code, USAGE);
    }
}
