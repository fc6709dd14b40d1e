use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use oscprims_transport::{ListenerConfig, OscListener};
use oscprims_wire::Decoded;

use crate::cmd::{install_ctrlc_handler, parse_bind_addr, parse_duration, ListenArgs};
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_message, OutputFormat};

const TICK: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let bind_addr = parse_bind_addr(&args.bind, args.port)?;
    let deadline = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|timeout| Instant::now() + timeout);

    let (tx, rx) = mpsc::channel();
    let mut listener = OscListener::new(ListenerConfig::with_bind_addr(bind_addr)).with_handler(
        move |decoded: Decoded| {
            let _ = tx.send(decoded.message);
        },
    );
    listener
        .start()
        .map_err(|err| transport_error("bind failed", err))?;
    if let Some(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening for OSC messages");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            let _ = listener.stop();
            return Err(CliError::new(
                TIMEOUT,
                format!("timed out after {printed} message(s)"),
            ));
        }

        let message = match rx.recv_timeout(TICK) {
            Ok(message) => message,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        print_message(&message, format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    listener
        .stop()
        .map_err(|err| transport_error("stop failed", err))?;
    Ok(SUCCESS)
}
