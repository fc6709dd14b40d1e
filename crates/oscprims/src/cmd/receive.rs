use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use oscprims_chunk::{trim_title, ChunkReceiver, ReceiverConfig};
use oscprims_transport::ListenerConfig;

use crate::cmd::{install_ctrlc_handler, parse_bind_addr, parse_duration, ReceiveArgs};
use crate::exit::{chunk_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_floats, OutputFormat};

const POLL: Duration = Duration::from_millis(10);

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let bind_addr = parse_bind_addr(&args.bind, args.port)?;
    let deadline = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|timeout| Instant::now() + timeout);

    let mut config =
        ReceiverConfig::default().with_listener(ListenerConfig::with_bind_addr(bind_addr));
    if let Some(title) = &args.title {
        config = config.with_title_filter(title.as_str());
    }

    let mut receiver = ChunkReceiver::new(config);
    receiver
        .start()
        .map_err(|err| chunk_error("bind failed", err))?;
    if let Some(addr) = receiver.local_addr() {
        tracing::info!(%addr, title = args.title.as_deref(), "receiving chunked transfers");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut completed = 0usize;
    'poll: while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            let _ = receiver.stop();
            return Err(CliError::new(
                TIMEOUT,
                format!("timed out after {completed} transfer(s)"),
            ));
        }

        for title in candidate_titles(&receiver, args.title.as_deref()) {
            let Some(values) = receiver.try_get_complete(&title) else {
                continue;
            };
            print_floats(&title, &values, format);
            completed = completed.saturating_add(1);
            if args.count.is_some_and(|count| completed >= count) {
                break 'poll;
            }
        }

        thread::sleep(POLL);
    }

    let stats = receiver.stats();
    tracing::debug!(
        accepted = stats.accepted(),
        restarted = stats.restarted(),
        filtered = stats.filtered(),
        not_chunk = stats.not_chunk(),
        type_mismatch = stats.type_mismatch(),
        "receiver finished"
    );
    receiver
        .stop()
        .map_err(|err| chunk_error("stop failed", err))?;
    Ok(SUCCESS)
}

fn candidate_titles(receiver: &ChunkReceiver, filter: Option<&str>) -> Vec<String> {
    match filter.map(trim_title).filter(|title| !title.is_empty()) {
        Some(title) => vec![title.to_string()],
        None => receiver.assembler().pending_titles(),
    }
}
