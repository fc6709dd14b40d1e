//! Receives chunked blendshape frames and prints each completed one.
//!
//! Run with:
//!   cargo run --example blend-receiver -- 9000
//!
//! Then start the blend-sender example in another terminal.

use std::thread;
use std::time::{Duration, Instant};

use oscprims::chunk::{ChunkReceiver, ReceiverConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port = std::env::args()
        .nth(1)
        .map(|p| p.parse())
        .transpose()?
        .unwrap_or(9000);

    let mut receiver =
        ChunkReceiver::new(ReceiverConfig::with_port(port).with_title_filter("/blendshapes"));
    receiver.start()?;
    eprintln!("Listening on {:?}", receiver.local_addr());

    let started = Instant::now();
    let mut frames = 0usize;
    while started.elapsed() < Duration::from_secs(30) {
        if let Some(weights) = receiver.try_get_complete("/blendshapes") {
            frames += 1;
            let peak = weights.iter().copied().fold(0.0f32, f32::max);
            println!("frame {frames}: {} weights, peak {peak:.3}", weights.len());
        }
        // Transfers that lost a chunk never complete; drop them.
        receiver.assembler().evict_stale(Duration::from_secs(2));
        thread::sleep(Duration::from_millis(5));
    }

    let stats = receiver.stats();
    eprintln!(
        "accepted={} restarted={} filtered={}",
        stats.accepted(),
        stats.restarted(),
        stats.filtered()
    );
    receiver.stop()?;
    Ok(())
}
