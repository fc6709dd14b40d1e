//! Streams a 52-value blendshape frame as chunked OSC transfers.
//!
//! Run with:
//!   cargo run --example blend-sender -- 127.0.0.1 9000
//!
//! Pair it with the blend-receiver example, or with:
//!   cargo run --features cli -- receive --title /blendshapes

use std::thread;
use std::time::Duration;

use oscprims::chunk::ChunkedSender;
use oscprims::transport::OscSender;

const BLENDSHAPES: usize = 52;
const MAX_PER_CHUNK: usize = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.next().map(|p| p.parse()).transpose()?.unwrap_or(9000);

    let sender = OscSender::connect_to(host, port)?;
    let chunks = ChunkedSender::new(&sender);
    eprintln!("Sending to {:?}", sender.peer_addr());

    for frame in 0..100u32 {
        let phase = frame as f32 * 0.1;
        let weights: Vec<f32> = (0..BLENDSHAPES)
            .map(|i| ((phase + i as f32 * 0.3).sin() + 1.0) / 2.0)
            .collect();

        let report = chunks.send(&weights, "/blendshapes", MAX_PER_CHUNK);
        if !report.is_complete() {
            eprintln!("frame {frame}: {} of {} chunks failed", report.failed, report.chunks);
        }
        thread::sleep(Duration::from_millis(33));
    }

    eprintln!("Sent {} datagrams", sender.stats().sent());
    Ok(())
}
