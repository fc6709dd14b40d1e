use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// What `on_chunk_received` did with a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// The chunk was stored alongside any pending chunks.
    Stored,
    /// Chunk 0 arrived while chunks were pending; they were discarded first.
    Restarted,
}

#[derive(Debug)]
struct AssemblyState {
    chunks: BTreeMap<u32, Vec<f32>>,
    updated_at: Instant,
}

impl AssemblyState {
    fn new() -> Self {
        Self {
            chunks: BTreeMap::new(),
            updated_at: Instant::now(),
        }
    }

    /// Concatenate chunks `0..=max` if none is missing.
    fn contiguous_values(&self) -> Option<Vec<f32>> {
        if self.chunks.is_empty() {
            return None;
        }

        let total = self.chunks.values().map(Vec::len).sum();
        let mut values = Vec::with_capacity(total);
        for (expected, (index, chunk)) in self.chunks.iter().enumerate() {
            if *index as usize != expected {
                return None;
            }
            values.extend_from_slice(chunk);
        }
        Some(values)
    }
}

/// Per-title reassembly table for chunked float transfers.
///
/// The table lives behind one mutex and is never handed out; the listener
/// thread feeds chunks while any number of consumers poll for completion.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    table: Mutex<HashMap<String, AssemblyState>>,
}

impl ChunkAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `values` as chunk `index` of `title`.
    ///
    /// A chunk with an index that is already present replaces it. Chunk 0
    /// for a title with pending chunks starts a new transfer and discards
    /// the old chunks.
    pub fn on_chunk_received(&self, title: &str, index: u32, values: Vec<f32>) -> Ingest {
        let mut table = self.lock();
        let state = table
            .entry(title.to_string())
            .or_insert_with(AssemblyState::new);

        let mut ingest = Ingest::Stored;
        if index == 0 && !state.chunks.is_empty() {
            debug!(
                title,
                discarded = state.chunks.len(),
                "chunk 0 starts a new transfer; discarding pending chunks"
            );
            state.chunks.clear();
            ingest = Ingest::Restarted;
        }

        state.chunks.insert(index, values);
        state.updated_at = Instant::now();
        ingest
    }

    /// Take the reassembled array for `title` if it is complete.
    ///
    /// Complete means chunk 0 is present and there is no gap up to the
    /// highest stored index. A completed array is returned once; its state is
    /// removed so the next call returns `None`.
    pub fn try_get_complete(&self, title: &str) -> Option<Vec<f32>> {
        let mut table = self.lock();
        let values = table.get(title)?.contiguous_values()?;
        table.remove(title);
        debug!(title, floats = values.len(), "reassembled chunked transfer");
        Some(values)
    }

    /// Drop pending chunks for `title`. Returns whether anything was pending.
    pub fn clear(&self, title: &str) -> bool {
        self.lock().remove(title).is_some()
    }

    /// Drop all pending chunks.
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    /// Drop titles that have not received a chunk within `max_age`.
    ///
    /// Nothing is evicted unless the owner calls this. Returns the number of
    /// titles removed.
    pub fn evict_stale(&self, max_age: Duration) -> usize {
        let mut table = self.lock();
        let before = table.len();
        table.retain(|title, state| {
            let keep = state.updated_at.elapsed() <= max_age;
            if !keep {
                debug!(title, chunks = state.chunks.len(), "evicting stale transfer");
            }
            keep
        });
        before - table.len()
    }

    /// Titles with pending chunks, sorted.
    pub fn pending_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.lock().keys().cloned().collect();
        titles.sort_unstable();
        titles
    }

    /// Number of titles with pending chunks.
    pub fn pending_len(&self) -> usize {
        self.lock().len()
    }

    /// Number of chunks pending for `title`.
    pub fn chunk_count(&self, title: &str) -> usize {
        self.lock()
            .get(title)
            .map_or(0, |state| state.chunks.len())
    }

    // The table is a plain map; a panic mid-update cannot leave it unusable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, AssemblyState>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
