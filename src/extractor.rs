//! Extraction scheduler
//!
//! The extractor owns a fixed worker pool and a registry of miners, binds
//! one stream at a time, and yields merged occurrence batches. `next` is
//! synchronous: it dispatches one scan task per miner over the unconsumed
//! region, joins them at a single merge barrier, and drains the merged
//! sequence batch by batch.
//!
//! Single-owner discipline: an extractor must be driven by one logical
//! caller at a time. Concurrent `next`/`set_stream`/`add_miner` on the
//! same instance are unsupported and must be serialized by the caller;
//! the `&mut self` receivers encode that contract.

use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam::channel;
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::error::{MinexError, Result};
use crate::miner::{Miner, MinerDecl, ScanContext};
use crate::occurrence::{count_code_points, Occurrence};
use crate::registry::{LoadedMiner, MinerRegistry};
use crate::scheduler::WorkerPool;
use crate::stream::Stream;

/// Fold the haystack to ASCII lowercase before matching
pub const FLAG_CASE_INSENSITIVE: u32 = 1 << 0;
/// Drop occurrences strictly enclosed by another merged occurrence
pub const FLAG_NO_ENCLOSED_OCCURRENCES: u32 = 1 << 1;

/// Multi-threaded extraction scheduler
pub struct Extractor {
    config: ExtractorConfig,
    registry: MinerRegistry,
    pool: WorkerPool,
    stream: Option<Arc<Stream>>,
    flags: u32,
    /// Merged occurrences not yet handed to the caller
    pending: VecDeque<Occurrence>,
    /// True once the bound stream's remainder has been scanned
    scanned: bool,
    last_error: Option<String>,
}

impl Extractor {
    /// Create an extractor with its worker pool sized from `config`
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.threads)?;
        Ok(Self {
            flags: config.flags,
            config,
            registry: MinerRegistry::new(),
            pool,
            stream: None,
            pending: VecDeque::new(),
            scanned: false,
            last_error: None,
        })
    }

    /// Bind the single active stream, resetting scan state.
    ///
    /// The extractor shares ownership through the `Arc` but never
    /// destroys the stream; the caller manages its lifetime. A stream in
    /// the FAILED state is rejected.
    pub fn set_stream(&mut self, stream: Arc<Stream>) -> Result<()> {
        if !stream.is_valid() {
            return self.record(Err(MinexError::StreamFailed(
                "cannot bind a failed stream".to_string(),
            )));
        }
        self.stream = Some(stream);
        self.pending.clear();
        self.scanned = false;
        Ok(())
    }

    /// Drop the bound stream, discarding any undelivered occurrences
    pub fn unset_stream(&mut self) {
        self.stream = None;
        self.pending.clear();
        self.scanned = false;
    }

    /// Load a miner module by path and symbol name.
    ///
    /// On failure nothing is registered and the message is retrievable
    /// via [`last_error`](Self::last_error). Miners added while a stream
    /// is bound take part only in scans dispatched afterwards.
    pub fn add_miner(&mut self, path: &str, symbol: &str, params: &str) -> Result<()> {
        let res = self.registry.add_dynamic(path, symbol, params);
        self.record(res)
    }

    /// Register a declaration without a loader (embedded builds, tests)
    pub fn add_miner_static(&mut self, decl: &MinerDecl, params: &str) -> Result<()> {
        let res = self.registry.add_static(decl, params);
        self.record(res)
    }

    /// Register an already constructed miner
    pub fn add_miner_boxed(&mut self, miner: Box<dyn Miner>) {
        self.registry.add_boxed(miner);
    }

    /// Introspect registered miners in registration order
    pub fn list_loaded(&self) -> Vec<LoadedMiner> {
        self.registry.list_loaded()
    }

    /// Set bits in the behavior mask; returns the resulting mask.
    ///
    /// Flags are consulted when a scan is dispatched, so changes apply to
    /// streams bound (or rebound) afterwards.
    pub fn set_flags(&mut self, mask: u32) -> u32 {
        self.flags |= mask;
        self.flags
    }

    /// Clear bits in the behavior mask; returns the resulting mask
    pub fn unset_flags(&mut self, mask: u32) -> u32 {
        self.flags &= !mask;
        self.flags
    }

    /// Current behavior mask
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Pull the next batch of occurrences, at most `batch` of them
    /// (`0` means the configured default).
    ///
    /// The first call per bound stream scans the whole unconsumed region
    /// across the pool and merges all candidates ascending by byte
    /// position, breaking ties by miner registration order. The stream
    /// cursor advances past each delivered occurrence and reaches the end
    /// of the source once the merged sequence is drained. Returns fewer
    /// than `batch` only at exhaustion; afterwards returns an empty vec
    /// idempotently. Blocks until the batch is ready.
    pub fn next(&mut self, batch: usize) -> Result<Vec<Occurrence>> {
        let stream = match &self.stream {
            Some(stream) => stream.clone(),
            None => return self.record(Err(MinexError::NoStream)),
        };

        if !self.scanned {
            let res = self.scan_remaining(&stream);
            self.record(res)?;
            self.scanned = true;
        }

        let batch = if batch == 0 {
            self.config.default_batch
        } else {
            batch
        };
        let take = batch.min(self.pending.len());
        let drained: Vec<Occurrence> = self.pending.drain(..take).collect();

        if self.pending.is_empty() {
            stream.consume_to_end();
        } else if let Some(last) = drained.last() {
            let end = last.end() as usize;
            if end > stream.cursor() {
                stream.advance(end - stream.cursor());
            }
        }
        Ok(drained)
    }

    /// True once the stream is exhausted and every merged occurrence has
    /// been delivered. Monotonic until the next `set_stream`.
    pub fn eof(&self) -> bool {
        match &self.stream {
            Some(stream) => self.scanned && stream.is_eof() && self.pending.is_empty(),
            None => false,
        }
    }

    /// Message of the most recent failing operation on this extractor.
    ///
    /// Overwritten by the next failure; check right after an operation
    /// reports one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of worker threads in the pool
    pub fn threads(&self) -> usize {
        self.pool.threads()
    }

    /// Dispatch one scan task per miner over the unconsumed region, join
    /// them, and merge into the pending queue
    fn scan_remaining(&mut self, stream: &Arc<Stream>) -> Result<()> {
        if !stream.is_valid() {
            return Err(MinexError::StreamFailed(
                "stream failed before scan".to_string(),
            ));
        }

        let miners: Vec<Arc<dyn Miner>> = self.registry.miners().cloned().collect();
        let start = stream.cursor();
        let base_upos = count_code_points(&stream.bytes()[..start]);
        let flags = self.flags;

        debug!(
            miners = miners.len(),
            region = stream.len() - start,
            "dispatching scan"
        );

        let (tx, rx) = channel::bounded(miners.len());
        for (index, miner) in miners.iter().enumerate() {
            let miner = miner.clone();
            let stream = stream.clone();
            let tx = tx.clone();
            self.pool.execute(move || {
                let ctx =
                    ScanContext::new(&stream.bytes()[start..], start as u64, base_upos, flags);
                let occurrences = miner.scan(&ctx);
                let _ = tx.send((index, occurrences));
            });
        }
        drop(tx);

        // Merge barrier: one result per miner, whatever the completion order
        let mut buckets: Vec<Vec<Occurrence>> = vec![Vec::new(); miners.len()];
        for _ in 0..miners.len() {
            let (index, occurrences) = rx
                .recv()
                .map_err(|_| MinexError::StreamFailed("scan worker died".to_string()))?;
            buckets[index] = occurrences;
        }

        self.pending = merge(buckets, flags);
        Ok(())
    }

    fn record<T>(&mut self, res: Result<T>) -> Result<T> {
        if let Err(e) = &res {
            self.last_error = Some(e.to_string());
        }
        res
    }
}

/// Merge per-miner candidate buffers into one ascending sequence.
///
/// Emission order is (byte position, registration index): first-registered
/// wins position ties, so the result is deterministic for fixed inputs.
/// With `FLAG_NO_ENCLOSED_OCCURRENCES`, an occurrence strictly inside any
/// other surviving occurrence is dropped; equal spans all survive.
fn merge(buckets: Vec<Vec<Occurrence>>, flags: u32) -> VecDeque<Occurrence> {
    let mut tagged: Vec<(usize, Occurrence)> = buckets
        .into_iter()
        .enumerate()
        .flat_map(|(index, bucket)| bucket.into_iter().map(move |occ| (index, occ)))
        .collect();

    if flags & FLAG_NO_ENCLOSED_OCCURRENCES != 0 {
        // Longest-first within a start position, so an enclosing match is
        // seen before anything it contains. With ascending positions it
        // then suffices to track the kept occurrence reaching furthest
        // right: anything ending at or before that frontier is strictly
        // inside the occurrence that set it, unless the spans are equal.
        tagged.sort_by(|a, b| {
            let ka = (a.1.pos, std::cmp::Reverse(a.1.len), a.0);
            let kb = (b.1.pos, std::cmp::Reverse(b.1.len), b.0);
            ka.cmp(&kb)
        });
        let mut kept = Vec::with_capacity(tagged.len());
        let mut furthest: Option<(u64, u64)> = None; // (pos, end)
        for (index, occ) in tagged {
            if let Some((pos, end)) = furthest {
                let same_span = occ.pos == pos && occ.end() == end;
                if occ.end() <= end && !same_span {
                    continue;
                }
            }
            if furthest.map_or(true, |(_, end)| occ.end() > end) {
                furthest = Some((occ.pos, occ.end()));
            }
            kept.push((index, occ));
        }
        tagged = kept;
    }

    tagged.sort_by(|a, b| (a.1.pos, a.0).cmp(&(b.1.pos, b.0)));
    tagged.into_iter().map(|(_, occ)| occ).collect()
}
