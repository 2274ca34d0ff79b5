//! Sequential byte-source abstraction with failure/EOF state
//!
//! A `Stream` is either backed by a memory-mapped file or by an owned
//! buffer copied from the caller. Content is immutable once constructed;
//! the cursor and state use atomics so a stream shared behind `Arc` can be
//! advanced by its single logical driver while scan tasks read the content
//! slice concurrently.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use memmap2::Mmap;

use crate::error::{MinexError, Result};

const STATE_OK: u8 = 0;
const STATE_EOF: u8 = 1;
const STATE_FAILED: u8 = 2;

/// Stream lifecycle state
///
/// `Failed` is terminal and unrecoverable. `Eof` is terminal for reading
/// but not an error; neither transitions back to `Ok`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Ok,
    Eof,
    Failed,
}

enum StreamData {
    /// Engine-owned copy of a caller-supplied buffer
    Buffer(Vec<u8>),
    /// Read-only mapping of a file
    File { mmap: Mmap, path: PathBuf },
}

/// A sequential byte source for extraction and trie bulk loading
pub struct Stream {
    data: StreamData,
    cursor: AtomicUsize,
    state: AtomicU8,
}

impl Stream {
    /// Open and memory-map a file.
    ///
    /// Any I/O error is returned to the caller; partially acquired
    /// resources are released on the error path by drop. An empty file is
    /// valid and starts at EOF.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            MinexError::StreamFailed(format!("cannot open {}: {}", path.display(), e))
        })?;
        let len = file
            .metadata()
            .map_err(|e| {
                MinexError::StreamFailed(format!("cannot stat {}: {}", path.display(), e))
            })?
            .len();

        // mmap rejects zero-length mappings; represent an empty file as an
        // empty buffer instead.
        if len == 0 {
            return Ok(Self::from_data(StreamData::Buffer(Vec::new())));
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
            MinexError::StreamFailed(format!("cannot map {}: {}", path.display(), e))
        })?;

        Ok(Self::from_data(StreamData::File {
            mmap,
            path: path.to_path_buf(),
        }))
    }

    /// Copy a caller-supplied buffer into engine-owned memory.
    ///
    /// The caller's original buffer may be discarded after this returns.
    pub fn from_buffer(bytes: &[u8]) -> Self {
        Self::from_data(StreamData::Buffer(bytes.to_vec()))
    }

    fn from_data(data: StreamData) -> Self {
        let empty = match &data {
            StreamData::Buffer(b) => b.is_empty(),
            StreamData::File { mmap, .. } => mmap.is_empty(),
        };
        Self {
            data,
            cursor: AtomicUsize::new(0),
            state: AtomicU8::new(if empty { STATE_EOF } else { STATE_OK }),
        }
    }

    /// Full content of the stream
    pub fn bytes(&self) -> &[u8] {
        match &self.data {
            StreamData::Buffer(b) => b,
            StreamData::File { mmap, .. } => mmap,
        }
    }

    /// Unconsumed portion of the stream
    pub fn remaining(&self) -> &[u8] {
        &self.bytes()[self.cursor()..]
    }

    /// Current consumption cursor in bytes
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire).min(self.len())
    }

    /// Total length in bytes
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    /// Check if the stream has no content at all
    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// Source path for file-backed streams
    pub fn path(&self) -> Option<&Path> {
        match &self.data {
            StreamData::Buffer(_) => None,
            StreamData::File { path, .. } => Some(path),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        match self.state.load(Ordering::Acquire) {
            STATE_FAILED => StreamState::Failed,
            STATE_EOF => StreamState::Eof,
            _ => StreamState::Ok,
        }
    }

    /// True unless the stream has failed
    pub fn is_valid(&self) -> bool {
        self.state() != StreamState::Failed
    }

    /// True once the cursor has exhausted the source
    pub fn is_eof(&self) -> bool {
        self.state() == StreamState::Eof
    }

    /// Advance the consumption cursor by `n` bytes, flipping to EOF once
    /// the source is exhausted. FAILED is never overwritten.
    pub(crate) fn advance(&self, n: usize) {
        let len = self.len();
        let pos = self
            .cursor
            .fetch_add(n, Ordering::AcqRel)
            .saturating_add(n);
        if pos >= len {
            let _ = self.state.compare_exchange(
                STATE_OK,
                STATE_EOF,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    /// Consume everything up to the end of the source
    pub(crate) fn consume_to_end(&self) {
        self.advance(self.len() - self.cursor());
    }

    /// Mark the stream terminally failed (mid-read error)
    pub(crate) fn mark_failed(&self) {
        self.state.store(STATE_FAILED, Ordering::Release);
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("source", &self.path().map(Path::to_path_buf))
            .field("len", &self.len())
            .field("cursor", &self.cursor())
            .field("state", &self.state())
            .finish()
    }
}
