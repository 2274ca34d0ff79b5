//! minex — streaming text-mining engine
//!
//! Streams arbitrary byte content through pluggable pattern-matching
//! algorithms ("miners") and yields positioned, labeled matches
//! ("occurrences"). A companion PATRICIA trie provides exact/prefix
//! lookup over large dictionaries and persists to disk for zero-copy
//! reload.
//!
//! # Architecture
//!
//! - [`Stream`]: sequential byte source (file- or memory-backed)
//! - [`Extractor`]: binds a stream, fans scan tasks out over a fixed
//!   worker pool, and yields deterministic occurrence batches
//! - [`MinerRegistry`]: append-only set of miners, loaded by path/symbol
//!   or registered statically
//! - [`Patricia`]: compressed prefix tree, buildable in memory or mapped
//!   read-only from a saved file
//!
//! ```no_run
//! use std::sync::Arc;
//! use minex::{dictionary, DictionaryMiner, Extractor, ExtractorConfig, Stream};
//!
//! # fn main() -> minex::Result<()> {
//! let mut extractor = Extractor::new(ExtractorConfig::default())?;
//! extractor.add_miner_boxed(Box::new(DictionaryMiner::new(
//!     "animals",
//!     "animal",
//!     dictionary(["cat", "dog"]),
//! )));
//!
//! let stream = Arc::new(Stream::from_buffer(b"a cat and a dog"));
//! extractor.set_stream(stream)?;
//! while !extractor.eof() {
//!     for occ in extractor.next(100)? {
//!         println!("{}@{}: {}", occ.label, occ.pos, occ.value_utf8());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extractor;
pub mod miner;
pub mod miners;
pub mod occurrence;
pub mod patricia;
pub mod registry;
mod scheduler;
pub mod stream;

pub use config::ExtractorConfig;
pub use error::{MinexError, Result};
pub use extractor::{Extractor, FLAG_CASE_INSENSITIVE, FLAG_NO_ENCLOSED_OCCURRENCES};
pub use miner::{Miner, MinerDecl, ScanContext, MINER_API_VERSION};
pub use miners::DictionaryMiner;
pub use occurrence::Occurrence;
pub use patricia::{dictionary, MappedPatricia, Patricia, PatriciaTrie, SearchExt};
pub use registry::{LoadedMiner, MinerRegistry};
pub use stream::{Stream, StreamState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
