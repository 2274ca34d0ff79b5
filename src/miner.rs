//! Miner contract and plugin ABI
//!
//! A miner is a pluggable scanning algorithm: it reads the unconsumed
//! region of a stream through a [`ScanContext`] and emits positioned,
//! labeled [`Occurrence`]s. Miners are shared read-only across the worker
//! pool, so implementations must be `Send + Sync` and must not keep
//! mutable scan state between calls.
//!
//! Loadable modules export a [`MinerDecl`] under a caller-chosen symbol
//! name (see [`crate::export_miner!`]); the registry validates the API
//! version before running the factory. Static registration uses the same
//! declaration without a loader.

use crate::occurrence::{count_code_points, Occurrence};

/// Version of the miner plugin interface. Bumped on any breaking change
/// to [`Miner`], [`ScanContext`], or [`Occurrence`].
pub const MINER_API_VERSION: u32 = 1;

/// Read-only view of the unconsumed stream region handed to a scan task
#[derive(Clone, Copy, Debug)]
pub struct ScanContext<'a> {
    /// The unconsumed bytes
    pub bytes: &'a [u8],
    /// Byte position of `bytes[0]` in the whole stream
    pub base_pos: u64,
    /// Code-point position of `bytes[0]` in the whole stream
    pub base_upos: u64,
    /// Extractor behavior flags at dispatch time
    pub flags: u32,
}

impl<'a> ScanContext<'a> {
    pub fn new(bytes: &'a [u8], base_pos: u64, base_upos: u64, flags: u32) -> Self {
        Self {
            bytes,
            base_pos,
            base_upos,
            flags,
        }
    }

    /// Check a behavior flag
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// Build an occurrence for `bytes[offset..offset + len]` with
    /// stream-absolute positions.
    ///
    /// `upos_offset` is the code-point position of `offset` within this
    /// region; linear scanners track it incrementally.
    pub fn occurrence(
        &self,
        offset: usize,
        len: usize,
        upos_offset: u64,
        label: &str,
        prob: f32,
    ) -> Occurrence {
        let value = self.bytes[offset..offset + len].to_vec();
        let ulen = count_code_points(&value);
        Occurrence {
            pos: self.base_pos + offset as u64,
            len: len as u64,
            upos: self.base_upos + upos_offset,
            ulen,
            label: label.to_string(),
            prob,
            value,
        }
    }
}

/// A pluggable scanning algorithm
pub trait Miner: Send + Sync {
    /// Identifier of the algorithm (unique within a module)
    fn name(&self) -> &str;

    /// Category label stamped on every emitted occurrence
    fn label(&self) -> &str;

    /// Scan the region and return candidate occurrences.
    ///
    /// Positions must be stream-absolute (use [`ScanContext::occurrence`])
    /// and ascending. The scan must not retain references into the region.
    fn scan(&self, ctx: &ScanContext<'_>) -> Vec<Occurrence>;
}

/// Factory signature exported by plugins. The opaque parameter string is
/// interpreted by the miner; a descriptive message is returned on
/// rejection.
pub type MinerCreateFn = fn(&str) -> std::result::Result<Box<dyn Miner>, String>;

/// Plugin declaration resolved by symbol name from a loaded module.
///
/// One declaration describes exactly one (miner, label) pair. A module
/// offering several matchers exports one declaration symbol per matcher
/// (via repeated [`crate::export_miner!`] invocations), and the caller
/// registers each with its own `add_miner` call.
#[repr(C)]
pub struct MinerDecl {
    /// Must equal [`MINER_API_VERSION`]
    pub api_version: u32,
    /// Miner name, for introspection before instantiation
    pub name: &'static str,
    /// Instantiates the miner from an opaque parameter string
    pub create: MinerCreateFn,
}

/// Export a [`MinerDecl`] under `$symbol` so the registry can resolve it
/// by name from a compiled cdylib.
#[macro_export]
macro_rules! export_miner {
    ($symbol:ident, $name:expr, $create:path) => {
        #[no_mangle]
        pub static $symbol: $crate::miner::MinerDecl = $crate::miner::MinerDecl {
            api_version: $crate::miner::MINER_API_VERSION,
            name: $name,
            create: $create,
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_context_occurrence() {
        let ctx = ScanContext::new(b"cat and dog", 4, 4, 0);
        let occ = ctx.occurrence(8, 3, 8, "animal", 1.0);
        assert_eq!(occ.pos, 12);
        assert_eq!(occ.len, 3);
        assert_eq!(occ.upos, 12);
        assert_eq!(occ.ulen, 3);
        assert_eq!(occ.value, b"dog");
        assert_eq!(occ.label, "animal");
    }

    #[test]
    fn test_scan_context_multibyte_ulen() {
        let text = "žluť".as_bytes();
        let ctx = ScanContext::new(text, 0, 0, 0);
        let occ = ctx.occurrence(0, text.len(), 0, "word", 0.5);
        assert_eq!(occ.len, 6);
        assert_eq!(occ.ulen, 4);
    }

    #[test]
    fn test_flags() {
        let ctx = ScanContext::new(b"", 0, 0, 0b10);
        assert!(ctx.has_flag(0b10));
        assert!(!ctx.has_flag(0b01));
    }
}
