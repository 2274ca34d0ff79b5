//! Read-only PATRICIA trie over a memory-mapped file
//!
//! The persisted image is traversed in place: lookups read node and edge
//! entries straight out of the mapping, with no materialization pass. All
//! structural bounds are validated once at open time so traversal never
//! indexes out of range. A mapped trie has no mutation path and is safe
//! for concurrent readers.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{MinexError, Result};

use super::format::{self, Header, EDGE_ENTRY_LEN, NODE_ENTRY_LEN};
use super::{SearchExt, TrieView};

enum TrieData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl TrieData {
    fn bytes(&self) -> &[u8] {
        match self {
            TrieData::Mapped(mmap) => mmap,
            TrieData::Owned(buf) => buf,
        }
    }
}

/// Immutable trie backed by a persisted image
pub struct MappedPatricia {
    data: TrieData,
    header: Header,
    key_count: usize,
}

impl MappedPatricia {
    /// Map a file produced by `save` and expose it as a read-only trie
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
            MinexError::InvalidTrieFile(format!("cannot map {}: {}", path.display(), e))
        })?;
        Self::from_data(TrieData::Mapped(mmap))
    }

    /// Adopt an in-memory image (same layout as the file format)
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_data(TrieData::Owned(bytes))
    }

    fn from_data(data: TrieData) -> Result<Self> {
        let header = Header::parse(data.bytes())?;
        let key_count = validate(data.bytes(), &header)?;
        Ok(Self {
            data,
            header,
            key_count,
        })
    }

    /// Check whether `key` is a stored entry
    pub fn search(&self, key: &[u8]) -> bool {
        super::search_view(self, key)
    }

    /// Look up `key` with node-level detail
    pub fn search_ext(&self, key: &[u8]) -> SearchExt {
        super::search_ext_view(self, key)
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.key_count
    }

    /// Check if no keys are stored
    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Number of nodes in the image, root included
    pub fn node_count(&self) -> usize {
        self.header.node_count as usize
    }

    /// The raw persisted image
    pub fn raw_bytes(&self) -> &[u8] {
        self.data.bytes()
    }

    fn node_entry(&self, node: u32) -> usize {
        self.header.nodes_offset() + node as usize * NODE_ENTRY_LEN
    }

    fn edge_at(&self, index: u32) -> u32 {
        let off = self.header.edges_offset() + index as usize * EDGE_ENTRY_LEN;
        format::read_u32(self.data.bytes(), off)
    }

    fn first_edge(&self, node: u32) -> u32 {
        format::read_u32(self.data.bytes(), self.node_entry(node) + 8)
    }
}

impl TrieView for MappedPatricia {
    fn label(&self, node: u32) -> &[u8] {
        let data = self.data.bytes();
        let entry = self.node_entry(node);
        let off = format::read_u32(data, entry) as usize;
        let len = format::read_u32(data, entry + 4) as usize;
        let start = self.header.labels_offset() + off;
        &data[start..start + len]
    }

    fn terminal(&self, node: u32) -> bool {
        self.data.bytes()[self.node_entry(node) + 14] != 0
    }

    fn edge_count(&self, node: u32) -> u32 {
        format::read_u16(self.data.bytes(), self.node_entry(node) + 12) as u32
    }

    fn child_at(&self, node: u32, index: u32) -> u32 {
        self.edge_at(self.first_edge(node) + index)
    }

    fn child_by_first_byte(&self, node: u32, byte: u8) -> Option<u32> {
        let first = self.first_edge(node);
        (0..self.edge_count(node))
            .map(|i| self.edge_at(first + i))
            .find(|&child| self.label(child).first() == Some(&byte))
    }
}

impl std::fmt::Debug for MappedPatricia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedPatricia")
            .field("nodes", &self.node_count())
            .field("keys", &self.key_count)
            .finish()
    }
}

/// Structural validation of a persisted image. Returns the stored key
/// count (number of terminal nodes).
///
/// Checks, per node: label slice within the pool, edge range within the
/// edge table, child indices in range and never the root, and non-empty
/// labels on non-root nodes so traversal always consumes input. A final
/// pass verifies tree shape: every non-root node is referenced by exactly
/// one edge and the root by none, so rendering cannot recurse through a
/// cycle and no node is counted twice.
fn validate(data: &[u8], header: &Header) -> Result<usize> {
    let node_count = header.node_count;
    let edge_total = header.edge_count;
    let label_total = header.label_len;

    let mut refs = vec![0u32; node_count as usize];
    let mut key_count = 0usize;
    for node in 0..node_count {
        let entry = header.nodes_offset() + node as usize * NODE_ENTRY_LEN;
        let label_off = format::read_u32(data, entry);
        let label_len = format::read_u32(data, entry + 4);
        let first_edge = format::read_u32(data, entry + 8);
        let edge_count = format::read_u16(data, entry + 12) as u32;
        let terminal = data[entry + 14] != 0;

        if label_off.checked_add(label_len).map_or(true, |end| end > label_total) {
            return Err(MinexError::InvalidTrieFile(format!(
                "node {} label out of range",
                node
            )));
        }
        if node == 0 && label_len != 0 {
            return Err(MinexError::InvalidTrieFile("root has a label".to_string()));
        }
        if node != 0 && label_len == 0 {
            return Err(MinexError::InvalidTrieFile(format!(
                "node {} has an empty label",
                node
            )));
        }
        if first_edge
            .checked_add(edge_count)
            .map_or(true, |end| end > edge_total)
        {
            return Err(MinexError::InvalidTrieFile(format!(
                "node {} edges out of range",
                node
            )));
        }

        for i in 0..edge_count {
            let off = header.edges_offset() + (first_edge + i) as usize * EDGE_ENTRY_LEN;
            let child = format::read_u32(data, off);
            if child == 0 || child >= node_count {
                return Err(MinexError::InvalidTrieFile(format!(
                    "node {} edge {} points at invalid node {}",
                    node, i, child
                )));
            }
            refs[child as usize] += 1;
        }

        if terminal {
            key_count += 1;
        }
    }

    for (node, &count) in refs.iter().enumerate().skip(1) {
        if count != 1 {
            return Err(MinexError::InvalidTrieFile(format!(
                "node {} referenced by {} edges",
                node, count
            )));
        }
    }

    Ok(key_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patricia::PatriciaTrie;

    fn sample_trie() -> PatriciaTrie {
        let mut trie = PatriciaTrie::new();
        for key in [b"cat".as_ref(), b"car", b"cart", b"dog", b"do"] {
            trie.insert(key);
        }
        trie
    }

    #[test]
    fn test_mapped_matches_owned() {
        let owned = sample_trie();
        let mapped = MappedPatricia::from_bytes(owned.to_bytes()).unwrap();

        assert_eq!(mapped.len(), owned.len());
        assert_eq!(mapped.node_count(), owned.node_count());

        for key in [
            b"cat".as_ref(),
            b"car",
            b"cart",
            b"dog",
            b"do",
            b"ca",
            b"c",
            b"cats",
            b"",
            b"zebra",
        ] {
            assert_eq!(mapped.search(key), owned.search(key), "{:?}", key);
            assert_eq!(mapped.search_ext(key), owned.search_ext(key), "{:?}", key);
        }
    }

    #[test]
    fn test_mapped_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("animals.trie");

        let owned = sample_trie();
        owned.save(&path).unwrap();

        let mapped = MappedPatricia::from_file(&path).unwrap();
        assert!(mapped.search(b"cart"));
        assert!(!mapped.search(b"ca"));
        assert_eq!(mapped.search_ext(b"do").edge_count, 1);
    }

    #[test]
    fn test_rejects_dangling_edge() {
        let owned = sample_trie();
        let mut bytes = owned.to_bytes();

        // Point the first edge at a node index past the table, then refresh
        // the checksum so only structural validation can catch it.
        let header = Header::parse(&bytes).unwrap();
        let edge_off = header.edges_offset();
        bytes[edge_off..edge_off + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        let crc = crc32fast::hash(&bytes[format::HEADER_LEN..]);
        bytes[20..24].copy_from_slice(&crc.to_le_bytes());

        let err = MappedPatricia::from_bytes(bytes).unwrap_err();
        assert!(err.to_string().contains("invalid node"));
    }

    #[test]
    fn test_rejects_non_tree_edges() {
        let owned = sample_trie();
        let mut bytes = owned.to_bytes();

        // Redirect the second edge at the first edge's child: that child is
        // now referenced twice and the original target not at all. The crc
        // is refreshed so only the shape check can reject the image.
        let header = Header::parse(&bytes).unwrap();
        let edge_off = header.edges_offset();
        let first: [u8; 4] = bytes[edge_off..edge_off + 4].try_into().unwrap();
        bytes[edge_off + 4..edge_off + 8].copy_from_slice(&first);
        let crc = crc32fast::hash(&bytes[format::HEADER_LEN..]);
        bytes[20..24].copy_from_slice(&crc.to_le_bytes());

        let err = MappedPatricia::from_bytes(bytes).unwrap_err();
        assert!(err.to_string().contains("referenced"));
    }
}
