//! On-disk layout for persisted PATRICIA tries
//!
//! The file is a flat, offset-based image of the node arena so a mapped
//! file can be traversed in place with no pointer fix-up:
//!
//! - header: magic, format version, node/edge/label-pool sizes, crc32
//! - node table: fixed 16-byte entries (label offset/length, first edge,
//!   edge count, terminal flag)
//! - edge table: one `u32` child node index per edge, grouped per node and
//!   ordered by the first byte of the child's label
//! - label pool: concatenated edge label bytes
//!
//! All integers are little-endian. The crc32 covers everything after the
//! header.

use crate::error::{MinexError, Result};

use super::trie::PatriciaTrie;

pub(crate) const MAGIC: [u8; 4] = *b"MXPT";
pub(crate) const FORMAT_VERSION: u32 = 1;

pub(crate) const HEADER_LEN: usize = 24;
pub(crate) const NODE_ENTRY_LEN: usize = 16;
pub(crate) const EDGE_ENTRY_LEN: usize = 4;

/// Parsed file header
#[derive(Clone, Copy, Debug)]
pub(crate) struct Header {
    pub version: u32,
    pub node_count: u32,
    pub edge_count: u32,
    pub label_len: u32,
    pub checksum: u32,
}

impl Header {
    /// Parse and sanity-check a header, including the payload checksum
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(MinexError::InvalidTrieFile(format!(
                "file too short: {} bytes",
                data.len()
            )));
        }
        if data[..4] != MAGIC {
            return Err(MinexError::InvalidTrieFile("bad magic".to_string()));
        }

        let header = Self {
            version: read_u32(data, 4),
            node_count: read_u32(data, 8),
            edge_count: read_u32(data, 12),
            label_len: read_u32(data, 16),
            checksum: read_u32(data, 20),
        };

        if header.version != FORMAT_VERSION {
            return Err(MinexError::InvalidTrieFile(format!(
                "unsupported format version {}",
                header.version
            )));
        }
        if header.node_count == 0 {
            return Err(MinexError::InvalidTrieFile("no nodes".to_string()));
        }

        let expected = HEADER_LEN
            + header.node_count as usize * NODE_ENTRY_LEN
            + header.edge_count as usize * EDGE_ENTRY_LEN
            + header.label_len as usize;
        if data.len() != expected {
            return Err(MinexError::InvalidTrieFile(format!(
                "size mismatch: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }

        let actual = crc32fast::hash(&data[HEADER_LEN..]);
        if actual != header.checksum {
            return Err(MinexError::InvalidTrieFile(format!(
                "checksum mismatch: expected {:08x}, got {:08x}",
                header.checksum, actual
            )));
        }

        Ok(header)
    }

    /// Byte offset of the node table
    pub fn nodes_offset(&self) -> usize {
        HEADER_LEN
    }

    /// Byte offset of the edge table
    pub fn edges_offset(&self) -> usize {
        self.nodes_offset() + self.node_count as usize * NODE_ENTRY_LEN
    }

    /// Byte offset of the label pool
    pub fn labels_offset(&self) -> usize {
        self.edges_offset() + self.edge_count as usize * EDGE_ENTRY_LEN
    }
}

/// Serialize a trie into the flat on-disk image
pub(crate) fn encode_trie(trie: &PatriciaTrie) -> Vec<u8> {
    let nodes = trie.nodes();
    let edge_count: usize = nodes.iter().map(|n| n.children.len()).sum();
    let label_len: usize = nodes.iter().map(|n| n.label.len()).sum();

    let payload_len =
        nodes.len() * NODE_ENTRY_LEN + edge_count * EDGE_ENTRY_LEN + label_len;
    let mut payload = Vec::with_capacity(payload_len);

    // Node table: labels and edges are assigned offsets in arena order
    let mut label_off = 0u32;
    let mut first_edge = 0u32;
    for node in nodes {
        write_u32(&mut payload, label_off);
        write_u32(&mut payload, node.label.len() as u32);
        write_u32(&mut payload, first_edge);
        payload.extend_from_slice(&(node.children.len() as u16).to_le_bytes());
        payload.push(node.terminal as u8);
        payload.push(0);

        label_off += node.label.len() as u32;
        first_edge += node.children.len() as u32;
    }

    // Edge table
    for node in nodes {
        for &child in &node.children {
            write_u32(&mut payload, child);
        }
    }

    // Label pool
    for node in nodes {
        payload.extend_from_slice(&node.label);
    }

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    write_u32(&mut out, FORMAT_VERSION);
    write_u32(&mut out, nodes.len() as u32);
    write_u32(&mut out, edge_count as u32);
    write_u32(&mut out, label_len as u32);
    write_u32(&mut out, crc32fast::hash(&payload));
    out.extend_from_slice(&payload);
    out
}

pub(crate) fn read_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([data[off], data[off + 1]])
}

pub(crate) fn read_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"cat");
        trie.insert(b"car");

        let data = encode_trie(&trie);
        let header = Header::parse(&data).unwrap();
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.node_count as usize, trie.node_count());
        assert_eq!(header.labels_offset() + header.label_len as usize, data.len());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"cat");

        let mut data = encode_trie(&trie);
        data[0] = b'X';
        assert!(Header::parse(&data).is_err());
    }

    #[test]
    fn test_rejects_corrupt_payload() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"cat");

        let mut data = encode_trie(&trie);
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        let err = Header::parse(&data).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_rejects_truncated_file() {
        let mut trie = PatriciaTrie::new();
        trie.insert(b"cat");

        let mut data = encode_trie(&trie);
        data.truncate(data.len() - 2);
        assert!(Header::parse(&data).is_err());
        assert!(Header::parse(&data[..10]).is_err());
    }
}
