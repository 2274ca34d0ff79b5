//! Mutable arena-backed PATRICIA trie
//!
//! Nodes live in a flat `Vec` and reference each other by index, so the
//! structure serializes to the on-disk image without pointer fix-up. Node 0
//! is the root and carries an empty label. Sibling edges never share a
//! first byte and labels are maximal except at terminal boundaries.

use std::path::Path;

use crate::error::Result;
use crate::stream::Stream;

use super::format;
use super::{SearchExt, TrieView};

/// A single arena node; the edge label leading to it is stored inline
#[derive(Clone, Debug)]
pub(crate) struct Node {
    /// Compressed label of the edge pointing at this node
    pub label: Vec<u8>,
    /// True if this node represents a complete stored key
    pub terminal: bool,
    /// Child node indices, sorted by the first byte of the child's label
    pub children: Vec<u32>,
}

/// Mutable compressed prefix tree over byte strings
#[derive(Clone, Debug)]
pub struct PatriciaTrie {
    nodes: Vec<Node>,
    key_count: usize,
}

impl PatriciaTrie {
    /// Create an empty trie
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                label: Vec::new(),
                terminal: false,
                children: Vec::new(),
            }],
            key_count: 0,
        }
    }

    /// Bulk-build a trie from a stream of newline-delimited records.
    ///
    /// Empty records are skipped; a trailing `\r` is stripped so CRLF
    /// dictionaries load cleanly. Consumes the stream.
    pub fn from_stream(stream: &Stream) -> Self {
        let mut trie = Self::new();
        for record in stream.remaining().split(|&b| b == b'\n') {
            let record = match record.last() {
                Some(&b'\r') => &record[..record.len() - 1],
                _ => record,
            };
            if !record.is_empty() {
                trie.insert(record);
            }
        }
        stream.consume_to_end();
        trie
    }

    /// Insert a key, splitting edges at the divergence point as needed.
    ///
    /// Returns true if the key was new; duplicate insertion is idempotent
    /// and returns false.
    pub fn insert(&mut self, key: &[u8]) -> bool {
        let mut node = 0u32;
        let mut rest = key;

        loop {
            if rest.is_empty() {
                if self.nodes[node as usize].terminal {
                    return false;
                }
                self.nodes[node as usize].terminal = true;
                self.key_count += 1;
                return true;
            }

            let child = match self.child_by_first_byte(node, rest[0]) {
                Some(child) => child,
                None => {
                    let leaf = self.push_node(rest.to_vec(), true);
                    self.attach_child(node, leaf);
                    self.key_count += 1;
                    return true;
                }
            };

            let common = common_prefix_len(&self.nodes[child as usize].label, rest);
            if common == self.nodes[child as usize].label.len() {
                node = child;
                rest = &rest[common..];
                continue;
            }

            let mid = self.split_edge(node, child, common);
            if common == rest.len() {
                self.nodes[mid as usize].terminal = true;
            } else {
                let leaf = self.push_node(rest[common..].to_vec(), true);
                self.attach_child(mid, leaf);
            }
            self.key_count += 1;
            return true;
        }
    }

    /// Check whether `key` is a stored entry
    pub fn search(&self, key: &[u8]) -> bool {
        super::search_view(self, key)
    }

    /// Look up `key` with node-level detail
    pub fn search_ext(&self, key: &[u8]) -> SearchExt {
        super::search_ext_view(self, key)
    }

    /// Serialize into the flat on-disk image
    pub fn to_bytes(&self) -> Vec<u8> {
        format::encode_trie(self)
    }

    /// Persist to a file that `Patricia::from_file` can map back
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.key_count
    }

    /// Check if no keys are stored
    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Number of arena nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn push_node(&mut self, label: Vec<u8>, terminal: bool) -> u32 {
        self.nodes.push(Node {
            label,
            terminal,
            children: Vec::new(),
        });
        (self.nodes.len() - 1) as u32
    }

    /// Insert `child` into `parent`'s edge list, keeping first-byte order
    fn attach_child(&mut self, parent: u32, child: u32) {
        let first = self.nodes[child as usize].label[0];
        let pos = self.nodes[parent as usize]
            .children
            .partition_point(|&c| self.nodes[c as usize].label[0] < first);
        self.nodes[parent as usize].children.insert(pos, child);
    }

    /// Split the edge to `child` after `common` label bytes, interposing a
    /// new branching node that takes over the shared prefix
    fn split_edge(&mut self, parent: u32, child: u32, common: usize) -> u32 {
        let suffix = self.nodes[child as usize].label.split_off(common);
        let prefix = std::mem::replace(&mut self.nodes[child as usize].label, suffix);

        let mid = self.push_node(prefix, false);
        self.nodes[mid as usize].children.push(child);

        let pos = self.nodes[parent as usize]
            .children
            .iter()
            .position(|&c| c == child)
            .expect("child edge present in parent");
        self.nodes[parent as usize].children[pos] = mid;
        mid
    }
}

impl Default for PatriciaTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieView for PatriciaTrie {
    fn label(&self, node: u32) -> &[u8] {
        &self.nodes[node as usize].label
    }

    fn terminal(&self, node: u32) -> bool {
        self.nodes[node as usize].terminal
    }

    fn edge_count(&self, node: u32) -> u32 {
        self.nodes[node as usize].children.len() as u32
    }

    fn child_at(&self, node: u32, index: u32) -> u32 {
        self.nodes[node as usize].children[index as usize]
    }

    fn child_by_first_byte(&self, node: u32, byte: u8) -> Option<u32> {
        self.nodes[node as usize]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c as usize].label.first() == Some(&byte))
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
