//! Compressed prefix tree (PATRICIA) over byte strings
//!
//! Two representations share one traversal:
//!
//! - `PatriciaTrie`: mutable arena of nodes referenced by flat indices
//! - `MappedPatricia`: read-only view over a persisted image, reloaded
//!   zero-copy via mmap
//!
//! The `Patricia` facade wraps both behind the boundary surface
//! (insert/search/search_ext/save/print). Mutable tries provide no internal
//! synchronization; callers serialize writers. Mapped tries have no
//! mutation path and are safe for any number of concurrent readers.

mod format;
mod mapped;
mod trie;

use std::path::Path;
use std::sync::Arc;

use crate::error::{MinexError, Result};
use crate::stream::Stream;

pub use mapped::MappedPatricia;
pub use trie::PatriciaTrie;

/// Extended lookup result exposing the node reached by the traversal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchExt {
    /// True iff the key is a stored entry
    pub found: bool,
    /// Terminal flag of the node the key names
    pub terminal: bool,
    /// Out-degree of the node the key names
    pub edge_count: u32,
}

/// Read access shared by the owned and mapped representations.
///
/// Node 0 is always the root. Labels of non-root nodes are non-empty, so
/// every traversal step consumes at least one key byte.
pub(crate) trait TrieView {
    fn label(&self, node: u32) -> &[u8];
    fn terminal(&self, node: u32) -> bool;
    fn edge_count(&self, node: u32) -> u32;
    fn child_at(&self, node: u32, index: u32) -> u32;
    fn child_by_first_byte(&self, node: u32, byte: u8) -> Option<u32>;
}

/// Walk `key` from the root. Returns the node reached iff the whole key is
/// consumed exactly at a node boundary; divergence or mid-label exhaustion
/// is a miss.
pub(crate) fn walk_view<V: TrieView>(view: &V, key: &[u8]) -> Option<u32> {
    let mut node = 0u32;
    let mut rest = key;
    loop {
        if rest.is_empty() {
            return Some(node);
        }
        let child = view.child_by_first_byte(node, rest[0])?;
        let label = view.label(child);
        if rest.len() < label.len() || &rest[..label.len()] != label {
            return None;
        }
        rest = &rest[label.len()..];
        node = child;
    }
}

pub(crate) fn search_view<V: TrieView>(view: &V, key: &[u8]) -> bool {
    walk_view(view, key).map_or(false, |node| view.terminal(node))
}

pub(crate) fn search_ext_view<V: TrieView>(view: &V, key: &[u8]) -> SearchExt {
    match walk_view(view, key) {
        Some(node) => SearchExt {
            found: view.terminal(node),
            terminal: view.terminal(node),
            edge_count: view.edge_count(node),
        },
        None => SearchExt::default(),
    }
}

/// Longest terminal prefix of `key`, as a byte length. Used by the
/// dictionary miner for longest-match scanning.
pub(crate) fn longest_match_view<V: TrieView>(view: &V, key: &[u8]) -> Option<usize> {
    let mut node = 0u32;
    let mut consumed = 0usize;
    let mut best = None;
    loop {
        if view.terminal(node) {
            best = Some(consumed);
        }
        let rest = &key[consumed..];
        let child = match rest.first().and_then(|&b| view.child_by_first_byte(node, b)) {
            Some(child) => child,
            None => return best,
        };
        let label = view.label(child);
        if rest.len() < label.len() || &rest[..label.len()] != label {
            return best;
        }
        consumed += label.len();
        node = child;
    }
}

/// ASCII rendering of edges and terminals, for debugging
pub(crate) fn render_view<V: TrieView>(view: &V) -> String {
    let mut out = String::from(".\n");
    render_children(view, 0, "", &mut out);
    out
}

fn render_children<V: TrieView>(view: &V, node: u32, prefix: &str, out: &mut String) {
    let count = view.edge_count(node);
    for i in 0..count {
        let child = view.child_at(node, i);
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "`- \"" } else { "+- \"" });
        out.push_str(&String::from_utf8_lossy(view.label(child)));
        out.push('"');
        if view.terminal(child) {
            out.push_str(" *");
        }
        out.push('\n');
        let deeper = format!("{}{}", prefix, if last { "   " } else { "|  " });
        render_children(view, child, &deeper, out);
    }
}

/// PATRICIA trie boundary surface: owned and buildable, or mapped and
/// read-only
pub enum Patricia {
    Owned(PatriciaTrie),
    Mapped(MappedPatricia),
}

impl Patricia {
    /// Create an empty mutable trie
    pub fn new() -> Self {
        Patricia::Owned(PatriciaTrie::new())
    }

    /// Bulk-build from a stream of newline-delimited records
    pub fn from_stream(stream: &Stream) -> Self {
        Patricia::Owned(PatriciaTrie::from_stream(stream))
    }

    /// Map a saved trie file as a read-only trie (zero-copy reload)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Patricia::Mapped(MappedPatricia::from_file(path)?))
    }

    /// Insert a key; fails with `ReadOnlyTrie` on a mapped trie
    pub fn insert(&mut self, key: &[u8]) -> Result<bool> {
        match self {
            Patricia::Owned(trie) => Ok(trie.insert(key)),
            Patricia::Mapped(_) => Err(MinexError::ReadOnlyTrie),
        }
    }

    /// Check whether `key` is a stored entry
    pub fn search(&self, key: &[u8]) -> bool {
        match self {
            Patricia::Owned(trie) => trie.search(key),
            Patricia::Mapped(trie) => trie.search(key),
        }
    }

    /// Look up `key` with node-level detail
    pub fn search_ext(&self, key: &[u8]) -> SearchExt {
        match self {
            Patricia::Owned(trie) => trie.search_ext(key),
            Patricia::Mapped(trie) => trie.search_ext(key),
        }
    }

    /// Persist to a file that `from_file` can map back
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        match self {
            Patricia::Owned(trie) => trie.save(path),
            Patricia::Mapped(trie) => {
                std::fs::write(path, trie.raw_bytes())?;
                Ok(())
            }
        }
    }

    /// True for tries loaded via `from_file`
    pub fn is_read_only(&self) -> bool {
        matches!(self, Patricia::Mapped(_))
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        match self {
            Patricia::Owned(trie) => trie.len(),
            Patricia::Mapped(trie) => trie.len(),
        }
    }

    /// Check if no keys are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// ASCII rendering of the trie
    pub fn render(&self) -> String {
        match self {
            Patricia::Owned(trie) => render_view(trie),
            Patricia::Mapped(trie) => render_view(trie),
        }
    }

    /// Print the rendering to stdout
    pub fn print(&self) {
        print!("{}", self.render());
    }

    pub(crate) fn longest_match(&self, key: &[u8]) -> Option<usize> {
        match self {
            Patricia::Owned(trie) => longest_match_view(trie, key),
            Patricia::Mapped(trie) => longest_match_view(trie, key),
        }
    }
}

impl Default for Patricia {
    fn default() -> Self {
        Self::new()
    }
}

impl From<PatriciaTrie> for Patricia {
    fn from(trie: PatriciaTrie) -> Self {
        Patricia::Owned(trie)
    }
}

impl std::fmt::Display for Patricia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Build a shared dictionary from a list of keys, for miner construction
pub fn dictionary<I, K>(keys: I) -> Arc<Patricia>
where
    I: IntoIterator<Item = K>,
    K: AsRef<[u8]>,
{
    let mut trie = PatriciaTrie::new();
    for key in keys {
        trie.insert(key.as_ref());
    }
    Arc::new(Patricia::Owned(trie))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_insert_and_save() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dict.trie");

        let mut trie = Patricia::new();
        assert!(trie.insert(b"cat").unwrap());
        assert!(trie.insert(b"dog").unwrap());
        assert!(!trie.is_read_only());
        trie.save(&path).unwrap();

        let mut mapped = Patricia::from_file(&path).unwrap();
        assert!(mapped.is_read_only());
        assert_eq!(mapped.len(), 2);
        assert!(mapped.search(b"cat"));
        assert!(matches!(
            mapped.insert(b"bird"),
            Err(MinexError::ReadOnlyTrie)
        ));

        // Mapped tries can be re-saved byte for byte
        let copy = dir.path().join("copy.trie");
        mapped.save(&copy).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&copy).unwrap());
    }

    #[test]
    fn test_render_marks_terminals_and_branches() {
        let mut trie = Patricia::new();
        for key in [b"cat".as_ref(), b"car", b"dog"] {
            trie.insert(key).unwrap();
        }
        let rendered = trie.render();
        assert!(rendered.contains("\"ca\""));
        assert!(rendered.contains("\"t\" *"));
        assert!(rendered.contains("\"r\" *"));
        assert!(rendered.contains("\"dog\" *"));
        // The shared prefix itself is not terminal
        assert!(!rendered.contains("\"ca\" *"));
    }

    #[test]
    fn test_longest_match() {
        let trie = dictionary(["do", "dog", "dogs"]);
        assert_eq!(trie.longest_match(b"dogsled"), Some(4));
        assert_eq!(trie.longest_match(b"dot"), Some(2));
        assert_eq!(trie.longest_match(b"cat"), None);
        assert_eq!(trie.longest_match(b""), None);
    }
}
