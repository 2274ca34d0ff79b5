//! Round-trip and invariant tests for the PATRICIA trie
//!
//! Covers the save/map cycle: any file produced by `save` must be fully
//! recoverable by `from_file` with identical lookup results for every
//! previously inserted key.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use minex::{Patricia, PatriciaTrie, Stream};

fn word_set() -> Vec<String> {
    // Overlapping prefixes on purpose: forces edge splits at several depths
    let stems = ["car", "cart", "carton", "cat", "do", "dog", "dogs", "dot"];
    let mut words: Vec<String> = stems.iter().map(|s| s.to_string()).collect();
    for i in 0..50 {
        words.push(format!("key{:03}", i));
        words.push(format!("key{:03}x", i));
    }
    words
}

#[test]
fn test_save_reload_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.trie");

    let words = word_set();
    let mut trie = PatriciaTrie::new();
    for word in &words {
        trie.insert(word.as_bytes());
    }
    trie.save(&path).unwrap();

    let mapped = Patricia::from_file(&path).unwrap();
    assert_eq!(mapped.len(), words.len());

    for word in &words {
        assert!(mapped.search(word.as_bytes()), "{}", word);
        let ext = mapped.search_ext(word.as_bytes());
        assert!(ext.found && ext.terminal, "{}", word);
    }

    for absent in ["", "c", "ca", "key", "key0", "zzz", "carto", "key050"] {
        assert!(!mapped.search(absent.as_bytes()), "{}", absent);
    }
}

#[test]
fn test_branch_point_introspection_survives_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("animals.trie");

    let mut trie = Patricia::new();
    for key in [b"cat".as_ref(), b"car", b"dog"] {
        trie.insert(key).unwrap();
    }
    trie.save(&path).unwrap();

    for trie in [&trie, &Patricia::from_file(&path).unwrap()] {
        let ext = trie.search_ext(b"ca");
        assert!(!ext.found);
        assert!(!ext.terminal);
        assert_eq!(ext.edge_count, 2);

        let ext = trie.search_ext(b"absent");
        assert!(!ext.found);
        assert_eq!(ext.edge_count, 0);
    }
}

#[test]
fn test_bulk_build_then_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bulk.trie");

    let records = b"alpha\nbeta\ngamma\n\ndelta";
    let stream = Stream::from_buffer(records);
    let trie = Patricia::from_stream(&stream);
    assert!(stream.is_eof());
    assert_eq!(trie.len(), 4);

    trie.save(&path).unwrap();
    let mapped = Patricia::from_file(&path).unwrap();
    for key in ["alpha", "beta", "gamma", "delta"] {
        assert!(mapped.search(key.as_bytes()), "{}", key);
    }
    assert!(!mapped.search(b"epsilon"));
}

#[test]
fn test_mapped_trie_concurrent_readers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.trie");

    let words = word_set();
    let mut trie = PatriciaTrie::new();
    for word in &words {
        trie.insert(word.as_bytes());
    }
    trie.save(&path).unwrap();

    let mapped = Arc::new(Patricia::from_file(&path).unwrap());
    let words = Arc::new(words);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let mapped = mapped.clone();
            let words = words.clone();
            thread::spawn(move || {
                for word in words.iter().skip(i % 4) {
                    assert!(mapped.search(word.as_bytes()));
                }
                assert!(!mapped.search(b"not-there"));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_rendering_matches_across_representations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("render.trie");

    let mut trie = Patricia::new();
    for key in [b"cat".as_ref(), b"car", b"dog", b"do"] {
        trie.insert(key).unwrap();
    }
    trie.save(&path).unwrap();

    let mapped = Patricia::from_file(&path).unwrap();
    assert_eq!(trie.render(), mapped.render());
    assert_eq!(format!("{}", trie), trie.render());
}

#[test]
fn test_from_file_rejects_garbage() {
    let dir = TempDir::new().unwrap();

    let garbage = dir.path().join("garbage.trie");
    std::fs::write(&garbage, b"this is not a trie file at all").unwrap();
    assert!(Patricia::from_file(&garbage).is_err());

    let truncated = dir.path().join("truncated.trie");
    let mut trie = Patricia::new();
    trie.insert(b"cat").unwrap();
    trie.save(&truncated).unwrap();
    let mut bytes = std::fs::read(&truncated).unwrap();
    bytes.truncate(bytes.len() / 2);
    std::fs::write(&truncated, bytes).unwrap();
    assert!(Patricia::from_file(&truncated).is_err());
}
