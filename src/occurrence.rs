//! Positioned, labeled match records produced by miners

use serde::{Deserialize, Serialize};

/// A single match produced by a miner during a scan pass.
///
/// Positions are tracked both in bytes and in code points so callers can
/// slice the raw content or address it as text. The matched bytes are an
/// owned copy; ownership transfers to the caller on retrieval.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Byte position in the stream
    pub pos: u64,
    /// Byte length of the match
    pub len: u64,
    /// Code-point position in the stream
    pub upos: u64,
    /// Code-point length of the match
    pub ulen: u64,
    /// Miner-assigned category label
    pub label: String,
    /// Confidence in [0, 1]
    pub prob: f32,
    /// Owned copy of the matched bytes
    pub value: Vec<u8>,
}

impl Occurrence {
    /// Byte position one past the end of the match
    pub fn end(&self) -> u64 {
        self.pos + self.len
    }

    /// Check whether this occurrence lies fully inside `other`
    pub fn is_enclosed_by(&self, other: &Occurrence) -> bool {
        self.pos >= other.pos && self.end() <= other.end() && self.len < other.len
    }

    /// Matched value as text, lossy on invalid UTF-8
    pub fn value_utf8(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// Count code points in a byte slice.
///
/// Counts every non-continuation byte as one code point, which matches
/// `chars().count()` on valid UTF-8 and degrades sanely on arbitrary bytes.
pub fn count_code_points(bytes: &[u8]) -> u64 {
    bytes.iter().filter(|b| (*b & 0xC0) != 0x80).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occ(pos: u64, len: u64) -> Occurrence {
        Occurrence {
            pos,
            len,
            upos: pos,
            ulen: len,
            label: "test".to_string(),
            prob: 1.0,
            value: vec![b'x'; len as usize],
        }
    }

    #[test]
    fn test_enclosure() {
        let outer = occ(10, 8);
        let inner = occ(12, 3);
        assert!(inner.is_enclosed_by(&outer));
        assert!(!outer.is_enclosed_by(&inner));
        // Equal spans do not enclose each other
        assert!(!occ(10, 8).is_enclosed_by(&outer));
    }

    #[test]
    fn test_code_point_counting() {
        assert_eq!(count_code_points(b"cat"), 3);
        assert_eq!(count_code_points("žluťoučký".as_bytes()), 9);
        assert_eq!(count_code_points(b""), 0);
        // Lone continuation bytes are not counted
        assert_eq!(count_code_points(&[0x61, 0x80, 0x62]), 2);
    }

    #[test]
    fn test_wire_shape_roundtrip() {
        let o = Occurrence {
            pos: 2,
            len: 3,
            upos: 2,
            ulen: 3,
            label: "animal".to_string(),
            prob: 1.0,
            value: b"cat".to_vec(),
        };
        let json = serde_json::to_string(&o).unwrap();
        let back: Occurrence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, o);
        assert_eq!(back.value_utf8(), "cat");
    }
}
