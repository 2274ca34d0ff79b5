//! Dictionary miner backed by a PATRICIA trie
//!
//! Scans the region left to right, taking the longest dictionary entry
//! starting at each position; matches do not overlap (the cursor jumps
//! past a match). With `FLAG_CASE_INSENSITIVE` the haystack is folded to
//! ASCII lowercase before matching, so dictionaries meant for folded
//! matching should store lowercase keys.

use std::borrow::Cow;
use std::sync::Arc;

use crate::extractor::FLAG_CASE_INSENSITIVE;
use crate::miner::{Miner, MinerDecl, ScanContext, MINER_API_VERSION};
use crate::occurrence::{count_code_points, Occurrence};
use crate::patricia::Patricia;

/// Longest-match dictionary scanner
pub struct DictionaryMiner {
    name: String,
    label: String,
    prob: f32,
    dict: Arc<Patricia>,
}

impl DictionaryMiner {
    /// Plugin declaration for load-by-symbol registration. Parameters:
    /// `path=<trie file>[,label=<label>][,prob=<0..1>]`.
    pub const DECL: MinerDecl = MinerDecl {
        api_version: MINER_API_VERSION,
        name: "dictionary",
        create: create_from_params,
    };

    /// Create a miner over an existing dictionary, confidence 1.0
    pub fn new(name: &str, label: &str, dict: Arc<Patricia>) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            prob: 1.0,
            dict,
        }
    }

    /// Set the confidence stamped on matches (clamped to [0, 1])
    pub fn with_prob(mut self, prob: f32) -> Self {
        self.prob = prob.clamp(0.0, 1.0);
        self
    }

    /// The backing dictionary
    pub fn dict(&self) -> &Arc<Patricia> {
        &self.dict
    }
}

fn create_from_params(params: &str) -> std::result::Result<Box<dyn Miner>, String> {
    let mut path = None;
    let mut label = "dictionary".to_string();
    let mut prob = 1.0f32;

    for part in params.split(',').filter(|p| !p.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("malformed parameter {:?}", part))?;
        match key.trim() {
            "path" => path = Some(value.trim().to_string()),
            "label" => label = value.trim().to_string(),
            "prob" => {
                prob = value
                    .trim()
                    .parse::<f32>()
                    .map_err(|e| format!("bad prob {:?}: {}", value, e))?;
            }
            other => return Err(format!("unknown parameter {:?}", other)),
        }
    }

    let path = path.ok_or_else(|| "missing required parameter `path`".to_string())?;
    let dict = Patricia::from_file(&path).map_err(|e| e.to_string())?;
    Ok(Box::new(
        DictionaryMiner::new("dictionary", &label, Arc::new(dict)).with_prob(prob),
    ))
}

impl Miner for DictionaryMiner {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn scan(&self, ctx: &ScanContext<'_>) -> Vec<Occurrence> {
        let haystack: Cow<'_, [u8]> = if ctx.has_flag(FLAG_CASE_INSENSITIVE) {
            Cow::Owned(ctx.bytes.to_ascii_lowercase())
        } else {
            Cow::Borrowed(ctx.bytes)
        };

        let mut occurrences = Vec::new();
        let mut i = 0usize;
        let mut upos = 0u64;

        while i < haystack.len() {
            match self.dict.longest_match(&haystack[i..]) {
                Some(len) if len > 0 => {
                    // Emit the original-case bytes, not the folded ones
                    let occ = ctx.occurrence(i, len, upos, &self.label, self.prob);
                    upos += occ.ulen;
                    i += len;
                    occurrences.push(occ);
                }
                _ => {
                    // Step one code point without counting continuations
                    let mut j = i + 1;
                    while j < haystack.len() && (haystack[j] & 0xC0) == 0x80 {
                        j += 1;
                    }
                    upos += count_code_points(&haystack[i..j]);
                    i = j;
                }
            }
        }

        occurrences
    }
}
