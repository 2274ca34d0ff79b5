use serde::{Deserialize, Serialize};

/// Extractor configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Worker threads in the scan pool
    pub threads: usize,
    /// Default batch size when callers pass 0 to `next`
    pub default_batch: usize,
    /// Initial behavior flags bitmask
    pub flags: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            default_batch: 1000,
            flags: 0,
        }
    }
}

impl ExtractorConfig {
    /// Set the number of worker threads (clamped to at least 1)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the default batch size
    pub fn with_default_batch(mut self, batch: usize) -> Self {
        self.default_batch = batch.max(1);
        self
    }

    /// Set the initial flags bitmask
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}
