use thiserror::Error;

/// Main error type for minex operations
#[derive(Error, Debug)]
pub enum MinexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stream failed: {0}")]
    StreamFailed(String),

    #[error("No stream set")]
    NoStream,

    #[error("Cannot load miner from {path}: {reason}")]
    MinerLoad { path: String, reason: String },

    #[error("Miner {name} rejected its parameters: {reason}")]
    MinerInit { name: String, reason: String },

    #[error("Miner API version mismatch: expected {expected}, got {actual}")]
    ApiVersionMismatch { expected: u32, actual: u32 },

    #[error("Cannot insert into a memory-mapped trie")]
    ReadOnlyTrie,

    #[error("Invalid trie file: {0}")]
    InvalidTrieFile(String),
}

/// Result type alias for minex operations
pub type Result<T> = std::result::Result<T, MinexError>;

impl MinexError {
    /// Check if this error came from the plugin loading path
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            MinexError::MinerLoad { .. }
                | MinexError::MinerInit { .. }
                | MinexError::ApiVersionMismatch { .. }
        )
    }
}
