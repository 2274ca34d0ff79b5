//! Built-in miners
//!
//! Miners shipped with the engine. They honor the same contract as
//! dynamically loaded plugins and double as reference implementations.

mod dictionary;

pub use dictionary::DictionaryMiner;
