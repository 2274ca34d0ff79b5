//! Miner registry and plugin loading
//!
//! The registry is append-only for the lifetime of its extractor: miners
//! can be registered dynamically (load a module by path, resolve a
//! [`MinerDecl`] by symbol name) or statically (embedded builds, tests),
//! but never removed. Unloading is a process-level concern outside this
//! core, so loaded libraries are retained until the registry drops.

use std::sync::Arc;

use libloading::Library;
use tracing::debug;

use crate::error::{MinexError, Result};
use crate::miner::{Miner, MinerDecl, MINER_API_VERSION};

/// Introspection record for one registered miner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedMiner {
    /// Module path, or `<static>` for in-process registrations
    pub path: String,
    /// Miner name
    pub miner: String,
    /// Label the miner stamps on its occurrences
    pub label: String,
}

struct Entry {
    path: String,
    miner: Arc<dyn Miner>,
}

/// Append-only set of registered miners
#[derive(Default)]
pub struct MinerRegistry {
    // Field order matters: entries hold trait objects whose vtables live
    // in the loaded libraries, so they must drop first.
    entries: Vec<Entry>,
    libraries: Vec<Library>,
}

impl MinerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the module at `path`, resolve `symbol` to a [`MinerDecl`],
    /// validate its API version and instantiate it with `params`.
    ///
    /// On any failure nothing is registered and the module is dropped.
    pub fn add_dynamic(&mut self, path: &str, symbol: &str, params: &str) -> Result<()> {
        let load_err = |reason: String| MinexError::MinerLoad {
            path: path.to_string(),
            reason,
        };

        // SAFETY: loading a module runs its initializers; the caller vouches
        // for the module, which is the plugin contract.
        let library = unsafe { Library::new(path) }.map_err(|e| load_err(e.to_string()))?;

        // SAFETY: the contract requires `symbol` to name a `MinerDecl`
        // static exported via `export_miner!`.
        let decl = unsafe {
            library
                .get::<*const MinerDecl>(symbol.as_bytes())
                .map_err(|e| load_err(format!("cannot resolve {}: {}", symbol, e)))
                .map(|s| *s)
        }?;
        if decl.is_null() {
            return Err(load_err(format!("symbol {} is null", symbol)));
        }
        let decl = unsafe { &*decl };

        self.register_decl(path, decl, params)?;
        self.libraries.push(library);
        debug!(path, symbol, "loaded miner module");
        Ok(())
    }

    /// Register a declaration without a loader (embedded builds, tests)
    pub fn add_static(&mut self, decl: &MinerDecl, params: &str) -> Result<()> {
        self.register_decl("<static>", decl, params)
    }

    /// Register an already constructed miner
    pub fn add_boxed(&mut self, miner: Box<dyn Miner>) {
        self.entries.push(Entry {
            path: "<static>".to_string(),
            miner: Arc::from(miner),
        });
    }

    fn register_decl(&mut self, path: &str, decl: &MinerDecl, params: &str) -> Result<()> {
        if decl.api_version != MINER_API_VERSION {
            return Err(MinexError::ApiVersionMismatch {
                expected: MINER_API_VERSION,
                actual: decl.api_version,
            });
        }
        let miner = (decl.create)(params).map_err(|reason| MinexError::MinerInit {
            name: decl.name.to_string(),
            reason,
        })?;
        self.entries.push(Entry {
            path: path.to_string(),
            miner: Arc::from(miner),
        });
        Ok(())
    }

    /// One record per registered (miner, label) pair, in registration order
    pub fn list_loaded(&self) -> Vec<LoadedMiner> {
        self.entries
            .iter()
            .map(|e| LoadedMiner {
                path: e.path.clone(),
                miner: e.miner.name().to_string(),
                label: e.miner.label().to_string(),
            })
            .collect()
    }

    /// Registered miners in registration order
    pub fn miners(&self) -> impl Iterator<Item = &Arc<dyn Miner>> {
        self.entries.iter().map(|e| &e.miner)
    }

    /// Number of registered miners
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no miners are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::ScanContext;
    use crate::occurrence::Occurrence;

    struct NoopMiner;

    impl Miner for NoopMiner {
        fn name(&self) -> &str {
            "noop"
        }

        fn label(&self) -> &str {
            "nothing"
        }

        fn scan(&self, _ctx: &ScanContext<'_>) -> Vec<Occurrence> {
            Vec::new()
        }
    }

    fn noop_decl(api_version: u32) -> MinerDecl {
        fn create(_params: &str) -> std::result::Result<Box<dyn Miner>, String> {
            Ok(Box::new(NoopMiner))
        }
        MinerDecl {
            api_version,
            name: "noop",
            create,
        }
    }

    #[test]
    fn test_static_registration() {
        let mut registry = MinerRegistry::new();
        assert!(registry.is_empty());

        registry.add_static(&noop_decl(MINER_API_VERSION), "").unwrap();
        registry.add_boxed(Box::new(NoopMiner));

        assert_eq!(registry.len(), 2);
        let loaded = registry.list_loaded();
        assert_eq!(loaded[0].path, "<static>");
        assert_eq!(loaded[0].miner, "noop");
        assert_eq!(loaded[0].label, "nothing");
    }

    #[test]
    fn test_api_version_mismatch_registers_nothing() {
        let mut registry = MinerRegistry::new();
        let err = registry.add_static(&noop_decl(99), "").unwrap_err();
        assert!(matches!(err, MinexError::ApiVersionMismatch { actual: 99, .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_factory_rejection_registers_nothing() {
        fn create(_params: &str) -> std::result::Result<Box<dyn Miner>, String> {
            Err("bad params".to_string())
        }
        let decl = MinerDecl {
            api_version: MINER_API_VERSION,
            name: "picky",
            create,
        };

        let mut registry = MinerRegistry::new();
        let err = registry.add_static(&decl, "x").unwrap_err();
        assert!(err.to_string().contains("bad params"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_module() {
        let mut registry = MinerRegistry::new();
        let err = registry
            .add_dynamic("/missing.so", "MINER_DECL", "")
            .unwrap_err();
        assert!(matches!(err, MinexError::MinerLoad { .. }));
        assert!(!err.to_string().is_empty());
        assert!(registry.is_empty());
    }
}
