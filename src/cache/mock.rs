//! cache::mock
//!
//! In-memory module cache for testing.
//!
//! Archives are plain paths; tests point them at real zip files when the
//! resolver needs to unpack them.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{CacheError, ModuleCache};
use crate::core::descriptor::ModuleDescriptor;
use crate::core::types::ModuleIdentity;

/// In-memory cache.
#[derive(Debug, Clone, Default)]
pub struct MockModuleCache {
    inner: Arc<Mutex<MockCacheInner>>,
}

#[derive(Debug, Default)]
struct MockCacheInner {
    modules: HashMap<ModuleIdentity, (Vec<u8>, PathBuf)>,
    writes: Vec<(ModuleIdentity, Vec<u8>)>,
    fail_lookup: Vec<ModuleIdentity>,
}

impl MockModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a cached module.
    pub fn insert(&self, id: ModuleIdentity, manifest: impl Into<Vec<u8>>, archive: impl Into<PathBuf>) {
        let mut inner = self.inner.lock().unwrap();
        inner.modules.insert(id, (manifest.into(), archive.into()));
    }

    /// Make `lookup` fail for one module.
    pub fn fail_lookup(&self, id: ModuleIdentity) {
        self.inner.lock().unwrap().fail_lookup.push(id);
    }

    /// Current cached manifest of a module.
    pub fn manifest(&self, id: &ModuleIdentity) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner.modules.get(id).map(|(m, _)| m.clone())
    }

    /// Every `write_manifest` call, in order.
    pub fn writes(&self) -> Vec<(ModuleIdentity, Vec<u8>)> {
        self.inner.lock().unwrap().writes.clone()
    }
}

impl ModuleCache for MockModuleCache {
    fn lookup(&self, id: &ModuleIdentity) -> Result<Option<ModuleDescriptor>, CacheError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_lookup.contains(id) {
            return Err(CacheError::Io {
                path: PathBuf::from(id.to_string()),
                message: "injected lookup failure".into(),
            });
        }
        Ok(inner.modules.get(id).map(|(manifest, archive)| {
            ModuleDescriptor::from_manifest(id.clone(), manifest.clone(), archive.clone())
        }))
    }

    fn write_manifest(&self, id: &ModuleIdentity, manifest: &[u8]) -> Result<(), CacheError> {
        let mut inner = self.inner.lock().unwrap();
        inner.writes.push((id.clone(), manifest.to_vec()));
        let archive = inner
            .modules
            .get(id)
            .map(|(_, a)| a.clone())
            .unwrap_or_default();
        inner
            .modules
            .insert(id.clone(), (manifest.to_vec(), archive));
        Ok(())
    }
}
