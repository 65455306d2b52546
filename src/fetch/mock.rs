//! fetch::mock
//!
//! Scriptable downloader for testing.
//!
//! Downloads succeed only for modules registered with
//! [`MockDownloader::serve`]; a successful download also seeds the cache
//! passed to [`MockDownloader::with_cache`], like a real download would.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{DownloadSource, Downloader, FetchError};
use crate::cache::mock::MockModuleCache;
use crate::core::descriptor::ModuleDescriptor;
use crate::core::types::ModuleIdentity;

/// Scriptable downloader.
#[derive(Debug, Clone, Default)]
pub struct MockDownloader {
    inner: Arc<Mutex<MockDownloaderInner>>,
    cache: Option<MockModuleCache>,
}

#[derive(Debug, Default)]
struct MockDownloaderInner {
    modules: HashMap<(ModuleIdentity, DownloadSource), (Vec<u8>, PathBuf)>,
    calls: Vec<(ModuleIdentity, DownloadSource)>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `cache` with every successful download.
    pub fn with_cache(mut self, cache: MockModuleCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Make a module downloadable from `source`.
    pub fn serve(
        &self,
        id: ModuleIdentity,
        source: DownloadSource,
        manifest: impl Into<Vec<u8>>,
        archive: impl Into<PathBuf>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .modules
            .insert((id, source), (manifest.into(), archive.into()));
    }

    /// Every download call, in order.
    pub fn calls(&self) -> Vec<(ModuleIdentity, DownloadSource)> {
        self.inner.lock().unwrap().calls.clone()
    }
}

impl Downloader for MockDownloader {
    fn download(
        &self,
        id: &ModuleIdentity,
        source: DownloadSource,
    ) -> Result<ModuleDescriptor, FetchError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push((id.clone(), source));
        let (manifest, archive) =
            inner
                .modules
                .get(&(id.clone(), source))
                .cloned()
                .ok_or_else(|| FetchError::Download {
                    module: id.clone(),
                    source_kind: source,
                    message: "unknown module".to_string(),
                })?;
        if let Some(cache) = &self.cache {
            cache.insert(id.clone(), manifest.clone(), archive.clone());
        }
        Ok(ModuleDescriptor::from_manifest(id.clone(), manifest, archive))
    }
}
