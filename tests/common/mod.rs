//! Shared fixtures for integration tests.
//!
//! Modules live in an in-memory cache whose archives are real zip files
//! built on the fly, so unpacking runs for every module a test resolves.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use modpub::cache::mock::MockModuleCache;
use modpub::core::ledger::PublishLedger;
use modpub::core::types::ModuleIdentity;
use modpub::engine::{Collaborators, ResolveOptions, Resolver};
use modpub::fetch::mock::MockDownloader;
use modpub::fetch::DownloadSource;
use modpub::repository::mock::MockRepository;
use modpub::tool::mock::MockModuleTool;
use modpub::tool::ModuleTool;

pub const TARGET_REPO: &str = "go-local";
pub const MARKER: &str = "// Generated by modpub";

pub fn id(s: &str) -> ModuleIdentity {
    s.parse().unwrap()
}

/// Build `<path>@<version>/{go.mod,go.sum,lib.go}` as a module zip.
pub fn write_archive(dir: &Path, id: &ModuleIdentity, manifest: &str) -> PathBuf {
    let path = dir.join(format!("{}.zip", id.to_string().replace(['/', '@'], "_")));
    let mut zw = ZipWriter::new(fs::File::create(&path).unwrap());
    let options = SimpleFileOptions::default();
    let prefix = id.archive_prefix();

    zw.start_file(format!("{}/go.mod", prefix), options).unwrap();
    zw.write_all(manifest.as_bytes()).unwrap();
    zw.start_file(format!("{}/go.sum", prefix), options).unwrap();
    zw.write_all(b"stale checksums\n").unwrap();
    zw.start_file(format!("{}/lib.go", prefix), options).unwrap();
    zw.write_all(b"package lib\n").unwrap();
    zw.finish().unwrap();
    path
}

/// Collaborators and directories for one run.
pub struct Fixture {
    pub tmp: TempDir,
    pub cache: MockModuleCache,
    pub downloader: MockDownloader,
    pub tool: MockModuleTool,
    pub repo: MockRepository,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_repository(MockRepository::new())
    }

    pub fn with_repository(repo: MockRepository) -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("archives")).unwrap();
        fs::create_dir_all(tmp.path().join("scratch")).unwrap();
        let cache = MockModuleCache::new();
        Self {
            tmp,
            downloader: MockDownloader::new().with_cache(cache.clone()),
            cache,
            tool: MockModuleTool::new(),
            repo,
        }
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.tmp.path().join("scratch")
    }

    /// Put a module in the cache.
    pub fn cached(&self, module: &str, manifest: &str) -> ModuleIdentity {
        let id = id(module);
        let archive = write_archive(&self.tmp.path().join("archives"), &id, manifest);
        self.cache.insert(id.clone(), manifest, archive);
        id
    }

    /// Make a module downloadable from `source` without caching it.
    pub fn downloadable(
        &self,
        module: &str,
        source: DownloadSource,
        manifest: &str,
    ) -> ModuleIdentity {
        let id = id(module);
        let archive = write_archive(&self.tmp.path().join("archives"), &id, manifest);
        self.downloader.serve(id.clone(), source, manifest, archive);
        id
    }

    pub fn options(&self) -> ResolveOptions {
        let mut options = ResolveOptions::new(TARGET_REPO);
        options.scratch_root = Some(self.scratch_root());
        options
    }

    pub fn resolver(&self) -> Resolver<'_> {
        self.resolver_with(self.options())
    }

    pub fn resolver_with(&self, options: ResolveOptions) -> Resolver<'_> {
        self.resolver_using(&self.tool, options)
    }

    /// A resolver driving a custom module tool.
    pub fn resolver_using<'a>(
        &'a self,
        tool: &'a dyn ModuleTool,
        options: ResolveOptions,
    ) -> Resolver<'a> {
        Resolver::new(
            Collaborators {
                cache: &self.cache,
                downloader: &self.downloader,
                tool,
                repository: &self.repo,
            },
            Arc::new(PublishLedger::new()),
            options,
        )
        .unwrap()
    }

    /// Scratch directories left behind under the scratch root.
    pub fn leftover_scratch(&self) -> usize {
        fs::read_dir(self.scratch_root()).unwrap().count()
    }
}
