//! fetch::go
//!
//! [`Downloader`] backed by `go mod download -json`.
//!
//! The download runs outside any module, in a dedicated work directory,
//! with `GOPROXY` pointed at the chosen source. The JSON document the
//! command prints names the downloaded `.mod` and `.zip` files in the cache.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use super::{DownloadSource, Downloader, FetchError};
use crate::core::descriptor::ModuleDescriptor;
use crate::core::types::ModuleIdentity;
use crate::tool::GoTool;

/// Default upstream when none is configured.
pub const DEFAULT_UPSTREAM_PROXY: &str = "https://proxy.golang.org,direct";

/// Output of `go mod download -json` for one module.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DownloadInfo {
    path: String,
    version: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    go_mod: Option<PathBuf>,
    #[serde(default)]
    zip: Option<PathBuf>,
}

/// Downloads modules with the `go` binary.
#[derive(Debug, Clone)]
pub struct GoDownloader {
    go: GoTool,
    work_dir: PathBuf,
    repository_proxy: Option<String>,
    upstream_proxy: String,
}

impl GoDownloader {
    /// Create a downloader running in `work_dir`.
    pub fn new(go: GoTool, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            go,
            work_dir: work_dir.into(),
            repository_proxy: None,
            upstream_proxy: DEFAULT_UPSTREAM_PROXY.to_string(),
        }
    }

    /// GOPROXY URL of the target repository.
    pub fn with_repository_proxy(mut self, url: Option<String>) -> Self {
        self.repository_proxy = url;
        self
    }

    /// GOPROXY value for upstream downloads.
    pub fn with_upstream_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.upstream_proxy = proxy.into();
        self
    }

    fn proxy_for(&self, source: DownloadSource) -> Result<&str, FetchError> {
        match source {
            DownloadSource::Repository => self
                .repository_proxy
                .as_deref()
                .ok_or(FetchError::NoRepositoryProxy),
            DownloadSource::Upstream => Ok(&self.upstream_proxy),
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, FetchError> {
    fs::read(path).map_err(|e| FetchError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl Downloader for GoDownloader {
    fn download(
        &self,
        id: &ModuleIdentity,
        source: DownloadSource,
    ) -> Result<ModuleDescriptor, FetchError> {
        let proxy = self.proxy_for(source)?;
        info!("Downloading {} from {}", id, source);

        fs::create_dir_all(&self.work_dir).map_err(|e| FetchError::Io {
            path: self.work_dir.clone(),
            message: e.to_string(),
        })?;
        let target = id.to_string();
        let output = self
            .go
            .command(&self.work_dir)
            .args(["mod", "download", "-json", target.as_str()])
            .env("GOPROXY", proxy)
            .env("GOFLAGS", "-mod=mod")
            .output()
            .map_err(|e| self.go.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: Option<DownloadInfo> = serde_json::from_str(stdout.trim()).ok();

        if let Some(message) = parsed.as_ref().and_then(|i| i.error.clone()) {
            return Err(FetchError::Download {
                module: id.clone(),
                source_kind: source,
                message,
            });
        }
        if !output.status.success() {
            return Err(FetchError::Download {
                module: id.clone(),
                source_kind: source,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info = parsed.ok_or_else(|| FetchError::InvalidOutput {
            module: id.clone(),
            message: format!("not a JSON document: {}", stdout.trim()),
        })?;
        descriptor_from_info(id, info)
    }
}

fn descriptor_from_info(
    id: &ModuleIdentity,
    info: DownloadInfo,
) -> Result<ModuleDescriptor, FetchError> {
    if info.path != id.path() || info.version != id.version() {
        return Err(FetchError::InvalidOutput {
            module: id.clone(),
            message: format!("got {}@{}", info.path, info.version),
        });
    }
    let (Some(go_mod), Some(zip)) = (info.go_mod, info.zip) else {
        return Err(FetchError::InvalidOutput {
            module: id.clone(),
            message: "missing GoMod or Zip".to_string(),
        });
    };
    let manifest = read_file(&go_mod)?;
    debug!(module = %id, zip = %zip.display(), "downloaded");
    Ok(ModuleDescriptor::from_manifest(id.clone(), manifest, zip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> ModuleIdentity {
        s.parse().unwrap()
    }

    #[test]
    fn parses_download_document() {
        let tmp = TempDir::new().unwrap();
        let go_mod = tmp.path().join("v1.0.0.mod");
        fs::write(&go_mod, "module example.com/a\n\nrequire example.com/b v1.1.0\n").unwrap();
        let json = format!(
            r#"{{"Path":"example.com/a","Version":"v1.0.0","GoMod":"{}","Zip":"{}"}}"#,
            go_mod.display(),
            tmp.path().join("v1.0.0.zip").display()
        );
        let info: DownloadInfo = serde_json::from_str(&json).unwrap();
        let d = descriptor_from_info(&id("example.com/a@v1.0.0"), info).unwrap();
        assert_eq!(d.declared(), &[id("example.com/b@v1.1.0")]);
        assert_eq!(d.archive(), tmp.path().join("v1.0.0.zip"));
    }

    #[test]
    fn mismatched_module_is_rejected() {
        let info: DownloadInfo = serde_json::from_str(
            r#"{"Path":"example.com/other","Version":"v1.0.0","GoMod":"/x","Zip":"/y"}"#,
        )
        .unwrap();
        let err = descriptor_from_info(&id("example.com/a@v1.0.0"), info).unwrap_err();
        assert!(matches!(err, FetchError::InvalidOutput { .. }));
    }

    #[test]
    fn repository_source_needs_proxy() {
        let d = GoDownloader::new(GoTool::default(), "/tmp/w");
        assert!(matches!(
            d.proxy_for(DownloadSource::Repository),
            Err(FetchError::NoRepositoryProxy)
        ));
        assert_eq!(
            d.proxy_for(DownloadSource::Upstream).unwrap(),
            DEFAULT_UPSTREAM_PROXY
        );
    }

    #[test]
    fn missing_binary_is_tool_error() {
        let tmp = TempDir::new().unwrap();
        let d = GoDownloader::new(GoTool::new("/nonexistent/go"), tmp.path());
        let err = d
            .download(&id("example.com/a@v1.0.0"), DownloadSource::Upstream)
            .unwrap_err();
        assert!(matches!(err, FetchError::Tool(_)));
    }
}
