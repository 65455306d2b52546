//! repository::mock
//!
//! Mock repository implementation for deterministic testing.
//!
//! # Design
//!
//! The mock stores published modules in memory, can be seeded with modules
//! that "already exist" upstream, records every call, and can be configured
//! to fail specific operations for specific modules.
//!
//! # Example
//!
//! ```
//! use modpub::repository::mock::MockRepository;
//! use modpub::repository::{PublishRequest, Repository};
//! use modpub::core::types::ModuleIdentity;
//! use std::path::PathBuf;
//!
//! # tokio_test::block_on(async {
//! let repo = MockRepository::new();
//! let id: ModuleIdentity = "example.com/a@v1.0.0".parse().unwrap();
//!
//! repo.publish(PublishRequest {
//!     identity: id.clone(),
//!     manifest: b"module example.com/a\n".to_vec(),
//!     archive: PathBuf::from("/cache/a.zip"),
//!     target_repo: "go-local".to_string(),
//!     progress_label: "1/1".to_string(),
//! }).await.unwrap();
//!
//! assert!(repo.exists(&id, "go-local").await.unwrap());
//! assert_eq!(repo.publish_count(&id), 1);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{PublishRequest, Repository, RepositoryError};
use crate::core::types::ModuleIdentity;

/// Mock repository for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockRepository {
    inner: Arc<Mutex<MockRepositoryInner>>,
}

#[derive(Debug)]
struct MockRepositoryInner {
    /// Manifests served per module.
    modules: HashMap<ModuleIdentity, Vec<u8>>,
    /// Failure configuration, checked in order.
    fail_on: Vec<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
///
/// `None` as the module matches every module.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail `publish` with the given error.
    Publish(Option<ModuleIdentity>, RepositoryError),
    /// Fail `fetch_published_manifest` with the given error.
    FetchManifest(Option<ModuleIdentity>, RepositoryError),
    /// Fail `exists` with the given error.
    Exists(Option<ModuleIdentity>, RepositoryError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Publish {
        identity: ModuleIdentity,
        manifest: Vec<u8>,
        target_repo: String,
        progress_label: String,
    },
    FetchManifest {
        identity: ModuleIdentity,
    },
    Exists {
        identity: ModuleIdentity,
    },
}

impl MockRepository {
    /// Create an empty mock repository.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockRepositoryInner {
                modules: HashMap::new(),
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    /// Create a mock repository that already serves the given modules.
    pub fn with_modules(modules: Vec<(ModuleIdentity, Vec<u8>)>) -> Self {
        let repo = Self::new();
        {
            let mut inner = repo.inner.lock().unwrap();
            inner.modules.extend(modules);
        }
        repo
    }

    /// Configure the mock to fail an operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on.push(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on.clear();
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Identities passed to `publish`, in call order (failed calls included).
    pub fn publish_calls(&self) -> Vec<ModuleIdentity> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                MockOperation::Publish { identity, .. } => Some(identity),
                _ => None,
            })
            .collect()
    }

    /// Number of `publish` calls for one module.
    pub fn publish_count(&self, id: &ModuleIdentity) -> usize {
        self.publish_calls().iter().filter(|p| *p == id).count()
    }

    /// Manifest published for a module by the most recent `publish` call.
    pub fn published_manifest(&self, id: &ModuleIdentity) -> Option<Vec<u8>> {
        self.operations()
            .into_iter()
            .rev()
            .find_map(|op| match op {
                MockOperation::Publish {
                    identity, manifest, ..
                } if &identity == id => Some(manifest),
                _ => None,
            })
    }

    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    fn check_fail(&self, expected: &str, id: &ModuleIdentity) -> Option<RepositoryError> {
        let inner = self.inner.lock().unwrap();
        inner.fail_on.iter().find_map(|f| {
            let (op, module, err) = match f {
                FailOn::Publish(m, e) => ("publish", m, e),
                FailOn::FetchManifest(m, e) => ("fetch_published_manifest", m, e),
                FailOn::Exists(m, e) => ("exists", m, e),
            };
            let matches_module = module.as_ref().map_or(true, |m| m == id);
            (op == expected && matches_module).then(|| err.clone())
        })
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for MockRepository {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn publish(&self, request: PublishRequest) -> Result<(), RepositoryError> {
        self.record(MockOperation::Publish {
            identity: request.identity.clone(),
            manifest: request.manifest.clone(),
            target_repo: request.target_repo.clone(),
            progress_label: request.progress_label.clone(),
        });

        if let Some(err) = self.check_fail("publish", &request.identity) {
            return Err(err);
        }

        let mut inner = self.inner.lock().unwrap();
        inner.modules.insert(request.identity, request.manifest);
        Ok(())
    }

    async fn fetch_published_manifest(
        &self,
        id: &ModuleIdentity,
        _target_repo: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError> {
        self.record(MockOperation::FetchManifest {
            identity: id.clone(),
        });

        if let Some(err) = self.check_fail("fetch_published_manifest", id) {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner.modules.get(id).cloned())
    }

    async fn exists(
        &self,
        id: &ModuleIdentity,
        _target_repo: &str,
    ) -> Result<bool, RepositoryError> {
        self.record(MockOperation::Exists {
            identity: id.clone(),
        });

        if let Some(err) = self.check_fail("exists", id) {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        Ok(inner.modules.contains_key(id))
    }

    fn proxy_url(&self, target_repo: &str) -> Option<String> {
        Some(format!("mock://{}", target_repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn id(s: &str) -> ModuleIdentity {
        s.parse().unwrap()
    }

    fn request(module: &str) -> PublishRequest {
        PublishRequest {
            identity: id(module),
            manifest: b"module m\n".to_vec(),
            archive: PathBuf::from("/tmp/m.zip"),
            target_repo: "go-local".to_string(),
            progress_label: "1/1".to_string(),
        }
    }

    #[tokio::test]
    async fn publish_makes_module_visible() {
        let repo = MockRepository::new();
        let a = id("example.com/a@v1.0.0");
        assert!(!repo.exists(&a, "go-local").await.unwrap());
        repo.publish(request("example.com/a@v1.0.0")).await.unwrap();
        assert!(repo.exists(&a, "go-local").await.unwrap());
        assert_eq!(
            repo.fetch_published_manifest(&a, "go-local").await.unwrap(),
            Some(b"module m\n".to_vec())
        );
    }

    #[tokio::test]
    async fn fail_on_targets_one_module() {
        let a = id("example.com/a@v1.0.0");
        let repo = MockRepository::new().fail_on(FailOn::Publish(
            Some(a.clone()),
            RepositoryError::NetworkError("reset".into()),
        ));

        assert!(repo.publish(request("example.com/a@v1.0.0")).await.is_err());
        assert!(repo.publish(request("example.com/b@v1.0.0")).await.is_ok());
        assert!(!repo.exists(&a, "go-local").await.unwrap());
        assert_eq!(repo.publish_calls().len(), 2);
    }

    #[tokio::test]
    async fn fail_on_any_module() {
        let repo = MockRepository::new().fail_on(FailOn::Exists(
            None,
            RepositoryError::NetworkError("down".into()),
        ));
        assert!(repo.exists(&id("x@v1.0.0"), "r").await.is_err());
        repo.clear_fail_on();
        assert!(repo.exists(&id("x@v1.0.0"), "r").await.is_ok());
    }

    #[tokio::test]
    async fn seeded_modules_are_served() {
        let a = id("example.com/a@v1.0.0");
        let repo = MockRepository::with_modules(vec![(a.clone(), b"seeded".to_vec())]);
        assert_eq!(
            repo.fetch_published_manifest(&a, "r").await.unwrap(),
            Some(b"seeded".to_vec())
        );
        assert_eq!(repo.operations().len(), 1);
    }
}
