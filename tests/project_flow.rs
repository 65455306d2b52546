//! Integration tests for publishing a project's dependencies.
//!
//! The project directory is real; its manifest must look the same after the
//! run as before unless the run had to create it.

mod common;

use std::fs;

use common::{Fixture, MARKER};
use modpub::engine::{publish_project_deps, ResolveError};
use modpub::tool::mock::ToolCall;
use tempfile::TempDir;

const EMPTY_PROJECT: &str = "module example.com/p\n\ngo 1.21\n";
const TIDIED_PROJECT: &str = "module example.com/p\n\ngo 1.21\n\nrequire example.com/a v1.0.0\n";

fn project(manifest: Option<&str>) -> TempDir {
    let dir = TempDir::new().unwrap();
    if let Some(manifest) = manifest {
        fs::write(dir.path().join("go.mod"), manifest).unwrap();
    }
    dir
}

fn read_manifest(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("go.mod")).unwrap()
}

#[tokio::test]
async fn empty_project_manifest_is_restored_after_tidy() {
    let f = Fixture::new();
    let a = f.cached(
        "example.com/a@v1.0.0",
        "module example.com/a\n\nrequire example.com/b v1.0.0\n",
    );
    let b = f.cached(
        "example.com/b@v1.0.0",
        "module example.com/b\n\nrequire example.com/a v1.0.0\n",
    );
    f.tool.tidy_writes(None, TIDIED_PROJECT);
    let dir = project(Some(EMPTY_PROJECT));

    let resolver = f.resolver();
    let walk = publish_project_deps(&resolver, dir.path()).await.unwrap();

    assert_eq!(read_manifest(&dir), EMPTY_PROJECT);
    assert_eq!(walk.len(), 2);
    assert_eq!(f.repo.publish_calls(), vec![b, a]);
    assert_eq!(f.tool.count(&ToolCall::Init(None)), 0);
    assert_eq!(f.tool.count(&ToolCall::Tidy(None)), 1);
    assert!(resolver.summary().is_clean());
    assert_eq!(f.leftover_scratch(), 0);
}

#[tokio::test]
async fn populated_project_is_left_untouched() {
    let f = Fixture::new();
    let a = f.cached(
        "example.com/a@v1.0.0",
        "module example.com/a\n\nrequire example.com/a v1.0.0\n",
    );
    let dir = project(Some(TIDIED_PROJECT));

    let resolver = f.resolver();
    publish_project_deps(&resolver, dir.path()).await.unwrap();

    assert_eq!(read_manifest(&dir), TIDIED_PROJECT);
    assert_eq!(
        f.tool.calls(),
        vec![ToolCall::Graph(None), ToolCall::Graph(Some(a))]
    );
    assert_eq!(resolver.summary().successes, 1);
}

#[tokio::test]
async fn missing_manifest_is_created_with_marker() {
    let f = Fixture::new();
    let dir = project(None);

    let resolver = f.resolver();
    let walk = publish_project_deps(&resolver, dir.path()).await.unwrap();

    assert!(walk.is_empty());
    assert!(read_manifest(&dir).starts_with(MARKER));
    assert_eq!(f.tool.count(&ToolCall::Init(None)), 1);
    assert_eq!(f.tool.count(&ToolCall::Tidy(None)), 1);
    assert_eq!(resolver.summary().total, 0);
}

#[tokio::test]
async fn init_failure_is_fatal() {
    let f = Fixture::new();
    f.tool.fail_init(None);
    let dir = project(None);

    let resolver = f.resolver();
    let result = publish_project_deps(&resolver, dir.path()).await;

    assert!(matches!(result, Err(ResolveError::ProjectInit(_))));
    assert!(f.repo.operations().is_empty());
}

#[tokio::test]
async fn graph_failure_is_fatal_and_restores_manifest() {
    let f = Fixture::new();
    f.tool
        .tidy_writes(None, TIDIED_PROJECT)
        .fail_graph(None, 1);
    let dir = project(Some(EMPTY_PROJECT));

    let resolver = f.resolver();
    let result = publish_project_deps(&resolver, dir.path()).await;

    assert!(matches!(result, Err(ResolveError::ProjectTool(_))));
    assert_eq!(read_manifest(&dir), EMPTY_PROJECT);
    assert!(f.repo.operations().is_empty());
}
