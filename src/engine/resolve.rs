//! engine::resolve
//!
//! The resolution walk: prepare each module's manifest, resolve its
//! dependencies depth-first, publish it once.
//!
//! # Architecture
//!
//! Every module version handled by a run gets one [`ResolutionContext`]
//! stored in an arena ([`Walk`]). Contexts refer to their children by index.
//! The walk is driven by an explicit work stack instead of recursion, so
//! deep dependency graphs cannot exhaust the call stack.
//!
//! Each context moves through:
//!
//! ```text
//! Fresh -> ManifestResolved -> GraphExtracted -> TransitiveResolved -> Published
//!   \             \                  \                                   Failed
//!    `-------------`------------------`--> Failed
//! ```
//!
//! - **Fresh**: acquired from the cache or a download. Preparing the
//!   manifest unpacks the archive into a scratch directory and makes sure the
//!   manifest there declares the module's requirements, running `init` and
//!   `tidy` when it does not.
//! - **ManifestResolved**: the graph is extracted with the module tool.
//! - **GraphExtracted**: the resolved manifest is written back to the shared
//!   cache, every edge not yet in the ledger is claimed and acquired, then
//!   children are driven one at a time.
//! - **TransitiveResolved**: a manifest mutated for resolution is restored,
//!   the ledger grants or refuses the publish, the scratch directory is
//!   removed.
//!
//! # Failure Model
//!
//! Failures are local to one context. The identity is marked `Failed` in the
//! ledger, counted, and never retried; siblings continue. Only pattern
//! compilation at construction is fatal.
//!
//! # Example
//!
//! ```ignore
//! let resolver = Resolver::new(collaborators, Arc::new(PublishLedger::new()), options)?;
//! let walk = resolver.publish_module(&"example.com/a@v1.0.0".parse()?).await;
//! println!("{}", resolver.summary());
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use super::scratch::ScratchDir;
use crate::cache::{unpack_module, CacheError, ModuleCache};
use crate::core::descriptor::ModuleDescriptor;
use crate::core::ledger::{EntryState, PublishLedger, Summary};
use crate::core::manifest::{ManifestPatterns, PatternError, DEFAULT_EDIT_MESSAGE};
use crate::core::types::ModuleIdentity;
use crate::fetch::{DownloadSource, Downloader, FetchError};
use crate::repository::{Repository, RepositoryError};
use crate::tool::{ModuleTool, ResolutionRoot, ToolError};

/// Fatal errors: the run cannot start or the project cannot be prepared.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("failed to initialize the project manifest: {0}")]
    ProjectInit(#[source] ToolError),

    #[error("failed to resolve the project graph: {0}")]
    ProjectTool(#[source] ToolError),

    #[error("project I/O error at '{path}': {message}")]
    ProjectIo { path: PathBuf, message: String },
}

/// Errors that abandon a single branch of the walk.
#[derive(Debug, Error)]
pub enum BranchError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("scratch I/O error at '{path}': {message}")]
    Io { path: PathBuf, message: String },

    #[error("module has no scratch directory")]
    NoScratch,
}

fn io_err(path: impl Into<PathBuf>, e: io::Error) -> BranchError {
    BranchError::Io {
        path: path.into(),
        message: e.to_string(),
    }
}

/// Options of one run.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Repository modules are published to.
    pub target_repo: String,
    /// Marker comment for manifests the run edits.
    pub edit_message: String,
    /// Keep tidied manifests in the cache instead of restoring the originals.
    pub overwrite_cache: bool,
    /// Parent of scratch directories; the system temp dir when `None`.
    pub scratch_root: Option<PathBuf>,
}

impl ResolveOptions {
    pub fn new(target_repo: impl Into<String>) -> Self {
        Self {
            target_repo: target_repo.into(),
            edit_message: DEFAULT_EDIT_MESSAGE.to_string(),
            overwrite_cache: false,
            scratch_root: None,
        }
    }
}

/// State of one resolution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Fresh,
    ManifestResolved,
    GraphExtracted,
    TransitiveResolved,
    /// Present in the target repository: published by this context, or
    /// already there.
    Published,
    Failed,
}

impl ResolutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ResolutionState::Published | ResolutionState::Failed)
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionState::Fresh => "fresh",
            ResolutionState::ManifestResolved => "manifest-resolved",
            ResolutionState::GraphExtracted => "graph-extracted",
            ResolutionState::TransitiveResolved => "transitive-resolved",
            ResolutionState::Published => "published",
            ResolutionState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// How the graph of a prepared module is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphPlan {
    /// A graph failure abandons the branch.
    Plain,
    /// The manifest came from `init`: on failure, reset to the original,
    /// tidy, and retry exactly once.
    RetryAfterTidy,
}

/// One module version in the walk.
#[derive(Debug)]
pub struct ResolutionContext {
    descriptor: ModuleDescriptor,
    /// Manifest as last seen in the shared cache.
    cached_manifest: Vec<u8>,
    state: ResolutionState,
    scratch: Option<ScratchDir>,
    root: Option<ResolutionRoot>,
    plan: GraphPlan,
    /// Manifest before `init`/`tidy` touched it.
    original: Option<Vec<u8>>,
    must_revert: bool,
    edges: Vec<ModuleIdentity>,
    expanded: bool,
    children: Vec<usize>,
    next_child: usize,
}

impl ResolutionContext {
    fn new(descriptor: ModuleDescriptor) -> Self {
        Self {
            cached_manifest: descriptor.manifest().to_vec(),
            descriptor,
            state: ResolutionState::Fresh,
            scratch: None,
            root: None,
            plan: GraphPlan::Plain,
            original: None,
            must_revert: false,
            edges: Vec::new(),
            expanded: false,
            children: Vec::new(),
            next_child: 0,
        }
    }

    pub fn identity(&self) -> &ModuleIdentity {
        self.descriptor.identity()
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    /// Arena indices of the children this context acquired.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Every dependency edge the graph reported, acquired or not.
    pub fn edges(&self) -> &[ModuleIdentity] {
        &self.edges
    }

    fn close_scratch(&mut self) {
        self.root = None;
        if let Some(scratch) = self.scratch.take() {
            scratch.close();
        }
    }
}

/// Arena of every context a walk created.
#[derive(Debug, Default)]
pub struct Walk {
    contexts: Vec<ResolutionContext>,
}

impl Walk {
    fn push(&mut self, ctx: ResolutionContext) -> usize {
        self.contexts.push(ctx);
        self.contexts.len() - 1
    }

    pub fn contexts(&self) -> &[ResolutionContext] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Final state of a module, if this walk acquired it.
    pub fn state_of(&self, id: &ModuleIdentity) -> Option<ResolutionState> {
        self.contexts
            .iter()
            .find(|c| c.identity() == id)
            .map(|c| c.state)
    }
}

/// The collaborators a resolver works through.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub cache: &'a dyn ModuleCache,
    pub downloader: &'a dyn Downloader,
    pub tool: &'a dyn ModuleTool,
    pub repository: &'a dyn Repository,
}

/// Drives resolution walks against one ledger.
pub struct Resolver<'a> {
    cache: &'a dyn ModuleCache,
    downloader: &'a dyn Downloader,
    tool: &'a dyn ModuleTool,
    repository: &'a dyn Repository,
    ledger: Arc<PublishLedger>,
    patterns: ManifestPatterns,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    /// Create a resolver.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Pattern` if the edit message is not a valid
    /// marker comment.
    pub fn new(
        collaborators: Collaborators<'a>,
        ledger: Arc<PublishLedger>,
        options: ResolveOptions,
    ) -> Result<Self, ResolveError> {
        let patterns = ManifestPatterns::new(&options.edit_message)?;
        Ok(Self {
            cache: collaborators.cache,
            downloader: collaborators.downloader,
            tool: collaborators.tool,
            repository: collaborators.repository,
            ledger,
            patterns,
            options,
        })
    }

    pub fn ledger(&self) -> &Arc<PublishLedger> {
        &self.ledger
    }

    pub fn patterns(&self) -> &ManifestPatterns {
        &self.patterns
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn tool(&self) -> &dyn ModuleTool {
        self.tool
    }

    pub fn summary(&self) -> Summary {
        self.ledger.summary()
    }

    /// Resolve and publish one module and everything it depends on.
    pub async fn publish_module(&self, id: &ModuleIdentity) -> Walk {
        self.resolve_all(std::slice::from_ref(id)).await
    }

    /// Resolve and publish a set of modules as siblings.
    ///
    /// All of them are claimed and acquired first, then driven in order.
    pub async fn resolve_all(&self, ids: &[ModuleIdentity]) -> Walk {
        let mut walk = Walk::default();
        let mut roots = Vec::new();
        for id in ids {
            if let Some(ctx) = self.acquire(id).await {
                roots.push(walk.push(ctx));
            }
        }
        for root in roots {
            self.drive(&mut walk, root).await;
        }
        walk
    }

    /// Claim an identity and load its descriptor.
    ///
    /// Returns `None` if the identity was already in the ledger, or if
    /// loading failed (the failure is recorded).
    async fn acquire(&self, id: &ModuleIdentity) -> Option<ResolutionContext> {
        if !self.ledger.claim(id, EntryState::Pending) {
            debug!(module = %id, state = ?self.ledger.state(id), "already handled");
            return None;
        }
        self.ledger.add_total(1);

        match self.load(id).await {
            Ok((descriptor, in_repository)) => {
                if in_repository {
                    self.ledger.set_state(id, EntryState::InRepository);
                }
                Some(ResolutionContext::new(descriptor))
            }
            Err(e) => {
                self.record_failure(id, &e);
                None
            }
        }
    }

    async fn load(&self, id: &ModuleIdentity) -> Result<(ModuleDescriptor, bool), BranchError> {
        let cached = self.cache.lookup(id)?;
        let in_repository = self
            .repository
            .exists(id, &self.options.target_repo)
            .await?;
        let descriptor = match cached {
            Some(d) => d,
            None => {
                let source = if in_repository {
                    DownloadSource::Repository
                } else {
                    DownloadSource::Upstream
                };
                debug!(module = %id, %source, "missing from cache");
                self.downloader.download(id, source)?
            }
        };
        Ok((descriptor, in_repository))
    }

    fn record_failure(&self, id: &ModuleIdentity, err: &BranchError) {
        error!("{}: {}", id, err);
        self.ledger.set_state(id, EntryState::Failed);
        self.ledger.record_failure();
    }

    fn abandon(&self, ctx: &mut ResolutionContext, err: BranchError) {
        self.record_failure(&ctx.identity().clone(), &err);
        ctx.state = ResolutionState::Failed;
        ctx.close_scratch();
    }

    /// Drive the context at `start` and its subtree to completion.
    async fn drive(&self, walk: &mut Walk, start: usize) {
        let mut stack = vec![start];

        while let Some(&top) = stack.last() {
            match walk.contexts[top].state {
                ResolutionState::Fresh => {
                    let ctx = &mut walk.contexts[top];
                    if self.ledger.state(ctx.identity()) == Some(EntryState::Published) {
                        debug!(module = %ctx.identity(), "already published");
                        ctx.state = ResolutionState::Published;
                        continue;
                    }
                    match self.prepare_manifest(ctx).await {
                        Ok(plan) => {
                            ctx.plan = plan;
                            ctx.state = ResolutionState::ManifestResolved;
                        }
                        Err(e) => self.abandon(ctx, e),
                    }
                }
                ResolutionState::ManifestResolved => {
                    let ctx = &mut walk.contexts[top];
                    match self.extract_graph(ctx) {
                        Ok(edges) => {
                            debug!(module = %ctx.identity(), edges = edges.len(), "graph extracted");
                            ctx.edges = edges;
                            ctx.state = ResolutionState::GraphExtracted;
                        }
                        Err(e) => self.abandon(ctx, e),
                    }
                }
                ResolutionState::GraphExtracted => {
                    if !walk.contexts[top].expanded {
                        self.fan_out(walk, top).await;
                    }
                    let ctx = &mut walk.contexts[top];
                    if let Some(&child) = ctx.children.get(ctx.next_child) {
                        ctx.next_child += 1;
                        stack.push(child);
                    } else {
                        ctx.state = ResolutionState::TransitiveResolved;
                    }
                }
                ResolutionState::TransitiveResolved => {
                    self.finish(&mut walk.contexts[top]).await;
                }
                ResolutionState::Published | ResolutionState::Failed => {
                    stack.pop();
                }
            }
        }
    }

    /// Steps 2 and 3: settle the manifest inside a fresh scratch directory.
    async fn prepare_manifest(
        &self,
        ctx: &mut ResolutionContext,
    ) -> Result<GraphPlan, BranchError> {
        let id = ctx.identity().clone();
        let repo = &self.options.target_repo;

        let mut resolved = false;
        if self.ledger.state(&id) == Some(EntryState::InRepository) {
            match self.repository.fetch_published_manifest(&id, repo).await {
                Ok(Some(manifest)) => {
                    debug!(module = %id, "using the manifest served by {}", repo);
                    ctx.descriptor.set_manifest(manifest);
                    resolved = true;
                }
                Ok(None) => warn!("{} exists in {} but has no manifest there", id, repo),
                Err(e) => warn!("Failed to fetch the manifest of {} from {}: {}", id, repo, e),
            }
        }

        let scratch = ScratchDir::new(self.options.scratch_root.as_deref(), &id).map_err(|e| {
            io_err(
                self.options
                    .scratch_root
                    .clone()
                    .unwrap_or_else(std::env::temp_dir),
                e,
            )
        })?;
        let root = ResolutionRoot::for_module(scratch.module_dir(), id.clone());
        ctx.scratch = Some(scratch);
        ctx.root = Some(root.clone());

        unpack_module(ctx.descriptor.archive(), &id, root.dir())?;
        remove_checksum(&root);

        let manifest = ctx.descriptor.manifest().to_vec();
        if self.patterns.is_non_empty(&manifest) {
            debug!(module = %id, "manifest declares requirements");
            write_manifest(&root, &manifest)?;
            return Ok(GraphPlan::Plain);
        }
        if resolved {
            debug!(module = %id, "resolved manifest is empty");
            write_manifest(&root, &manifest)?;
        }
        self.prepare_empty(ctx, &root, manifest)
    }

    /// An empty, unresolved manifest: `init`, then `tidy` if still empty.
    fn prepare_empty(
        &self,
        ctx: &mut ResolutionContext,
        root: &ResolutionRoot,
        original: Vec<u8>,
    ) -> Result<GraphPlan, BranchError> {
        let id = ctx.identity().clone();
        let manifest_path = root.manifest_path();
        match fs::remove_file(&manifest_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&manifest_path, e)),
        }

        if let Err(e) = self
            .tool
            .init(root, Some(id.path()), self.patterns.marker())
        {
            warn!("go mod init failed for {}: {}", id, e);
            write_manifest(root, &original)?;
        }

        let initialized = read_manifest(root)?;
        ctx.descriptor.set_manifest(initialized.clone());
        ctx.original = Some(original);

        if self.patterns.is_non_empty(&initialized) {
            debug!(module = %id, "manifest declares requirements after init");
            return Ok(GraphPlan::RetryAfterTidy);
        }
        debug!(module = %id, "manifest still empty after init");
        self.tidy(ctx, root)?;
        Ok(GraphPlan::Plain)
    }

    /// Populate the manifest with `tidy` and arm the revert.
    fn tidy(&self, ctx: &mut ResolutionContext, root: &ResolutionRoot) -> Result<(), BranchError> {
        remove_checksum(root);
        if let Err(e) = self.tool.tidy(root) {
            warn!("go mod tidy failed for {}: {}", ctx.identity(), e);
        }
        ctx.descriptor.set_manifest(read_manifest(root)?);
        ctx.must_revert = !self.options.overwrite_cache;
        Ok(())
    }

    /// Step 4, with the single retry for manifests produced by `init`.
    fn extract_graph(&self, ctx: &mut ResolutionContext) -> Result<Vec<ModuleIdentity>, BranchError> {
        let root = ctx.root.clone().ok_or(BranchError::NoScratch)?;
        let edges = match self.tool.graph(&root) {
            Ok(edges) => edges,
            Err(e) if ctx.plan == GraphPlan::RetryAfterTidy => {
                warn!(
                    "go mod graph failed for {}, retrying after tidy: {}",
                    ctx.identity(),
                    e
                );
                let original = ctx.original.clone().unwrap_or_default();
                ctx.descriptor.set_manifest(original.clone());
                write_manifest(&root, &original)?;
                self.tidy(ctx, &root)?;
                self.tool.graph(&root)?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(edges.into_iter().map(|e| e.to).collect())
    }

    /// Step 5: share the resolved manifest, then claim and acquire children.
    async fn fan_out(&self, walk: &mut Walk, index: usize) {
        let edges = {
            let ctx = &mut walk.contexts[index];
            ctx.expanded = true;
            self.share_manifest(ctx);
            ctx.edges.clone()
        };

        let mut children = Vec::new();
        for edge in &edges {
            if let Some(child) = self.acquire(edge).await {
                debug!(parent = %walk.contexts[index].identity(), child = %edge, "dependency");
                children.push(walk.push(child));
            }
        }
        walk.contexts[index].children = children;
    }

    fn share_manifest(&self, ctx: &mut ResolutionContext) {
        let manifest = ctx.descriptor.manifest();
        if !self.patterns.is_non_empty(manifest) || manifest == ctx.cached_manifest.as_slice() {
            return;
        }
        match self.cache.write_manifest(ctx.identity(), manifest) {
            Ok(()) => ctx.cached_manifest = manifest.to_vec(),
            Err(e) => warn!("Failed to update the cached manifest of {}: {}", ctx.identity(), e),
        }
    }

    /// Step 6: restore, publish if granted, remove the scratch directory.
    async fn finish(&self, ctx: &mut ResolutionContext) {
        let id = ctx.identity().clone();
        let repo = &self.options.target_repo;

        if ctx.must_revert {
            if let Some(original) = &ctx.original {
                debug!(module = %id, "restoring the original manifest");
                let restored = self.patterns.with_marker(original);
                if let Some(root) = &ctx.root {
                    if let Err(e) = write_manifest(root, &restored) {
                        warn!("Failed to restore the manifest of {}: {}", id, e);
                    }
                }
                if let Err(e) = self.cache.write_manifest(&id, &restored) {
                    warn!("Failed to restore the cached manifest of {}: {}", id, e);
                }
                ctx.cached_manifest = restored.clone();
                ctx.descriptor.set_manifest(restored);
            }
        }

        if self.ledger.claim_publish(&id) {
            let label = self.ledger.progress_label();
            match ctx.descriptor.publish(&label, repo, self.repository).await {
                Ok(()) => {
                    self.ledger.record_success();
                    ctx.state = ResolutionState::Published;
                }
                Err(e) => {
                    error!("Failed to publish {} to {}: {}", id, repo, e);
                    self.ledger.mark_failed(&id);
                    self.ledger.record_failure();
                    ctx.state = ResolutionState::Failed;
                }
            }
        } else {
            debug!(module = %id, "not publishing, already in {}", repo);
            ctx.state = ResolutionState::Published;
        }

        ctx.close_scratch();
    }
}

fn write_manifest(root: &ResolutionRoot, manifest: &[u8]) -> Result<(), BranchError> {
    let path = root.manifest_path();
    fs::write(&path, manifest).map_err(|e| io_err(&path, e))
}

fn read_manifest(root: &ResolutionRoot) -> Result<Vec<u8>, BranchError> {
    let path = root.manifest_path();
    fs::read(&path).map_err(|e| io_err(&path, e))
}

/// Remove a stale checksum file; failures are logged.
fn remove_checksum(root: &ResolutionRoot) {
    let path = root.checksum_path();
    match fs::remove_file(&path) {
        Ok(()) => debug!(path = %path.display(), "removed checksum file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
