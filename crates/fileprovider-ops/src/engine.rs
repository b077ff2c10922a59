//! The local disk backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fileprovider_core::{
    ChangeHandler, Completion, EngineConfig, FileObject, FileProvider, FileProviderMonitor,
    FoundHandler, OperationKind, PathResolver, ProviderError, SearchPredicate,
};
use fileprovider_scan::{ProgressEstimator, TreeSummary};
use fileprovider_watch::{ChangeNotifier, DebounceSettings};
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::conflict::{ConflictResolver, ItemPolicy};
use crate::dispatch::{CompletionContext, Dispatcher, OperationEvent, SerialContext};
use crate::handle::{LocalOperationHandle, ProgressPaths};
use crate::scheduler::OperationScheduler;
use crate::{content, copy, create, link, listing, move_op, remove};

/// File provider backed by a directory on local disk.
///
/// All paths passed in are relative to the storage root. Mutations run one
/// at a time in the order they were requested; reads run concurrently.
/// Completion callbacks run one at a time on the completion context, and
/// each is followed by an [`OperationEvent`] sent to every
/// [`subscribe`](Self::subscribe) receiver.
pub struct LocalEngine {
    paths: PathResolver,
    scheduler: OperationScheduler,
    estimator: Arc<ProgressEstimator>,
    notifier: ChangeNotifier,
    resolver: RwLock<Option<Arc<dyn ConflictResolver>>>,
}

impl LocalEngine {
    /// Create an engine on the current Tokio runtime.
    pub fn new(config: EngineConfig) -> Result<Self, ProviderError> {
        let runtime = Handle::try_current().map_err(|_| ProviderError::NoRuntime)?;
        let context = Arc::new(SerialContext::new(&runtime));
        Self::build(config, runtime, context)
    }

    /// Create an engine that delivers completions on `context`.
    pub fn with_completion_context(
        config: EngineConfig,
        context: Arc<dyn CompletionContext>,
    ) -> Result<Self, ProviderError> {
        let runtime = Handle::try_current().map_err(|_| ProviderError::NoRuntime)?;
        Self::build(config, runtime, context)
    }

    fn build(
        config: EngineConfig,
        runtime: Handle,
        context: Arc<dyn CompletionContext>,
    ) -> Result<Self, ProviderError> {
        let root = config
            .root
            .canonicalize()
            .map_err(|e| ProviderError::io(&config.root, e))?;
        if !root.is_dir() {
            return Err(ProviderError::cannot_open(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "storage root is not a folder"),
            ));
        }

        let estimator = Arc::new(ProgressEstimator::with_threads(config.estimate_threads));
        let dispatcher = Dispatcher::new(context, config.event_capacity);
        let scheduler = OperationScheduler::new(
            runtime.clone(),
            config.read_permits(),
            dispatcher,
            root.clone(),
            Arc::clone(&estimator),
        );
        let notifier = ChangeNotifier::with_runtime(
            DebounceSettings {
                min_interval: config.watch_min_interval(),
                delay: config.watch_delay(),
            },
            runtime,
        );

        info!(root = %root.display(), reads = config.read_permits(), "Local engine ready");

        Ok(Self {
            paths: PathResolver::new(root),
            scheduler,
            estimator,
            notifier,
            resolver: RwLock::new(None),
        })
    }

    /// The canonical storage root.
    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Receive an event after every completed operation.
    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.scheduler.dispatcher().subscribe()
    }

    /// Receive periodic snapshots while size estimates walk large trees.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<TreeSummary> {
        self.estimator.subscribe()
    }

    /// Set the resolver consulted by operations scheduled from now on.
    pub fn set_conflict_resolver(&self, resolver: Option<Arc<dyn ConflictResolver>>) {
        *self.resolver.write() = resolver;
    }

    /// The directory watches of this engine.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Count folders, files and bytes below `path`.
    pub fn estimate(
        &self,
        path: &Path,
        recursive: bool,
        completion: Completion<TreeSummary>,
    ) -> LocalOperationHandle {
        let absolute = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::fetch(path), err, completion),
        };
        let estimator = Arc::clone(&self.estimator);
        self.scheduler.enqueue(
            OperationKind::fetch(self.relative(&absolute)),
            ProgressPaths::none(),
            move || Ok(estimator.estimate(&absolute, recursive)),
            completion,
        )
    }

    fn relative(&self, absolute: &Path) -> PathBuf {
        self.paths
            .relative(absolute)
            .unwrap_or_else(|| absolute.to_path_buf())
    }

    fn policy(&self) -> ItemPolicy {
        ItemPolicy::new(self.resolver.read().clone(), self.paths.clone())
    }

    fn resolve_pair(&self, first: &Path, second: &Path) -> Result<(PathBuf, PathBuf), ProviderError> {
        Ok((self.paths.absolute(first)?, self.paths.absolute(second)?))
    }
}

impl FileProvider for LocalEngine {
    type Handle = LocalOperationHandle;

    fn contents_of_directory(
        &self,
        path: &Path,
        completion: Completion<Vec<FileObject>>,
    ) -> Self::Handle {
        let absolute = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::fetch(path), err, completion),
        };
        let paths = self.paths.clone();
        self.scheduler.enqueue(
            OperationKind::fetch(self.relative(&absolute)),
            ProgressPaths::none(),
            move || listing::list(&absolute, &paths),
            completion,
        )
    }

    fn attributes_of_item(&self, path: &Path, completion: Completion<FileObject>) -> Self::Handle {
        let absolute = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::fetch(path), err, completion),
        };
        let paths = self.paths.clone();
        self.scheduler.enqueue(
            OperationKind::fetch(self.relative(&absolute)),
            ProgressPaths::none(),
            move || listing::describe(&absolute, &paths),
            completion,
        )
    }

    fn contents(&self, path: &Path, completion: Completion<Vec<u8>>) -> Self::Handle {
        let absolute = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::fetch(path), err, completion),
        };
        self.scheduler.enqueue(
            OperationKind::fetch(self.relative(&absolute)),
            ProgressPaths::none(),
            move || content::read_all(&absolute),
            completion,
        )
    }

    fn contents_range(
        &self,
        path: &Path,
        offset: u64,
        length: usize,
        completion: Completion<Vec<u8>>,
    ) -> Self::Handle {
        let absolute = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::fetch(path), err, completion),
        };
        self.scheduler.enqueue(
            OperationKind::fetch(self.relative(&absolute)),
            ProgressPaths::none(),
            move || content::read_range(&absolute, offset, length),
            completion,
        )
    }

    fn search_files(
        &self,
        path: &Path,
        recursive: bool,
        query: SearchPredicate,
        found: Option<FoundHandler>,
        completion: Completion<Vec<FileObject>>,
    ) -> Self::Handle {
        let absolute = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::fetch(path), err, completion),
        };
        let paths = self.paths.clone();
        self.scheduler.enqueue(
            OperationKind::fetch(self.relative(&absolute)),
            ProgressPaths::none(),
            move || listing::search(&absolute, recursive, &query, found.as_ref(), &paths),
            completion,
        )
    }

    fn create_folder(&self, name: &str, at: &Path, completion: Completion<()>) -> Self::Handle {
        let parent = match self.paths.absolute(at) {
            Ok(p) => p,
            Err(err) => {
                return self
                    .scheduler
                    .reject(OperationKind::create(at.join(name)), err, completion);
            }
        };
        let name = name.to_string();
        self.scheduler.enqueue(
            OperationKind::create(self.relative(&parent).join(&name)),
            ProgressPaths::none(),
            move || create::create_folder(&name, &parent).map(|_| ()),
            completion,
        )
    }

    fn write_contents(
        &self,
        path: &Path,
        data: Vec<u8>,
        overwrite: bool,
        atomically: bool,
        completion: Completion<()>,
    ) -> Self::Handle {
        let absolute = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::modify(path), err, completion),
        };
        self.scheduler.enqueue(
            OperationKind::modify(self.relative(&absolute)),
            ProgressPaths::write(&absolute, data.len() as u64),
            move || content::write(&absolute, &data, overwrite, atomically),
            completion,
        )
    }

    fn move_item(
        &self,
        path: &Path,
        to: &Path,
        overwrite: bool,
        completion: Completion<()>,
    ) -> Self::Handle {
        let (source, destination) = match self.resolve_pair(path, to) {
            Ok(pair) => pair,
            Err(err) => return self.scheduler.reject(OperationKind::move_to(path, to), err, completion),
        };
        let policy = self.policy();
        self.scheduler.enqueue(
            OperationKind::move_to(self.relative(&source), self.relative(&destination)),
            ProgressPaths::transfer(&source, &destination),
            move || move_op::move_item(&source, &destination, overwrite, &policy),
            completion,
        )
    }

    fn copy_item(
        &self,
        path: &Path,
        to: &Path,
        overwrite: bool,
        completion: Completion<()>,
    ) -> Self::Handle {
        let (source, destination) = match self.resolve_pair(path, to) {
            Ok(pair) => pair,
            Err(err) => return self.scheduler.reject(OperationKind::copy(path, to), err, completion),
        };
        let policy = self.policy();
        self.scheduler.enqueue(
            OperationKind::copy(self.relative(&source), self.relative(&destination)),
            ProgressPaths::transfer(&source, &destination),
            move || copy::copy_item(&source, &destination, overwrite, &policy),
            completion,
        )
    }

    fn remove_item(&self, path: &Path, completion: Completion<()>) -> Self::Handle {
        let absolute = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::remove(path), err, completion),
        };
        if absolute == self.paths.root() {
            let err = ProviderError::InvalidPath {
                path: path.to_path_buf(),
            };
            return self.scheduler.reject(OperationKind::remove(path), err, completion);
        }
        let policy = self.policy();
        self.scheduler.enqueue(
            OperationKind::remove(self.relative(&absolute)),
            ProgressPaths::none(),
            move || remove::remove_item(&absolute, &policy),
            completion,
        )
    }

    fn create_symbolic_link(
        &self,
        path: &Path,
        destination: &Path,
        completion: Completion<()>,
    ) -> Self::Handle {
        let (at, target) = match self.resolve_pair(path, destination) {
            Ok(pair) => pair,
            Err(err) => {
                return self
                    .scheduler
                    .reject(OperationKind::link(path, destination), err, completion);
            }
        };
        let policy = self.policy();
        self.scheduler.enqueue(
            OperationKind::link(self.relative(&at), self.relative(&target)),
            ProgressPaths::none(),
            move || link::create_link(&at, &target, &policy),
            completion,
        )
    }

    fn copy_in(
        &self,
        local: &Path,
        to: &Path,
        overwrite: bool,
        completion: Completion<()>,
    ) -> Self::Handle {
        let destination = match self.paths.absolute(to) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::copy(local, to), err, completion),
        };
        let source = local.to_path_buf();
        let policy = self.policy();
        self.scheduler.enqueue(
            OperationKind::copy(&source, self.relative(&destination)),
            ProgressPaths::transfer(&source, &destination),
            move || copy::copy_item(&source, &destination, overwrite, &policy),
            completion,
        )
    }

    fn copy_out(
        &self,
        path: &Path,
        local: &Path,
        overwrite: bool,
        completion: Completion<()>,
    ) -> Self::Handle {
        let source = match self.paths.absolute(path) {
            Ok(p) => p,
            Err(err) => return self.scheduler.reject(OperationKind::copy(path, local), err, completion),
        };
        let destination = local.to_path_buf();
        let policy = self.policy();
        self.scheduler.enqueue(
            OperationKind::copy(self.relative(&source), &destination),
            ProgressPaths::transfer(&source, &destination),
            move || copy::copy_item(&source, &destination, overwrite, &policy),
            completion,
        )
    }
}

impl FileProviderMonitor for LocalEngine {
    fn register_notifying(&self, path: &Path, handler: ChangeHandler) {
        match self.paths.absolute(path) {
            Ok(absolute) => self.notifier.register(&absolute, handler),
            Err(err) => debug!(%err, "Not watching path outside the root"),
        }
    }

    fn unregister_notifying(&self, path: &Path) {
        if let Ok(absolute) = self.paths.absolute(path) {
            self.notifier.unregister(&absolute);
        }
    }

    fn is_registered(&self, path: &Path) -> bool {
        self.paths
            .absolute(path)
            .is_ok_and(|absolute| self.notifier.is_registered(&absolute))
    }
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine")
            .field("root", &self.paths.root())
            .field("watches", &self.notifier.len())
            .finish()
    }
}
