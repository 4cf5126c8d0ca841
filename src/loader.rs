//! Module Loader
//!
//! Turns an adapter's engine source into a loaded [`EngineHandle`], paying the
//! acquisition cost at most once per process. The in-flight acquisition itself
//! is the cache entry, so callers that arrive while it runs wait on it instead
//! of starting their own. Failures are cached too and re-raised on every use
//! until [`ModuleLoader::invalidate`] is called.

use crate::engine::EngineHandle;
use crate::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Cause of a failed acquisition, shared by every caller that observes it
pub type LoadCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

type Outcome = std::result::Result<EngineHandle, LoadCause>;

/// Where an engine comes from: a bundled module, a registry mirror, ...
///
/// The loader never looks inside; it only calls `acquire`. `version` is the
/// release the host asked for, `None` meaning the source's default.
#[async_trait]
pub trait EngineSource: Send + Sync {
    /// Short human description, used in logs
    fn describe(&self) -> String;

    async fn acquire(&self, version: Option<&str>) -> anyhow::Result<EngineHandle>;
}

/// An engine compiled into the binary. Only the bundled release can be
/// requested.
pub struct BundledSource<F> {
    name: &'static str,
    build: F,
}

impl<F> BundledSource<F>
where
    F: Fn() -> anyhow::Result<EngineHandle> + Send + Sync,
{
    pub fn new(name: &'static str, build: F) -> Self {
        Self { name, build }
    }
}

#[async_trait]
impl<F> EngineSource for BundledSource<F>
where
    F: Fn() -> anyhow::Result<EngineHandle> + Send + Sync,
{
    fn describe(&self) -> String {
        format!("bundled:{}", self.name)
    }

    async fn acquire(&self, version: Option<&str>) -> anyhow::Result<EngineHandle> {
        let engine = (self.build)()?;
        match (version, engine.version()) {
            (None, _) => Ok(engine),
            (Some(requested), Some(bundled)) if requested == bundled => Ok(engine),
            (Some(requested), Some(bundled)) => {
                anyhow::bail!("{} bundles version {}, not {}", self.name, bundled, requested)
            }
            (Some(requested), None) => {
                anyhow::bail!("{} cannot provide version {}", self.name, requested)
            }
        }
    }
}

/// An engine produced by an arbitrary asynchronous resolver
pub struct ResolverSource<F> {
    description: String,
    resolve: F,
}

impl<F, Fut> ResolverSource<F>
where
    F: Fn(Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<EngineHandle>> + Send,
{
    pub fn new(description: impl Into<String>, resolve: F) -> Self {
        Self {
            description: description.into(),
            resolve,
        }
    }
}

#[async_trait]
impl<F, Fut> EngineSource for ResolverSource<F>
where
    F: Fn(Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<EngineHandle>> + Send,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn acquire(&self, version: Option<&str>) -> anyhow::Result<EngineHandle> {
        (self.resolve)(version.map(str::to_string)).await
    }
}

/// Observable lifecycle of an engine handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Absent,
    Loading,
    Loaded,
    Failed,
}

/// Per-adapter memoized engine handle for one requested version
pub struct ModuleLoader {
    package: String,
    version: Option<String>,
    source: Arc<dyn EngineSource>,
    slot: Mutex<Arc<Slot>>,
    acquisitions: AtomicUsize,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
}

#[derive(Default)]
enum SlotState {
    #[default]
    Absent,
    /// The acquisition task publishes its outcome here
    Loading(watch::Receiver<Option<Outcome>>),
    Settled(Outcome),
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn settle(&self, outcome: Outcome) {
        *self.lock() = SlotState::Settled(outcome);
    }
}

impl ModuleLoader {
    pub fn new(package: impl Into<String>, source: Arc<dyn EngineSource>) -> Self {
        Self {
            package: package.into(),
            version: None,
            source,
            slot: Mutex::new(Arc::new(Slot::default())),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// A loader for a specific release of the package
    pub fn pinned(package: impl Into<String>, source: Arc<dyn EngineSource>, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::new(package, source)
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Requested release; `None` for the source's default
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Return the cached engine, acquiring it first if nothing is cached yet.
    ///
    /// The acquisition runs as its own task: a caller that stops waiting does
    /// not cancel it, and later callers join the same task.
    pub async fn load(&self) -> Result<EngineHandle> {
        let slot = self.current_slot();
        let mut receiver = {
            let mut state = slot.lock();
            match &*state {
                SlotState::Settled(outcome) => {
                    tracing::trace!(package = %self.package, "engine cache hit");
                    return self.into_result(outcome);
                }
                SlotState::Loading(receiver) => receiver.clone(),
                SlotState::Absent => {
                    let receiver = self.spawn_acquisition(Arc::clone(&slot));
                    *state = SlotState::Loading(receiver.clone());
                    receiver
                }
            }
        };

        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(published) => published.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(outcome) => self.into_result(&outcome),
            None => {
                let cause: Box<dyn std::error::Error + Send + Sync> =
                    "engine acquisition task ended without a result".into();
                Err(Error::EngineLoad {
                    package: self.package.clone(),
                    cause: Arc::from(cause),
                })
            }
        }
    }

    /// Current lifecycle state, without triggering a load
    pub fn state(&self) -> LoadState {
        let slot = self.current_slot();
        let state = slot.lock();
        match &*state {
            SlotState::Absent => LoadState::Absent,
            SlotState::Loading(_) => LoadState::Loading,
            SlotState::Settled(Ok(_)) => LoadState::Loaded,
            SlotState::Settled(Err(_)) => LoadState::Failed,
        }
    }

    /// Number of acquisitions started over the process lifetime
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Drop the cached outcome so the next `load` acquires again.
    ///
    /// An acquisition already in flight still completes for its waiters.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Arc::new(Slot::default());
        tracing::debug!(package = %self.package, "engine cache invalidated");
    }

    fn current_slot(&self) -> Arc<Slot> {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&slot)
    }

    fn spawn_acquisition(&self, slot: Arc<Slot>) -> watch::Receiver<Option<Outcome>> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = watch::channel(None);
        let package = self.package.clone();
        let version = self.version.clone();
        let source = Arc::clone(&self.source);

        tokio::spawn(async move {
            let outcome = acquire(&package, version.as_deref(), source.as_ref()).await;
            slot.settle(outcome.clone());
            // waiters may all be gone; the slot already holds the outcome
            let _ = sender.send(Some(outcome));
        });
        receiver
    }

    fn into_result(&self, outcome: &Outcome) -> Result<EngineHandle> {
        match outcome {
            Ok(handle) => Ok(Arc::clone(handle)),
            Err(cause) => Err(Error::EngineLoad {
                package: self.package.clone(),
                cause: Arc::clone(cause),
            }),
        }
    }
}

async fn acquire(package: &str, version: Option<&str>, source: &dyn EngineSource) -> Outcome {
    let described = source.describe();
    tracing::debug!(package, ?version, source = %described, "loading engine");

    match source.acquire(version).await {
        Ok(handle) => {
            tracing::debug!(package, version = ?handle.version(), "engine loaded");
            Ok(handle)
        }
        Err(e) => {
            tracing::warn!(package, source = %described, error = %e, "engine load failed");
            let cause: Box<dyn std::error::Error + Send + Sync> = e.into();
            Err(Arc::from(cause))
        }
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("package", &self.package)
            .field("version", &self.version)
            .field("source", &self.source.describe())
            .field("state", &self.state())
            .finish()
    }
}

/// The loaders of one package: the default release plus one loader per
/// requested release, each memoized for the process lifetime
pub struct EngineSet {
    default: Arc<ModuleLoader>,
    pinned: Mutex<HashMap<String, Arc<ModuleLoader>>>,
}

impl EngineSet {
    pub fn new(package: impl Into<String>, source: Arc<dyn EngineSource>) -> Self {
        Self {
            default: Arc::new(ModuleLoader::new(package, source)),
            pinned: Mutex::new(HashMap::new()),
        }
    }

    pub fn package(&self) -> &str {
        self.default.package()
    }

    pub fn default_loader(&self) -> &ModuleLoader {
        &self.default
    }

    /// The loader for `version`, created on first request
    pub fn loader(&self, version: Option<&str>) -> Arc<ModuleLoader> {
        let Some(version) = version else {
            return Arc::clone(&self.default);
        };
        let mut pinned = self.pinned.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let loader = pinned.entry(version.to_string()).or_insert_with(|| {
            Arc::new(ModuleLoader::pinned(
                self.default.package(),
                Arc::clone(&self.default.source),
                version,
            ))
        });
        Arc::clone(loader)
    }

    /// Releases requested so far, sorted
    pub fn pinned_versions(&self) -> Vec<String> {
        let pinned = self.pinned.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut versions: Vec<String> = pinned.keys().cloned().collect();
        versions.sort();
        versions
    }
}

impl fmt::Debug for EngineSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSet")
            .field("default", &self.default)
            .field("pinned", &self.pinned_versions())
            .finish()
    }
}
