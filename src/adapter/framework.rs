//! Core adapter framework
//!
//! Defines the [`Parser`] contract every adapter fulfils and
//! [`ParserAdapter`], the configuration value the catalog is built from.

use crate::engine::{Diagnostic, Engine, EngineHandle};
use crate::loader::{EngineSet, EngineSource, LoadState, ModuleLoader};
use crate::location::{Location, LocationStrategy};
use crate::options::{OptionsDescriptor, OptionsValue};
use crate::version::{self, VersionSource};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::OnceCell;

/// Optional hooks an adapter may provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    NodeTitle,
    ValueHint,
    Location,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::NodeTitle => "nodeTitle",
            Capability::ValueHint => "valueHint",
            Capability::Location => "location",
        };
        f.write_str(name)
    }
}

/// Static set of hooks an adapter implements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub node_title: bool,
    pub value_hint: bool,
    pub location: bool,
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::NodeTitle => self.node_title,
            Capability::ValueHint => self.value_hint,
            Capability::Location => self.location,
        }
    }
}

/// The contract every parser adapter fulfils.
///
/// Identity and hooks are synchronous and pure. `parse` and `version` may
/// suspend while the backing engine is acquired on first use. The `_at`
/// variants target a host-selected engine release; adapters that do not
/// allow overriding reject any requested release.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Stable identifier, unique across the registry
    fn id(&self) -> &str;

    /// Display label
    fn label(&self) -> &str;

    /// Editor language of the source this parser accepts
    fn editor_language(&self) -> &str;

    fn icon(&self) -> Option<&str> {
        None
    }

    fn link(&self) -> Option<&str> {
        None
    }

    /// Options template; hosts clone before editing
    fn options(&self) -> &OptionsDescriptor;

    /// Which optional hooks are implemented
    fn capabilities(&self) -> Capabilities;

    /// Whether the host may pick the engine release
    fn version_overridable(&self) -> bool {
        false
    }

    /// `<package>@<version>` of the requested release, or of the default
    /// release when `requested` is `None`; may load the engine
    async fn version_at(&self, requested: Option<&str>) -> Result<String>;

    /// Parse `code` with the requested engine release
    async fn parse_at(&self, code: &str, options: Option<&OptionsValue>, requested: Option<&str>) -> Result<Value>;

    /// `<package>@<version>`; may load the engine
    async fn version(&self) -> Result<String> {
        self.version_at(None).await
    }

    /// Parse `code`, merging `options` over the default
    async fn parse(&self, code: &str, options: Option<&OptionsValue>) -> Result<Value> {
        self.parse_at(code, options, None).await
    }

    /// Human label for a node
    fn node_title(&self, _node: &Value) -> Result<Option<String>> {
        Err(self.unsupported(Capability::NodeTitle))
    }

    /// Annotation for an opaque property value
    fn value_hint(&self, _key: &str, _value: &Value) -> Result<Option<String>> {
        Err(self.unsupported(Capability::ValueHint))
    }

    /// Source range of a node; `Ok(None)` when the node carries no location
    fn location(&self, _node: &Value) -> Result<Option<Location>> {
        Err(self.unsupported(Capability::Location))
    }

    fn unsupported(&self, operation: Capability) -> Error {
        Error::UnsupportedOperation {
            adapter: self.id().to_string(),
            operation,
        }
    }
}

impl fmt::Debug for dyn Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Engine-bound parse operation
pub type ParseFn = Arc<dyn Fn(&dyn Engine, &str, &Value) -> std::result::Result<Value, Diagnostic> + Send + Sync>;
/// Node labeling hook
pub type NodeTitleFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;
/// Value annotation hook
pub type ValueHintFn = Arc<dyn Fn(&str, &Value) -> Option<String> + Send + Sync>;

/// Resolved version strings keyed by requested release
type VersionCache = Mutex<HashMap<Option<String>, Arc<OnceCell<String>>>>;

/// A parser adapter as a plain configuration value.
///
/// Variants are built by structural extension: [`ParserAdapter::derive`]
/// copies every field of a base (including its engine handle) and the caller
/// overrides what differs, typically id, label, options and parse.
#[derive(Clone)]
pub struct ParserAdapter {
    id: String,
    label: String,
    icon: Option<String>,
    link: Option<String>,
    editor_language: String,
    options: OptionsDescriptor,
    engines: Arc<EngineSet>,
    version_source: VersionSource,
    version_overridable: bool,
    version_cache: Arc<VersionCache>,
    parse_fn: ParseFn,
    node_title: Option<NodeTitleFn>,
    value_hint: Option<ValueHintFn>,
    location: Option<LocationStrategy>,
}

impl ParserAdapter {
    /// Create an adapter over the engine of `package`, acquired from `source`
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        editor_language: impl Into<String>,
        package: impl Into<String>,
        source: impl EngineSource + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            icon: None,
            link: None,
            editor_language: editor_language.into(),
            options: OptionsDescriptor::default(),
            engines: Arc::new(EngineSet::new(package, Arc::new(source))),
            version_source: VersionSource::Engine,
            version_overridable: true,
            version_cache: Arc::new(Mutex::new(HashMap::new())),
            parse_fn: Arc::new(|engine: &dyn Engine, code: &str, options: &Value| engine.parse(code, options)),
            node_title: None,
            value_hint: None,
            location: None,
        }
    }

    /// Copy this adapter under a new identity, sharing its engine handle
    pub fn derive(&self, id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..self.clone()
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_editor_language(mut self, language: impl Into<String>) -> Self {
        self.editor_language = language.into();
        self
    }

    pub fn with_options(mut self, options: OptionsDescriptor) -> Self {
        self.options = options;
        self
    }

    pub fn with_version_source(mut self, source: VersionSource) -> Self {
        self.version_source = source;
        self
    }

    /// Allow or forbid host-selected engine releases
    pub fn with_version_overridable(mut self, overridable: bool) -> Self {
        self.version_overridable = overridable;
        self
    }

    /// Replace the engine-bound parse operation
    pub fn with_parse<F>(mut self, parse: F) -> Self
    where
        F: Fn(&dyn Engine, &str, &Value) -> std::result::Result<Value, Diagnostic> + Send + Sync + 'static,
    {
        self.parse_fn = Arc::new(parse);
        self
    }

    pub fn with_node_title<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.node_title = Some(Arc::new(hook));
        self
    }

    pub fn with_value_hint<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &Value) -> Option<String> + Send + Sync + 'static,
    {
        self.value_hint = Some(Arc::new(hook));
        self
    }

    pub fn with_location(mut self, strategy: LocationStrategy) -> Self {
        self.location = Some(strategy);
        self
    }

    pub fn package(&self) -> &str {
        self.engines.package()
    }

    pub fn location_strategy(&self) -> Option<&LocationStrategy> {
        self.location.as_ref()
    }

    /// Lifecycle of the default release, without triggering a load
    pub fn load_state(&self) -> LoadState {
        self.engines.default_loader().state()
    }

    /// Loader of the default release
    pub fn loader(&self) -> &ModuleLoader {
        self.engines.default_loader()
    }

    /// All loaders of this adapter's package
    pub fn engines(&self) -> &EngineSet {
        &self.engines
    }

    /// The loaded default engine, acquiring it on first use
    pub async fn engine(&self) -> Result<EngineHandle> {
        self.engine_at(None).await
    }

    /// The loaded engine of a release, acquiring it on first use
    pub async fn engine_at(&self, requested: Option<&str>) -> Result<EngineHandle> {
        self.engines.loader(requested).load().await
    }

    fn check_override(&self, requested: Option<&str>) -> Result<()> {
        match requested {
            Some(version) if !self.version_overridable => Err(Error::VersionNotOverridable {
                adapter: self.id.clone(),
                version: version.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn version_cell(&self, requested: Option<&str>) -> Arc<OnceCell<String>> {
        let mut cache = self.version_cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cache.entry(requested.map(str::to_string)).or_default())
    }

    async fn resolve_version(&self, requested: Option<&str>) -> Result<String> {
        let package = self.package();
        match (&self.version_source, requested) {
            // the side channel only describes the default release
            (VersionSource::Metadata(_), Some(version)) => Ok(version::format_version(package, version)),
            (VersionSource::Metadata(source), None) => version::fetch(source.as_ref(), package).await,
            (VersionSource::Engine, _) => {
                let engine = self.engine_at(requested).await?;
                let reported = engine.version().or(requested).unwrap_or("unknown");
                Ok(version::format_version(package, reported))
            }
            (VersionSource::EngineOrMetadata(source), _) => {
                let engine = self.engine_at(requested).await?;
                match engine.version().or(requested) {
                    Some(reported) => Ok(version::format_version(package, reported)),
                    None => version::fetch(source.as_ref(), package).await,
                }
            }
        }
    }
}

#[async_trait]
impl Parser for ParserAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn editor_language(&self) -> &str {
        &self.editor_language
    }

    fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    fn options(&self) -> &OptionsDescriptor {
        &self.options
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            node_title: self.node_title.is_some(),
            value_hint: self.value_hint.is_some(),
            location: self.location.is_some(),
        }
    }

    fn version_overridable(&self) -> bool {
        self.version_overridable
    }

    async fn version_at(&self, requested: Option<&str>) -> Result<String> {
        self.check_override(requested)?;
        let cell = self.version_cell(requested);
        let version = cell.get_or_try_init(|| self.resolve_version(requested)).await?;
        Ok(version.clone())
    }

    async fn parse_at(&self, code: &str, options: Option<&OptionsValue>, requested: Option<&str>) -> Result<Value> {
        self.check_override(requested)?;
        let options = self.options.resolve(options)?;
        let engine = self.engine_at(requested).await?;

        let started = Instant::now();
        let result = (self.parse_fn)(engine.as_ref(), code, &options);
        tracing::debug!(
            adapter = %self.id,
            version = ?requested,
            bytes = code.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "parse finished"
        );

        result.map_err(|diagnostic| Error::EngineParse {
            adapter: self.id.clone(),
            diagnostic,
        })
    }

    fn node_title(&self, node: &Value) -> Result<Option<String>> {
        match &self.node_title {
            Some(hook) => Ok(hook(node)),
            None => Err(self.unsupported(Capability::NodeTitle)),
        }
    }

    fn value_hint(&self, key: &str, value: &Value) -> Result<Option<String>> {
        match &self.value_hint {
            Some(hook) => Ok(hook(key, value)),
            None => Err(self.unsupported(Capability::ValueHint)),
        }
    }

    fn location(&self, node: &Value) -> Result<Option<Location>> {
        match &self.location {
            Some(strategy) => Ok(strategy.resolve(node)),
            None => Err(self.unsupported(Capability::Location)),
        }
    }
}

impl fmt::Debug for ParserAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserAdapter")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("editor_language", &self.editor_language)
            .field("package", &self.package())
            .field("options", &self.options)
            .field("version_source", &self.version_source)
            .field("version_overridable", &self.version_overridable)
            .field("capabilities", &self.capabilities())
            .field("location", &self.location)
            .finish()
    }
}
