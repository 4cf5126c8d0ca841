//! # astlens - uniform adapter layer over parser engines
//!
//! Lets a host invoke many unrelated, independently-versioned parsers through
//! one contract and map the nodes of whatever tree they return back to source
//! ranges.
//!
//! astlens provides:
//! - The [`Parser`] contract and the composable [`ParserAdapter`] value
//! - Lazy, at-most-once engine acquisition with cached failures
//! - Option negotiation (defaults, shallow merge, fixed options)
//! - Location strategies for heterogeneous tree shapes
//! - A static registry of language options backed by tree-sitter engines

pub mod location;
pub mod engine;
pub mod loader;
pub mod options;
pub mod version;
pub mod adapter;
pub mod catalog;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use adapter::{
    default_registry, Capabilities, Capability, LanguageOption, LanguageRegistry, Parser,
    ParserAdapter,
};
pub use engine::{Diagnostic, Engine, EngineHandle};
pub use loader::{EngineSet, EngineSource, LoadState, ModuleLoader};
pub use location::{Location, LocationStrategy};
pub use options::{OptionsDescriptor, OptionsLanguage, OptionsValue};
pub use version::{MetadataSource, VersionSource};

/// Result type alias for astlens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for astlens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to load engine {package}: {cause}")]
    EngineLoad {
        package: String,
        #[source]
        cause: loader::LoadCause,
    },

    #[error("{adapter}: {diagnostic}")]
    EngineParse {
        adapter: String,
        diagnostic: Diagnostic,
    },

    #[error("Parser {adapter} does not support {operation}")]
    UnsupportedOperation {
        adapter: String,
        operation: Capability,
    },

    #[error("Parser {adapter} does not allow selecting version {version}")]
    VersionNotOverridable { adapter: String, version: String },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Failed to resolve version of {package}: {cause}")]
    Metadata {
        package: String,
        #[source]
        cause: loader::LoadCause,
    },

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Unknown parser {parser} for language {language}")]
    UnknownParser { language: String, parser: String },

    #[error("Duplicate id in registry: {0}")]
    DuplicateId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the engine itself rejected the input, as opposed to an
    /// infrastructure or configuration failure
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::EngineParse { .. })
    }
}
