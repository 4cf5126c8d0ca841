//! Parser Adapter Framework
//!
//! Each adapter wraps one third-party engine behind the [`Parser`] contract.
//! Adapters are grouped into language options held by a static registry; the
//! concrete entries live in [`crate::catalog`].

pub mod framework;
pub mod registry;

pub use framework::{Capabilities, Capability, Parser, ParserAdapter};
pub use registry::{default_registry, LanguageOption, LanguageRegistry};
