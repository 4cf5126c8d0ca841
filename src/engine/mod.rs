//! Engines
//!
//! An engine is the opaque third-party parser an adapter delegates to. The
//! core only knows its `parse`-like entry points and an optional version.

pub mod shape;
pub mod grammar;

pub use grammar::TreeSitterEngine;
pub use shape::TreeShape;

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A loaded engine, shared by the adapters bound to it
pub type EngineHandle = Arc<dyn Engine>;

/// Native diagnostic reported by an engine that rejected its input.
///
/// Carried to the host unmodified so it can be displayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
            offset: None,
        }
    }

    /// Attach a 1-based line/column position and character offset
    pub fn at(mut self, line: usize, column: usize, offset: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{} ({}:{})", self.message, line, column),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Trait for parser engines
///
/// Implementations must be cheap to share; the loader hands out one handle
/// per adapter and requested release for the whole process.
pub trait Engine: Send + Sync {
    /// Package name the engine is published under
    fn package(&self) -> &str;

    /// Version reported by the engine itself, if it exposes one
    fn version(&self) -> Option<&str>;

    /// Parse `code` into a tree using already-merged options
    fn parse(&self, code: &str, options: &Value) -> Result<Value, Diagnostic>;

    /// Additional entry points reachable through [`Engine::invoke`]
    fn entry_points(&self) -> &[&'static str] {
        &[]
    }

    /// Call a named secondary entry point (e.g. a compile step)
    fn invoke(&self, entry: &str, _code: &str, _options: &Value) -> Result<Value, Diagnostic> {
        Err(Diagnostic::new(format!(
            "{} has no entry point `{}`",
            self.package(),
            entry
        )))
    }
}

impl fmt::Debug for dyn Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("package", &self.package())
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoEngine;

    impl Engine for EchoEngine {
        fn package(&self) -> &str { "echo" }
        fn version(&self) -> Option<&str> { None }
        fn parse(&self, code: &str, _options: &Value) -> Result<Value, Diagnostic> {
            Ok(Value::String(code.to_string()))
        }
    }

    #[test]
    fn test_default_invoke_rejects() {
        let err = EchoEngine.invoke("compile", "x", &Value::Null).unwrap_err();
        assert_eq!(err.message, "echo has no entry point `compile`");
        assert!(EchoEngine.entry_points().is_empty());
    }

    #[test]
    fn test_handle_debug() {
        let handle: EngineHandle = std::sync::Arc::new(EchoEngine);
        assert_eq!(format!("{:?}", handle), r#"Engine { package: "echo", version: None }"#);
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(Diagnostic::new("boom").to_string(), "boom");
        assert_eq!(Diagnostic::new("boom").at(2, 5, 9).to_string(), "boom (2:5)");
    }
}
