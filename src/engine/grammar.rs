//! Tree-sitter grammars as engines
//!
//! Every bundled engine is a compiled tree-sitter grammar. The engine owns the
//! grammar and the tree shape it emits; a fresh `tree_sitter::Parser` is built
//! per call since parsers are not shareable across tasks.

use super::shape::{self, ShapeOptions, TreeShape};
use super::{Diagnostic, Engine};
use serde_json::{Value, json};
use tree_sitter::{Language, Parser, Query, QueryCursor, Tree};

/// Secondary entry point: run a tree-sitter query over the input
pub const QUERY_ENTRY: &str = "query";

/// A tree-sitter grammar exposed through the [`Engine`] contract
pub struct TreeSitterEngine {
    package: &'static str,
    version: Option<&'static str>,
    language: Language,
    shape: TreeShape,
}

impl TreeSitterEngine {
    pub fn new(package: &'static str, language: Language, shape: TreeShape) -> Self {
        Self {
            package,
            version: None,
            language,
            shape,
        }
    }

    /// Version the engine reports about itself
    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn shape(&self) -> TreeShape {
        self.shape
    }

    fn parse_tree(&self, code: &str) -> Result<Tree, Diagnostic> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| Diagnostic::new(format!("failed to set language: {}", e)))?;
        parser
            .parse(code, None)
            .ok_or_else(|| Diagnostic::new("parser produced no tree"))
    }

    fn query(&self, code: &str, options: &Value) -> Result<Value, Diagnostic> {
        let source = options
            .get("source")
            .and_then(Value::as_str)
            .ok_or_else(|| Diagnostic::new("query requires a `source` string"))?;

        let query = Query::new(&self.language, source).map_err(|e| {
            Diagnostic::new(format!("invalid query: {}", e.message)).at(e.row + 1, e.column + 1, e.offset)
        })?;

        let tree = self.parse_tree(code)?;
        let index = shape::CharIndex::new(code);
        let names = query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut captures = Vec::new();

        let matches = cursor.matches(&query, tree.root_node(), code.as_bytes());
        for query_match in matches {
            for capture in query_match.captures {
                let node = capture.node;
                captures.push(json!({
                    "name": names[capture.index as usize],
                    "type": node.kind(),
                    "text": code.get(node.byte_range()).unwrap_or_default(),
                    "start": index.offset(node.start_byte()),
                    "end": index.offset(node.end_byte()),
                }));
            }
        }

        tracing::trace!(package = self.package, count = captures.len(), "query captures");
        Ok(json!({ "captures": captures }))
    }
}

impl Engine for TreeSitterEngine {
    fn package(&self) -> &str {
        self.package
    }

    fn version(&self) -> Option<&str> {
        self.version
    }

    fn parse(&self, code: &str, options: &Value) -> Result<Value, Diagnostic> {
        let options = ShapeOptions::from_value(options)?;
        let tree = self.parse_tree(code)?;

        if options.strict {
            if let Some(diagnostic) = shape::first_error(&tree, code) {
                return Err(diagnostic);
            }
        }

        shape::convert(&tree, code, self.shape, &options)
    }

    fn entry_points(&self) -> &[&'static str] {
        &[QUERY_ENTRY]
    }

    fn invoke(&self, entry: &str, code: &str, options: &Value) -> Result<Value, Diagnostic> {
        match entry {
            QUERY_ENTRY => self.query(code, options),
            other => Err(Diagnostic::new(format!(
                "{} has no entry point `{}`",
                self.package, other
            ))),
        }
    }
}
