//! Rust parser

use super::{bundled, kind_hint, kind_title, GRAMMAR_SERIES};
use crate::adapter::{LanguageOption, ParserAdapter};
use crate::engine::TreeShape;
use crate::location::{LocationStrategy, StructuredPath};
use crate::options::{OptionsDescriptor, OptionsLanguage};
use tree_sitter::Language;

pub const RUST_CST_ID: &str = "rust-cst";

const PACKAGE: &str = "tree-sitter-rust";

const TEMPLATE: &str = r#"use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Counter {
    counts: HashMap<String, usize>,
}

impl Counter {
    pub fn add(&mut self, word: &str) {
        *self.counts.entry(word.to_string()).or_default() += 1;
    }
}
"#;

const DEFAULT_OPTIONS: &str = "# Include punctuation and keywords as nodes\nincludeAnonymous = false\n";

/// Concrete syntax tree with numeric node kinds
pub fn rust_cst() -> ParserAdapter {
    let grammar: Language = tree_sitter_rust::LANGUAGE.into();
    ParserAdapter::new(
        RUST_CST_ID,
        "tree-sitter-rust (cst)",
        "rust",
        PACKAGE,
        bundled(PACKAGE, Some(GRAMMAR_SERIES), || tree_sitter_rust::LANGUAGE.into(), TreeShape::Cst),
    )
    .with_icon("i-vscode-icons:file-type-rust")
    .with_link("https://github.com/tree-sitter/tree-sitter-rust")
    .with_options(OptionsDescriptor::source(DEFAULT_OPTIONS, OptionsLanguage::Toml))
    .with_node_title(kind_title(grammar.clone()))
    .with_value_hint(kind_hint(grammar))
    .with_location(LocationStrategy::structured(StructuredPath::loc_offset()))
}

pub fn language() -> LanguageOption {
    LanguageOption::new("rust", "Rust")
        .with_icon("i-vscode-icons:file-type-rust")
        .with_extensions(&["rs"])
        .with_parser(rust_cst())
        .with_code_template(TEMPLATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Parser;
    use crate::location::Location;
    use crate::options::OptionsValue;

    #[tokio::test]
    async fn test_titles_decode_numeric_kinds() {
        let adapter = rust_cst();
        let tree = adapter.parse("fn main() {}", None).await.unwrap();
        let function = &tree["children"][0];

        assert!(function["type"].is_u64());
        assert_eq!(adapter.node_title(function).unwrap().as_deref(), Some("function_item"));
        assert_eq!(
            adapter.location(function).unwrap(),
            Some(Location::Offsets { start: 0, end: 12 })
        );
    }

    #[tokio::test]
    async fn test_toml_user_options() {
        let adapter = rust_cst();
        let user = OptionsValue::source("includeAnonymous = true", OptionsLanguage::Toml);
        let tree = adapter.parse("fn main() {}", Some(&user)).await.unwrap();
        let function = &tree["children"][0];
        let anonymous = function["children"]
            .as_array()
            .unwrap()
            .iter()
            .any(|child| child["named"] == false);
        assert!(anonymous);
    }
}
