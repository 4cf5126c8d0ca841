//! CSS parsers

use super::{bundled, kind_hint, kind_title, GRAMMAR_SERIES};
use crate::adapter::{LanguageOption, ParserAdapter};
use crate::engine::TreeShape;
use crate::location::{LocationStrategy, StructuredPath};
use crate::options::{OptionsDescriptor, OptionsLanguage};
use crate::version::{EmbeddedManifest, VersionSource};
use serde_json::json;
use std::sync::Arc;

pub const CSS_TREE_ID: &str = "csstree";
pub const CSS_CST_ID: &str = "css-cst";

const PACKAGE: &str = "tree-sitter-css";
const ICON: &str = "i-vscode-icons:file-type-css";
const LINK: &str = "https://github.com/tree-sitter/tree-sitter-css";
const MANIFEST: &str = r#"{ "name": "tree-sitter-css", "version": "0.23" }"#;

const TEMPLATE: &str = r#"@import url("theme.css");

:root {
  --accent: #42b883;
}

.button:hover > span {
  color: var(--accent);
  margin: 0 auto !important;
}

@media (max-width: 600px) {
  .button { display: none; }
}
"#;

/// css-tree shaped trees; `loc` is only emitted with `positions: true`
pub fn css_tree() -> ParserAdapter {
    ParserAdapter::new(
        CSS_TREE_ID,
        "csstree",
        "css",
        PACKAGE,
        bundled(PACKAGE, Some(GRAMMAR_SERIES), || tree_sitter_css::LANGUAGE.into(), TreeShape::CssTree),
    )
    .with_icon(ICON)
    .with_link(LINK)
    .with_options(OptionsDescriptor::configurable(json!({ "positions": true })))
    .with_location(LocationStrategy::structured(StructuredPath::loc_offset()))
}

/// Raw concrete syntax tree with numeric node kinds
pub fn css_cst() -> ParserAdapter {
    let grammar: tree_sitter::Language = tree_sitter_css::LANGUAGE.into();
    ParserAdapter::new(
        CSS_CST_ID,
        "tree-sitter-css (cst)",
        "css",
        PACKAGE,
        bundled(PACKAGE, None, || tree_sitter_css::LANGUAGE.into(), TreeShape::Cst),
    )
    .with_icon(ICON)
    .with_link(LINK)
    .with_options(OptionsDescriptor::source(
        "includeAnonymous = false\n",
        OptionsLanguage::Toml,
    ))
    .with_version_source(VersionSource::Metadata(Arc::new(EmbeddedManifest::new(MANIFEST))))
    .with_node_title(kind_title(grammar.clone()))
    .with_value_hint(kind_hint(grammar))
    .with_location(LocationStrategy::structured(StructuredPath::loc_offset()))
}

pub fn language() -> LanguageOption {
    LanguageOption::new("css", "CSS")
        .with_icon(ICON)
        .with_extensions(&["css"])
        .with_parser(css_tree())
        .with_parser(css_cst())
        .with_code_template(TEMPLATE)
}
