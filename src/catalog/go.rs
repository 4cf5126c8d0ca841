//! Go parser

use super::bundled;
use crate::adapter::{LanguageOption, ParserAdapter};
use crate::engine::TreeShape;
use crate::location::LocationStrategy;
use crate::options::OptionsDescriptor;
use crate::version::{EmbeddedManifest, VersionSource};
use serde_json::json;
use std::sync::Arc;

pub const GO_ID: &str = "tree-sitter-go";

const PACKAGE: &str = "tree-sitter-go";
const MANIFEST: &str = r#"{ "name": "tree-sitter-go", "version": "0.23" }"#;

const TEMPLATE: &str = r#"package main

import "fmt"

type Shape interface {
	Area() float64
}

type Square struct{ Side float64 }

func (s Square) Area() float64 { return s.Side * s.Side }

func main() {
	fmt.Println(Square{Side: 2}.Area())
}
"#;

pub fn go_estree() -> ParserAdapter {
    ParserAdapter::new(
        GO_ID,
        "tree-sitter-go",
        "go",
        PACKAGE,
        bundled(PACKAGE, None, || tree_sitter_go::LANGUAGE.into(), TreeShape::Estree),
    )
    .with_icon("i-vscode-icons:file-type-go")
    .with_link("https://github.com/tree-sitter/tree-sitter-go")
    .with_options(OptionsDescriptor::configurable(json!({ "strict": false })))
    .with_version_source(VersionSource::Metadata(Arc::new(EmbeddedManifest::new(MANIFEST))))
    .with_location(LocationStrategy::offsets())
}

pub fn language() -> LanguageOption {
    LanguageOption::new("go", "Go")
        .with_icon("i-vscode-icons:file-type-go")
        .with_extensions(&["go"])
        .with_parser(go_estree())
        .with_code_template(TEMPLATE)
}
