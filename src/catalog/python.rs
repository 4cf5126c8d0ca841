//! Python parser

use super::{bundled, GRAMMAR_SERIES};
use crate::adapter::{LanguageOption, ParserAdapter};
use crate::engine::TreeShape;
use crate::location::{LocationStrategy, StructuredPath};
use crate::options::OptionsDescriptor;
use serde_json::json;

pub const PYTHON_ID: &str = "tree-sitter-python";

const PACKAGE: &str = "tree-sitter-python";

const TEMPLATE: &str = r#"from dataclasses import dataclass


@dataclass
class Point:
    x: float
    y: float

    def norm(self) -> float:
        return (self.x ** 2 + self.y ** 2) ** 0.5


print(Point(3, 4).norm())
"#;

/// ESTree-shaped Python trees. Options are fixed: `loc` is always on and the
/// tree is located by line/column.
pub fn python_estree() -> ParserAdapter {
    ParserAdapter::new(
        PYTHON_ID,
        "tree-sitter-python",
        "python",
        PACKAGE,
        bundled(PACKAGE, Some(GRAMMAR_SERIES), || tree_sitter_python::LANGUAGE.into(), TreeShape::Estree),
    )
    .with_icon("i-vscode-icons:file-type-python")
    .with_link("https://github.com/tree-sitter/tree-sitter-python")
    .with_options(OptionsDescriptor::fixed(json!({ "loc": true })))
    .with_node_title(|node| node.get("type")?.as_str().map(str::to_string))
    .with_location(LocationStrategy::structured(StructuredPath::estree_loc()))
}

pub fn language() -> LanguageOption {
    LanguageOption::new("python", "Python")
        .with_icon("i-vscode-icons:file-type-python")
        .with_extensions(&["py", "pyi"])
        .with_parser(python_estree())
        .with_code_template(TEMPLATE)
}
