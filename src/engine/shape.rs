//! Tree shapes
//!
//! Converts a tree-sitter syntax tree into a JSON tree. Each shape lays out
//! node kinds and positions the way a different family of engines does, so
//! the tree handed to the host is genuinely engine-specific:
//!
//! - `Estree`: `{type, start, end}`, optional `loc` (line/column) and `range`
//! - `CssTree`: `{type}`, `loc` with offsets only when `positions` is enabled
//! - `Cst`: numeric `type` ids with an always-present offset `loc`

use super::Diagnostic;
use serde_json::{Map, Value, json};
use tree_sitter::{Node, Point, Tree, TreeCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeShape {
    Estree,
    CssTree,
    Cst,
}

impl TreeShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeShape::Estree => "estree",
            TreeShape::CssTree => "css-tree",
            TreeShape::Cst => "cst",
        }
    }
}

/// Engine options understood by every shape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeOptions {
    pub include_anonymous: bool,
    pub strict: bool,
    /// ESTree `loc` objects
    pub loc: bool,
    /// ESTree `range` tuples
    pub range: bool,
    /// css-tree `loc` objects
    pub positions: bool,
    /// css-tree `loc.source`
    pub source: Option<String>,
}

impl ShapeOptions {
    /// Read options from a merged options object. Unknown keys are ignored;
    /// known keys with the wrong type are rejected.
    pub fn from_value(options: &Value) -> Result<Self, Diagnostic> {
        let map = match options {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(Diagnostic::new(format!(
                    "options must be an object, got {}",
                    type_name(other)
                )));
            }
        };

        let source = match map.get("source") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => return Err(mistyped("source", "string", other)),
        };

        Ok(Self {
            include_anonymous: flag(map, "includeAnonymous")?,
            strict: flag(map, "strict")?,
            loc: flag(map, "loc")?,
            range: flag(map, "range")?,
            positions: flag(map, "positions")?,
            source,
        })
    }
}

fn flag(map: &Map<String, Value>, key: &str) -> Result<bool, Diagnostic> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(mistyped(key, "boolean", other)),
    }
}

fn mistyped(key: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::new(format!(
        "invalid option `{}`: expected {}, got {}",
        key,
        expected,
        type_name(got)
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Maps tree-sitter byte positions to character offsets and columns
pub struct CharIndex<'a> {
    source: &'a str,
    /// Character index per byte; empty when the source is ASCII
    chars: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let chars = if source.is_ascii() {
            Vec::new()
        } else {
            let mut chars = Vec::with_capacity(source.len() + 1);
            for (i, ch) in source.chars().enumerate() {
                chars.extend(std::iter::repeat_n(i, ch.len_utf8()));
            }
            chars.push(source.chars().count());
            chars
        };
        Self { source, chars }
    }

    /// Character offset of a byte offset
    pub fn offset(&self, byte: usize) -> usize {
        if self.chars.is_empty() {
            byte.min(self.source.len())
        } else {
            self.chars[byte.min(self.chars.len() - 1)]
        }
    }

    /// 0-based character column of a tree-sitter point at `byte`
    pub fn column(&self, byte: usize, point: Point) -> usize {
        let line_start = byte.saturating_sub(point.column);
        self.offset(byte) - self.offset(line_start)
    }
}

/// Deepest node nesting a converted tree may have. Hosts walk, serialize and
/// drop the JSON tree recursively, so deeper input is reported instead.
pub const MAX_DEPTH: usize = 1024;

/// Convert a whole tree
pub fn convert(tree: &Tree, source: &str, shape: TreeShape, options: &ShapeOptions) -> Result<Value, Diagnostic> {
    let index = CharIndex::new(source);
    let converter = Converter {
        source,
        index: &index,
        shape,
        options,
    };
    converter.tree(tree)
}

struct Converter<'a> {
    source: &'a str,
    index: &'a CharIndex<'a>,
    shape: TreeShape,
    options: &'a ShapeOptions,
}

/// A node whose children are still being converted
struct Frame<'tree> {
    node: Node<'tree>,
    out: Map<String, Value>,
    children: Vec<Value>,
}

impl Converter<'_> {
    /// Depth-first walk with an explicit stack; the cursor always sits on
    /// the node of the top frame or one of its children.
    fn tree(&self, tree: &Tree) -> Result<Value, Diagnostic> {
        let mut cursor = tree.walk();
        let mut stack = vec![self.open(cursor.node(), None)];

        loop {
            if cursor.goto_first_child() {
                if self.seek_kept(&mut cursor) {
                    self.push(&mut stack, &cursor)?;
                    continue;
                }
                cursor.goto_parent();
            }

            // the top frame is complete; close frames until a sibling is left
            loop {
                let Some(frame) = stack.pop() else {
                    return Err(Diagnostic::new("empty syntax tree"));
                };
                let value = self.close(frame);
                let Some(parent) = stack.last_mut() else {
                    return Ok(value);
                };
                parent.children.push(value);

                if cursor.goto_next_sibling() && self.seek_kept(&mut cursor) {
                    self.push(&mut stack, &cursor)?;
                    break;
                }
                cursor.goto_parent();
            }
        }
    }

    fn kept(&self, node: Node) -> bool {
        node.is_named() || self.options.include_anonymous
    }

    /// Move to the first kept node among the cursor's current and following
    /// siblings
    fn seek_kept(&self, cursor: &mut TreeCursor) -> bool {
        loop {
            if self.kept(cursor.node()) {
                return true;
            }
            if !cursor.goto_next_sibling() {
                return false;
            }
        }
    }

    fn push<'tree>(&self, stack: &mut Vec<Frame<'tree>>, cursor: &TreeCursor<'tree>) -> Result<(), Diagnostic> {
        let node = cursor.node();
        if stack.len() >= MAX_DEPTH {
            let point = node.start_position();
            return Err(Diagnostic::new(format!("tree nesting exceeds {} levels", MAX_DEPTH)).at(
                point.row + 1,
                self.index.column(node.start_byte(), point) + 1,
                self.index.offset(node.start_byte()),
            ));
        }
        stack.push(self.open(node, cursor.field_name()));
        Ok(())
    }

    fn open<'tree>(&self, node: Node<'tree>, field: Option<&'static str>) -> Frame<'tree> {
        let mut out = Map::new();

        match self.shape {
            TreeShape::Estree => {
                let (start, end) = self.offsets(node);
                out.insert("type".into(), json!(node.kind()));
                out.insert("start".into(), json!(start));
                out.insert("end".into(), json!(end));
                if self.options.loc {
                    out.insert(
                        "loc".into(),
                        json!({
                            "start": self.line_column(node.start_byte(), node.start_position(), 0),
                            "end": self.line_column(node.end_byte(), node.end_position(), 0),
                        }),
                    );
                }
                if self.options.range {
                    out.insert("range".into(), json!([start, end]));
                }
            }
            TreeShape::CssTree => {
                out.insert("type".into(), json!(node.kind()));
                if self.options.positions {
                    out.insert(
                        "loc".into(),
                        json!({
                            "source": self.options.source.as_deref().unwrap_or("<unknown>"),
                            "start": self.point(node.start_byte(), node.start_position(), 1),
                            "end": self.point(node.end_byte(), node.end_position(), 1),
                        }),
                    );
                }
            }
            TreeShape::Cst => {
                out.insert("type".into(), json!(node.kind_id()));
                out.insert("named".into(), json!(node.is_named()));
                out.insert(
                    "loc".into(),
                    json!({
                        "start": self.point(node.start_byte(), node.start_position(), 0),
                        "end": self.point(node.end_byte(), node.end_position(), 0),
                    }),
                );
            }
        }

        if let Some(field) = field {
            out.insert("field".into(), json!(field));
        }

        Frame { node, out, children: Vec::new() }
    }

    fn close(&self, frame: Frame<'_>) -> Value {
        let Frame { node, mut out, children } = frame;
        if children.is_empty() {
            if node.is_named() || self.shape == TreeShape::Cst {
                let text = self.source.get(node.byte_range()).unwrap_or_default();
                let key = if self.shape == TreeShape::CssTree { "value" } else { "text" };
                out.insert(key.into(), json!(text));
            }
        } else {
            out.insert("children".into(), Value::Array(children));
        }
        Value::Object(out)
    }

    fn offsets(&self, node: Node) -> (usize, usize) {
        (self.index.offset(node.start_byte()), self.index.offset(node.end_byte()))
    }

    fn line_column(&self, byte: usize, point: Point, column_base: usize) -> Value {
        json!({
            "line": point.row + 1,
            "column": self.index.column(byte, point) + column_base,
        })
    }

    fn point(&self, byte: usize, point: Point, column_base: usize) -> Value {
        json!({
            "offset": self.index.offset(byte),
            "line": point.row + 1,
            "column": self.index.column(byte, point) + column_base,
        })
    }
}

/// First error or missing node in document order, as a diagnostic
pub fn first_error(tree: &Tree, source: &str) -> Option<Diagnostic> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }
    let node = find_error(root)?;
    let index = CharIndex::new(source);
    let point = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text = source.get(node.byte_range()).unwrap_or_default();
        match text.chars().next() {
            Some(ch) => format!("unexpected token `{}`", ch),
            None => "unexpected end of input".to_string(),
        }
    };
    Some(Diagnostic::new(message).at(
        point.row + 1,
        index.column(node.start_byte(), point) + 1,
        index.offset(node.start_byte()),
    ))
}

/// Pre-order search that only descends into subtrees containing an error
fn find_error(root: Node) -> Option<Node> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(language: tree_sitter::Language, code: &str) -> Tree {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&language).unwrap();
        parser.parse(code, None).unwrap()
    }

    fn css(code: &str) -> Tree {
        parse(tree_sitter_css::LANGUAGE.into(), code)
    }

    #[test]
    fn test_options_from_value() {
        let opts = ShapeOptions::from_value(&json!({ "positions": true, "sourceType": "module" })).unwrap();
        assert!(opts.positions);
        assert!(!opts.loc);

        let err = ShapeOptions::from_value(&json!({ "positions": "yes" })).unwrap_err();
        assert_eq!(err.message, "invalid option `positions`: expected boolean, got string");

        assert!(ShapeOptions::from_value(&json!([1])).is_err());
        assert_eq!(ShapeOptions::from_value(&Value::Null).unwrap(), ShapeOptions::default());
    }

    #[test]
    fn test_char_index_non_ascii() {
        let source = "é{a:b}";
        let index = CharIndex::new(source);
        assert_eq!(index.offset(0), 0);
        assert_eq!(index.offset(2), 1);
        assert_eq!(index.offset(source.len()), 6);
    }

    #[test]
    fn test_css_tree_positions() {
        let code = "a{color:red}";
        let options = ShapeOptions { positions: true, ..Default::default() };
        let tree = convert(&css(code), code, TreeShape::CssTree, &options).unwrap();

        assert_eq!(tree["type"], "stylesheet");
        assert_eq!(tree["loc"]["start"]["offset"], 0);
        assert_eq!(tree["loc"]["end"]["offset"], 12);
        assert_eq!(tree["loc"]["start"]["column"], 1);
        assert_eq!(tree["loc"]["source"], "<unknown>");
    }

    #[test]
    fn test_css_tree_without_positions() {
        let code = "a{color:red}";
        let tree = convert(&css(code), code, TreeShape::CssTree, &ShapeOptions::default()).unwrap();
        assert!(tree.get("loc").is_none());
        assert!(tree["children"].is_array());
    }

    #[test]
    fn test_estree_range_and_loc() {
        let code = "let x = 1;\nfoo(x);";
        let tree = parse(tree_sitter_javascript::LANGUAGE.into(), code);
        let options = ShapeOptions { loc: true, range: true, ..Default::default() };
        let out = convert(&tree, code, TreeShape::Estree, &options).unwrap();

        assert_eq!(out["type"], "program");
        assert_eq!(out["start"], 0);
        assert_eq!(out["end"], code.len());
        assert_eq!(out["range"], json!([0, code.len()]));
        let second = &out["children"][1];
        assert_eq!(second["loc"]["start"], json!({ "line": 2, "column": 0 }));
    }

    #[test]
    fn test_anonymous_tokens() {
        let code = "a{}";
        let named = convert(&css(code), code, TreeShape::Estree, &ShapeOptions::default()).unwrap();
        let all = convert(
            &css(code),
            code,
            TreeShape::Estree,
            &ShapeOptions { include_anonymous: true, ..Default::default() },
        ).unwrap();
        fn count(v: &Value) -> usize {
            1 + v["children"].as_array().map_or(0, |c| c.iter().map(count).sum())
        }
        assert!(count(&all) > count(&named));
    }

    #[test]
    fn test_cst_numeric_kinds() {
        let code = "fn main() {}";
        let language: tree_sitter::Language = tree_sitter_rust::LANGUAGE.into();
        let tree = parse(language.clone(), code);
        let out = convert(&tree, code, TreeShape::Cst, &ShapeOptions::default()).unwrap();

        let kind = out["type"].as_u64().unwrap() as u16;
        assert_eq!(language.node_kind_for_id(kind), Some("source_file"));
        assert_eq!(out["loc"]["end"]["offset"], 12);
        assert_eq!(out["named"], true);
    }

    #[test]
    fn test_first_error() {
        let code = "let = ;";
        let tree = parse(tree_sitter_javascript::LANGUAGE.into(), code);
        let diag = first_error(&tree, code).unwrap();
        assert_eq!(diag.line, Some(1));
        assert!(diag.offset.is_some());

        let code = "let a = 1;";
        let tree = parse(tree_sitter_javascript::LANGUAGE.into(), code);
        assert!(first_error(&tree, code).is_none());
    }

    fn nested_array(depth: usize) -> String {
        format!("x = {}1{};", "[".repeat(depth), "]".repeat(depth))
    }

    fn depth(v: &Value) -> usize {
        let mut deepest = 0;
        let mut level = vec![(v, 1)];
        while let Some((node, d)) = level.pop() {
            deepest = deepest.max(d);
            if let Some(children) = node["children"].as_array() {
                level.extend(children.iter().map(|c| (c, d + 1)));
            }
        }
        deepest
    }

    #[test]
    fn test_deep_nesting_is_converted() {
        let code = nested_array(200);
        let tree = parse(tree_sitter_javascript::LANGUAGE.into(), &code);
        let out = convert(&tree, &code, TreeShape::Estree, &ShapeOptions::default()).unwrap();
        assert!(depth(&out) > 200);
        assert_eq!(out["end"], code.len());
    }

    #[test]
    fn test_excessive_nesting_is_a_diagnostic() {
        let code = nested_array(20_000);
        let tree = parse(tree_sitter_javascript::LANGUAGE.into(), &code);
        let err = convert(&tree, &code, TreeShape::Estree, &ShapeOptions::default()).unwrap_err();
        assert_eq!(err.message, format!("tree nesting exceeds {} levels", MAX_DEPTH));
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_first_error_in_deep_tree() {
        let code = format!("x = {}1 +{};", "[".repeat(20_000), "]".repeat(20_000));
        let tree = parse(tree_sitter_javascript::LANGUAGE.into(), &code);
        assert!(first_error(&tree, &code).is_some());
    }
}
