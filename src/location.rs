//! Location Resolver
//!
//! Extracts a source range from a tree node whose shape is owned by a
//! third-party engine. Each adapter declares one [`LocationStrategy`] when it
//! is defined; resolution never fails loudly, a node without usable location
//! data simply resolves to `None`.

use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;

/// A resolved source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Location {
    /// Character offsets into the source text, end exclusive
    Offsets { start: usize, end: usize },
    /// Line/column pair as reported by the engine
    #[serde(rename_all = "camelCase")]
    LineColumn {
        start_line: usize,
        start_column: usize,
        end_line: usize,
        end_column: usize,
    },
}

impl Location {
    /// The offset range, if this location carries one
    pub fn offsets(&self) -> Option<(usize, usize)> {
        match *self {
            Location::Offsets { start, end } => Some((start, end)),
            Location::LineColumn { .. } => None,
        }
    }

    /// The source text this location covers. Lines are 1-based and columns
    /// 0-based, both counted in characters.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        let (start, end) = match *self {
            Location::Offsets { start, end } => (start, end),
            Location::LineColumn { start_line, start_column, end_line, end_column } => (
                char_offset(source, start_line, start_column)?,
                char_offset(source, end_line, end_column)?,
            ),
        };
        if end < start {
            return None;
        }
        let byte = |offset: usize| {
            source
                .char_indices()
                .map(|(index, _)| index)
                .chain(std::iter::once(source.len()))
                .nth(offset)
        };
        source.get(byte(start)?..byte(end)?)
    }
}

fn char_offset(source: &str, line: usize, column: usize) -> Option<usize> {
    let mut offset = 0;
    for (index, text) in source.split('\n').enumerate() {
        let width = text.chars().count();
        if index + 1 == line {
            return (column <= width).then_some(offset + column);
        }
        offset += width + 1;
    }
    None
}

/// Where the two offsets live on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OffsetFields {
    /// Two sibling numeric fields, e.g. `start` / `end`
    Pair {
        start: Cow<'static, str>,
        end: Cow<'static, str>,
    },
    /// One field holding a `[start, end]` tuple, e.g. `range`
    Tuple(Cow<'static, str>),
}

impl Default for OffsetFields {
    fn default() -> Self {
        OffsetFields::Pair {
            start: Cow::Borrowed("start"),
            end: Cow::Borrowed("end"),
        }
    }
}

/// Shape of the start/end points inside a structured location object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointShape {
    /// `{ line, column }`
    LineColumn,
    /// A flat offset member, e.g. `{ offset }`
    Offset(Cow<'static, str>),
}

/// Key path to a nested location object.
///
/// `container` is a dotted path from the node to the object holding the two
/// points (usually `loc`). Engine families share one of the presets below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredPath {
    pub container: Cow<'static, str>,
    pub start: Cow<'static, str>,
    pub end: Cow<'static, str>,
    pub point: PointShape,
}

impl StructuredPath {
    /// ESTree `loc.start.{line,column}` / `loc.end.{line,column}`
    pub const fn estree_loc() -> Self {
        Self {
            container: Cow::Borrowed("loc"),
            start: Cow::Borrowed("start"),
            end: Cow::Borrowed("end"),
            point: PointShape::LineColumn,
        }
    }

    /// `loc.start.offset` / `loc.end.offset`, shared by the css-tree and cst shapes
    pub const fn loc_offset() -> Self {
        Self {
            container: Cow::Borrowed("loc"),
            start: Cow::Borrowed("start"),
            end: Cow::Borrowed("end"),
            point: PointShape::Offset(Cow::Borrowed("offset")),
        }
    }
}

/// The per-adapter rule for locating a node in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationStrategy {
    Offsets(OffsetFields),
    Structured(StructuredPath),
}

impl LocationStrategy {
    /// Default `start` / `end` offset pair
    pub fn offsets() -> Self {
        LocationStrategy::Offsets(OffsetFields::default())
    }

    /// Offset pair read from custom field names
    pub fn offset_pair(start: &'static str, end: &'static str) -> Self {
        LocationStrategy::Offsets(OffsetFields::Pair {
            start: Cow::Borrowed(start),
            end: Cow::Borrowed(end),
        })
    }

    /// Offsets stored as a `[start, end]` tuple under `field`
    pub fn tuple(field: &'static str) -> Self {
        LocationStrategy::Offsets(OffsetFields::Tuple(Cow::Borrowed(field)))
    }

    pub fn structured(path: StructuredPath) -> Self {
        LocationStrategy::Structured(path)
    }

    /// Resolve `node` under this strategy
    pub fn resolve(&self, node: &Value) -> Option<Location> {
        resolve(self, node)
    }
}

/// Resolve the source range of `node`, or `None` when it carries no usable
/// location data.
pub fn resolve(strategy: &LocationStrategy, node: &Value) -> Option<Location> {
    let node = node.as_object()?;
    match strategy {
        LocationStrategy::Offsets(OffsetFields::Pair { start, end }) => {
            let start = as_offset(node.get(start.as_ref())?)?;
            let end = as_offset(node.get(end.as_ref())?)?;
            offsets(start, end)
        }
        LocationStrategy::Offsets(OffsetFields::Tuple(field)) => {
            match node.get(field.as_ref())?.as_array()?.as_slice() {
                [start, end] => offsets(as_offset(start)?, as_offset(end)?),
                _ => None,
            }
        }
        LocationStrategy::Structured(path) => {
            let container = lookup(node.get(first_segment(&path.container))?, &path.container)?;
            let start = container.get(path.start.as_ref())?;
            let end = container.get(path.end.as_ref())?;
            match &path.point {
                PointShape::Offset(field) => offsets(
                    as_offset(start.get(field.as_ref())?)?,
                    as_offset(end.get(field.as_ref())?)?,
                ),
                PointShape::LineColumn => {
                    let (start_line, start_column) = line_column(start)?;
                    let (end_line, end_column) = line_column(end)?;
                    if (end_line, end_column) < (start_line, start_column) {
                        return None;
                    }
                    Some(Location::LineColumn {
                        start_line,
                        start_column,
                        end_line,
                        end_column,
                    })
                }
            }
        }
    }
}

fn first_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Walk the remaining segments of a dotted path, starting from the value of
/// its first segment.
fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .skip(1)
        .try_fold(root, |value, segment| value.get(segment))
}

fn offsets(start: usize, end: usize) -> Option<Location> {
    (start <= end).then_some(Location::Offsets { start, end })
}

fn line_column(point: &Value) -> Option<(usize, usize)> {
    Some((as_offset(point.get("line")?)?, as_offset(point.get("column")?)?))
}

/// Accepts non-negative integers, including integral floats such as `5.0`.
fn as_offset(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    let f = value.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 {
        Some(f as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slice() {
        let source = "let é = 1;\nfoo()";
        assert_eq!(Location::Offsets { start: 4, end: 5 }.slice(source), Some("é"));
        assert_eq!(Location::Offsets { start: 11, end: 16 }.slice(source), Some("foo()"));
        assert_eq!(Location::Offsets { start: 11, end: 99 }.slice(source), None);

        let loc = Location::LineColumn { start_line: 1, start_column: 4, end_line: 2, end_column: 3 };
        assert_eq!(loc.slice(source), Some("é = 1;\nfoo"));
        let loc = Location::LineColumn { start_line: 3, start_column: 0, end_line: 3, end_column: 1 };
        assert_eq!(loc.slice(source), None);
    }

    #[test]
    fn test_offset_pair() {
        let node = json!({ "type": "Identifier", "start": 5, "end": 12 });
        assert_eq!(
            LocationStrategy::offsets().resolve(&node),
            Some(Location::Offsets { start: 5, end: 12 })
        );
    }

    #[test]
    fn test_offset_pair_missing_end_is_soft() {
        let node = json!({ "start": 5 });
        assert_eq!(LocationStrategy::offsets().resolve(&node), None);

        let node = json!({ "start": 5, "end": "12" });
        assert_eq!(LocationStrategy::offsets().resolve(&node), None);

        let node = json!({ "start": -1, "end": 3 });
        assert_eq!(LocationStrategy::offsets().resolve(&node), None);
    }

    #[test]
    fn test_custom_pair_and_float_offsets() {
        let strategy = LocationStrategy::offset_pair("from", "to");
        let node = json!({ "from": 2.0, "to": 4 });
        assert_eq!(strategy.resolve(&node), Some(Location::Offsets { start: 2, end: 4 }));

        let node = json!({ "from": 2.5, "to": 4 });
        assert_eq!(strategy.resolve(&node), None);
    }

    #[test]
    fn test_range_tuple() {
        let strategy = LocationStrategy::tuple("range");
        assert_eq!(
            strategy.resolve(&json!({ "range": [0, 7] })),
            Some(Location::Offsets { start: 0, end: 7 })
        );
        assert_eq!(strategy.resolve(&json!({ "range": [0] })), None);
        assert_eq!(strategy.resolve(&json!({ "range": [9, 7] })), None);
        assert_eq!(strategy.resolve(&json!({ "start": 0, "end": 7 })), None);
    }

    #[test]
    fn test_structured_offset() {
        let strategy = LocationStrategy::structured(StructuredPath::loc_offset());
        let node = json!({
            "type": "StyleSheet",
            "loc": {
                "start": { "offset": 0, "line": 1, "column": 1 },
                "end": { "offset": 12, "line": 1, "column": 13 }
            }
        });
        assert_eq!(strategy.resolve(&node), Some(Location::Offsets { start: 0, end: 12 }));
        assert_eq!(strategy.resolve(&json!({ "type": "StyleSheet" })), None);
        assert_eq!(strategy.resolve(&json!({ "loc": null })), None);
    }

    #[test]
    fn test_structured_line_column() {
        let strategy = LocationStrategy::structured(StructuredPath::estree_loc());
        let node = json!({
            "loc": {
                "start": { "line": 1, "column": 0 },
                "end": { "line": 3, "column": 1 }
            }
        });
        assert_eq!(
            strategy.resolve(&node),
            Some(Location::LineColumn {
                start_line: 1,
                start_column: 0,
                end_line: 3,
                end_column: 1
            })
        );
    }

    #[test]
    fn test_nested_container_path() {
        let strategy = LocationStrategy::structured(StructuredPath {
            container: Cow::Borrowed("meta.span"),
            start: Cow::Borrowed("lo"),
            end: Cow::Borrowed("hi"),
            point: PointShape::Offset(Cow::Borrowed("pos")),
        });
        let node = json!({ "meta": { "span": { "lo": { "pos": 3 }, "hi": { "pos": 8 } } } });
        assert_eq!(strategy.resolve(&node), Some(Location::Offsets { start: 3, end: 8 }));
    }

    #[test]
    fn test_non_object_nodes() {
        for node in [json!(null), json!(3), json!("start"), json!([1, 2])] {
            assert_eq!(LocationStrategy::offsets().resolve(&node), None);
        }
    }

    #[test]
    fn test_serialized_form() {
        let loc = Location::LineColumn { start_line: 1, start_column: 2, end_line: 3, end_column: 4 };
        assert_eq!(
            serde_json::to_value(loc).unwrap(),
            json!({ "startLine": 1, "startColumn": 2, "endLine": 3, "endColumn": 4 })
        );
        let loc = Location::Offsets { start: 0, end: 12 };
        assert_eq!(serde_json::to_value(loc).unwrap(), json!({ "start": 0, "end": 12 }));
    }
}
