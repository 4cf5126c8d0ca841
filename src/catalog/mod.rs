//! Built-in catalog
//!
//! Concrete languages and parsers. Each entry is configuration over the
//! adapter framework: an engine source, an options descriptor and the
//! location strategy matching the engine's tree shape.

pub mod css;
pub mod go;
pub mod javascript;
pub mod python;
pub mod rust;

use crate::adapter::LanguageOption;
use crate::engine::{EngineHandle, TreeShape, TreeSitterEngine};
use crate::loader::BundledSource;
use serde_json::Value;
use std::sync::Arc;
use tree_sitter::Language;

/// Release series every bundled grammar is pinned to in `Cargo.toml`.
///
/// Grammars report this as their version; patch releases within the series
/// are not distinguished. Embedded manifests carry the same value.
pub const GRAMMAR_SERIES: &str = "0.23";

/// All built-in languages in presentation order
pub fn languages() -> Vec<LanguageOption> {
    vec![
        css::language(),
        javascript::javascript(),
        javascript::typescript(),
        python::language(),
        rust::language(),
        go::language(),
    ]
}

/// Source for a bundled tree-sitter engine. The grammar is only turned into
/// an engine when the loader first asks for it.
pub(crate) fn bundled<L>(
    package: &'static str,
    version: Option<&'static str>,
    language: L,
    shape: TreeShape,
) -> BundledSource<impl Fn() -> anyhow::Result<EngineHandle> + Send + Sync>
where
    L: Fn() -> Language + Send + Sync,
{
    BundledSource::new(package, move || {
        let engine = TreeSitterEngine::new(package, language(), shape);
        let engine = match version {
            Some(version) => engine.with_version(version),
            None => engine,
        };
        Ok(Arc::new(engine) as EngineHandle)
    })
}

/// Title hook for cst trees: decodes the numeric `type` into its kind name
pub(crate) fn kind_title(language: Language) -> impl Fn(&Value) -> Option<String> + Send + Sync + 'static {
    move |node| kind_name(&language, node.get("type")?).map(str::to_string)
}

/// Value hook for cst trees: annotates numeric kind ids
pub(crate) fn kind_hint(language: Language) -> impl Fn(&str, &Value) -> Option<String> + Send + Sync + 'static {
    move |key, value| match key {
        "type" => kind_name(&language, value).map(|kind| format!("NodeKind.{}", kind)),
        _ => None,
    }
}

fn kind_name(language: &Language, value: &Value) -> Option<&'static str> {
    let id = u16::try_from(value.as_u64()?).ok()?;
    if usize::from(id) >= language.node_kind_count() {
        return None;
    }
    language.node_kind_for_id(id)
}
