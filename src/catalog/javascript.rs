//! JavaScript and TypeScript parsers

use super::{bundled, GRAMMAR_SERIES};
use crate::adapter::{LanguageOption, ParserAdapter};
use crate::engine::grammar::QUERY_ENTRY;
use crate::engine::TreeShape;
use crate::location::LocationStrategy;
use crate::options::OptionsDescriptor;
use crate::version::{EmbeddedManifest, VersionSource};
use serde_json::json;
use std::sync::Arc;

pub const JAVASCRIPT_ID: &str = "tree-sitter-javascript";
pub const JAVASCRIPT_QUERY_ID: &str = "tree-sitter-javascript-query";
pub const TYPESCRIPT_ID: &str = "tree-sitter-typescript";

const JS_PACKAGE: &str = "tree-sitter-javascript";
const TS_PACKAGE: &str = "tree-sitter-typescript";
const TS_MANIFEST: &str = r#"{ "name": "tree-sitter-typescript", "version": "0.23" }"#;

const JS_TEMPLATE: &str = r#"import { readFile } from 'node:fs/promises'

export async function loadConfig(path) {
  const text = await readFile(path, 'utf8')
  return JSON.parse(text)
}

const greet = (name = 'world') => `Hello, ${name}!`
console.log(greet())
"#;

const TS_TEMPLATE: &str = r#"interface User {
  id: number
  name: string
  email?: string
}

export function displayName(user: User): string {
  return user.email ? `${user.name} <${user.email}>` : user.name
}

type Handler<T> = (event: T) => void
"#;

/// ESTree-shaped JavaScript trees with `start`/`end` offsets
pub fn javascript_estree() -> ParserAdapter {
    ParserAdapter::new(
        JAVASCRIPT_ID,
        "tree-sitter-javascript",
        "javascript",
        JS_PACKAGE,
        bundled(JS_PACKAGE, Some(GRAMMAR_SERIES), || tree_sitter_javascript::LANGUAGE.into(), TreeShape::Estree),
    )
    .with_icon("i-vscode-icons:file-type-js-official")
    .with_link("https://github.com/tree-sitter/tree-sitter-javascript")
    .with_options(OptionsDescriptor::configurable(json!({
        "sourceType": "module",
        "loc": true,
        "strict": true,
    })))
    .with_location(LocationStrategy::offsets())
}

/// Two-phase variant: parse, then run a tree-sitter query over the same input
pub fn javascript_query() -> ParserAdapter {
    query_variant(&javascript_estree())
}

fn query_variant(base: &ParserAdapter) -> ParserAdapter {
    base.derive(JAVASCRIPT_QUERY_ID, "tree-sitter-javascript (query)")
        // queries are written against the bundled grammar's node names
        .with_version_overridable(false)
        .with_options(OptionsDescriptor::configurable(json!({
            "parse": { "strict": false },
            "query": { "source": "(function_declaration name: (identifier) @function.name)" },
        })))
        .with_parse(|engine, code, options| {
            let mut tree = engine.parse(code, &options["parse"])?;
            let compiled = engine.invoke(QUERY_ENTRY, code, &options["query"])?;
            tree["captures"] = compiled["captures"].clone();
            Ok(tree)
        })
}

/// TypeScript trees located by their `range` tuple
pub fn typescript_estree() -> ParserAdapter {
    ParserAdapter::new(
        TYPESCRIPT_ID,
        "tree-sitter-typescript",
        "typescript",
        TS_PACKAGE,
        bundled(
            TS_PACKAGE,
            None,
            || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            TreeShape::Estree,
        ),
    )
    .with_icon("i-vscode-icons:file-type-typescript-official")
    .with_link("https://github.com/tree-sitter/tree-sitter-typescript")
    .with_options(OptionsDescriptor::configurable(json!({
        "sourceType": "module",
        "range": true,
    })))
    .with_version_source(VersionSource::EngineOrMetadata(Arc::new(EmbeddedManifest::new(
        TS_MANIFEST,
    ))))
    .with_location(LocationStrategy::tuple("range"))
}

pub fn javascript() -> LanguageOption {
    // the query variant shares the estree adapter's engine handle
    let estree = javascript_estree();
    let query = query_variant(&estree);

    LanguageOption::new("javascript", "JavaScript")
        .with_icon("i-vscode-icons:file-type-js-official")
        .with_extensions(&["js", "mjs", "cjs", "jsx"])
        .with_parser(estree)
        .with_parser(query)
        .with_code_template(JS_TEMPLATE)
}

pub fn typescript() -> LanguageOption {
    LanguageOption::new("typescript", "TypeScript")
        .with_icon("i-vscode-icons:file-type-typescript-official")
        .with_extensions(&["ts", "mts", "cts"])
        .with_parser(typescript_estree())
        .with_code_template(TS_TEMPLATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Parser;
    use crate::location::Location;
    use crate::options::OptionsValue;
    use crate::Error;

    #[tokio::test]
    async fn test_estree_offsets() {
        let adapter = javascript_estree();
        let tree = adapter.parse("let answer = 42;", None).await.unwrap();
        let declaration = &tree["children"][0];
        assert_eq!(declaration["type"], "lexical_declaration");
        assert_eq!(
            adapter.location(declaration).unwrap(),
            Some(Location::Offsets { start: 0, end: 16 })
        );
        assert!(declaration["loc"].is_object());
    }

    #[tokio::test]
    async fn test_strict_by_default() {
        let adapter = javascript_estree();
        let err = adapter.parse("let = ;", None).await.unwrap_err();
        assert!(err.is_parse_error());

        let lenient = OptionsValue::from_value(json!({ "strict": false })).unwrap();
        assert!(adapter.parse("let = ;", Some(&lenient)).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_variant() {
        let adapter = javascript_query();
        let tree = adapter
            .parse("function alpha() {}\nfunction beta() {}", None)
            .await
            .unwrap();
        let names: Vec<_> = tree["captures"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["text"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["alpha", "beta"]);
        assert_eq!(tree["type"], "program");
    }

    #[tokio::test]
    async fn test_query_variant_rejects_bad_query() {
        let adapter = javascript_query();
        let user = OptionsValue::from_value(json!({ "query": { "source": "(((" } })).unwrap();
        let err = adapter.parse("x", Some(&user)).await.unwrap_err();
        assert!(matches!(err, Error::EngineParse { .. }));
    }

    #[tokio::test]
    async fn test_query_variant_shares_engine() {
        let estree = javascript_estree();
        let query = query_variant(&estree);

        query.parse("function f() {}", None).await.unwrap();
        estree.parse("f()", None).await.unwrap();
        assert_eq!(estree.loader().acquisitions(), 1);
        assert_eq!(query.id(), JAVASCRIPT_QUERY_ID);
        assert_eq!(query.label(), "tree-sitter-javascript (query)");
    }

    #[tokio::test]
    async fn test_release_selection() {
        let estree = javascript_estree();
        let query = query_variant(&estree);

        assert!(estree.version_overridable());
        assert!(estree.parse_at("f()", None, Some(GRAMMAR_SERIES)).await.is_ok());
        assert!(matches!(
            estree.parse_at("f()", None, Some("0.20.0")).await,
            Err(Error::EngineLoad { .. })
        ));

        assert!(!query.version_overridable());
        assert!(matches!(
            query.parse_at("f()", None, Some(GRAMMAR_SERIES)).await,
            Err(Error::VersionNotOverridable { .. })
        ));
    }

    #[tokio::test]
    async fn test_typescript_range() {
        let adapter = typescript_estree();
        let tree = adapter.parse("let x: number = 1;", None).await.unwrap();
        assert_eq!(tree["range"], json!([0, 18]));
        assert_eq!(adapter.location(&tree).unwrap(), Some(Location::Offsets { start: 0, end: 18 }));

        let no_range = OptionsValue::from_value(json!({ "range": false })).unwrap();
        let tree = adapter.parse("let x = 1;", Some(&no_range)).await.unwrap();
        assert_eq!(adapter.location(&tree).unwrap(), None);
    }

    #[tokio::test]
    async fn test_typescript_version_falls_back_to_manifest() {
        let adapter = typescript_estree();
        assert_eq!(adapter.version().await.unwrap(), "tree-sitter-typescript@0.23");
        assert_eq!(adapter.loader().acquisitions(), 1);
    }
}
