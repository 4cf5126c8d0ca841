use crate::{emit_success, OutputMode, Selection};
use anyhow::Context;
use astlens::config::{default_config_path, write_config, AstlensConfig};
use astlens::ui::{self, Icons};
use astlens::{default_registry, Error, LanguageOption, OptionsValue, Parser};
use owo_colors::OwoColorize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub fn run_languages(output_mode: OutputMode) -> anyhow::Result<()> {
    let registry = default_registry()?;
    let languages = registry.list_languages();

    if output_mode.is_human() {
        ui::header("Languages");
        println!("{}", ui::languages_table(languages));
        return Ok(());
    }

    let data: Vec<Value> = languages
        .iter()
        .map(|language| {
            json!({
                "id": language.id,
                "label": language.label,
                "icon": language.icon,
                "extensions": language.extensions,
                "parsers": language.parsers.iter().map(|parser| json!({
                    "id": parser.id(),
                    "label": parser.label(),
                    "editorLanguage": parser.editor_language(),
                    "link": parser.link(),
                    "options": parser.options(),
                    "capabilities": parser.capabilities(),
                    "versionOverridable": parser.version_overridable(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    emit_success(output_mode, "languages", Value::Array(data))
}

pub async fn run_parse(
    output_mode: OutputMode,
    config: &AstlensConfig,
    file: &Path,
    selection: &Selection,
) -> anyhow::Result<()> {
    let (language, parser) = select(config, Some(file), selection.language.as_deref(), selection.parser.as_deref())?;
    let code = read_source(file).await?;
    let options = user_options(config, parser.as_ref(), selection)?;

    let started = Instant::now();
    let tree = parser
        .parse_at(&code, options.as_ref(), selection.engine_version.as_deref())
        .await?;

    if output_mode.is_human() {
        ui::header(&format!("{} ({})", file.display(), language.label));
        ui::info("Parser", parser.id());
        ui::timing(started.elapsed());
    }
    emit_success(output_mode, "parse", tree)
}

pub async fn run_version(
    output_mode: OutputMode,
    config: &AstlensConfig,
    language: Option<&str>,
    parser: Option<&str>,
    engine_version: Option<&str>,
) -> anyhow::Result<()> {
    let (_, parser) = select(config, None, language, parser)?;
    let version = parser.version_at(engine_version).await?;

    if output_mode.is_human() {
        ui::status(Icons::PACKAGE, parser.id(), &version);
        return Ok(());
    }
    emit_success(output_mode, "version", json!({ "parser": parser.id(), "version": version }))
}

pub async fn run_locate(
    output_mode: OutputMode,
    config: &AstlensConfig,
    file: &Path,
    pointer: &str,
    selection: &Selection,
) -> anyhow::Result<()> {
    let (_, parser) = select(config, Some(file), selection.language.as_deref(), selection.parser.as_deref())?;
    let code = read_source(file).await?;
    let options = user_options(config, parser.as_ref(), selection)?;
    let tree = parser
        .parse_at(&code, options.as_ref(), selection.engine_version.as_deref())
        .await?;

    let node = tree
        .pointer(pointer)
        .with_context(|| format!("no node at {}", pointer))?;
    let title = optional(parser.node_title(node))?.flatten();
    let location = optional(parser.location(node))?.flatten();
    let snippet = location.and_then(|location| location.slice(&code));

    if output_mode.is_human() {
        ui::status(Icons::TREE, "Node", title.as_deref().unwrap_or(pointer));
        match location {
            Some(location) => {
                ui::status(Icons::PIN, "Location", &serde_json::to_string(&location)?);
                if let Some(snippet) = snippet {
                    println!("{}", snippet.style(ui::theme().muted));
                }
            }
            None => ui::warn("node carries no location"),
        }
        return Ok(());
    }

    emit_success(
        output_mode,
        "locate",
        json!({
            "pointer": pointer,
            "title": title,
            "location": location,
            "snippet": snippet,
        }),
    )
}

pub fn run_init(output_mode: OutputMode, path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let config = AstlensConfig {
        log: Some("astlens=info".into()),
        ..Default::default()
    };
    write_config(&path, &config, force)?;

    if output_mode.is_human() {
        ui::success(&format!("Wrote {}", path.display()));
        return Ok(());
    }
    emit_success(output_mode, "init", json!({ "path": path.display().to_string() }))
}

/// Pick a language and parser from flags, the file extension and the config,
/// in that order. Never loads an engine.
fn select(
    config: &AstlensConfig,
    file: Option<&Path>,
    language: Option<&str>,
    parser: Option<&str>,
) -> anyhow::Result<(&'static LanguageOption, Arc<dyn Parser>)> {
    let registry = default_registry()?;

    let language = match language {
        Some(id) => Some(registry.language(id)?),
        None => match parser {
            Some(parser) => {
                let (language, parser) = registry
                    .find_adapter(parser)
                    .with_context(|| format!("Unknown parser {}", parser))?;
                return Ok((language, parser));
            }
            None => file.and_then(|file| registry.language_for_path(file)),
        },
    };
    let language = match (language, config.language.as_deref()) {
        (Some(language), _) => language,
        (None, Some(id)) => registry.language(id)?,
        (None, None) => anyhow::bail!("cannot infer the language; pass --language"),
    };

    let parser = match parser.or(config.parser.as_deref()) {
        Some(id) if language.parser(id).is_some() => registry.get_adapter(&language.id, id)?,
        Some(id) if parser.is_some() => return Err(Error::UnknownParser {
            language: language.id.clone(),
            parser: id.to_string(),
        }
        .into()),
        _ => language
            .default_parser()
            .cloned()
            .with_context(|| format!("{} has no parsers", language.id))?,
    };
    Ok((language, parser))
}

fn user_options(
    config: &AstlensConfig,
    parser: &dyn Parser,
    selection: &Selection,
) -> anyhow::Result<Option<OptionsValue>> {
    if let Some(text) = &selection.options {
        return Ok(Some(OptionsValue::source(text.clone(), selection.options_format.into())));
    }
    match config.options_for(parser.id())? {
        Some(value) => Ok(Some(OptionsValue::from_value(value)?)),
        None => Ok(None),
    }
}

async fn read_source(file: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))
}

/// Treat an unimplemented hook as absent
fn optional<T>(result: astlens::Result<T>) -> astlens::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::UnsupportedOperation { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OptionsFormat;

    fn selection() -> Selection {
        Selection {
            language: None,
            parser: None,
            options: None,
            options_format: OptionsFormat::Json,
            engine_version: None,
        }
    }

    #[test]
    fn test_select_by_extension() {
        let config = AstlensConfig::default();
        let (language, parser) = select(&config, Some(Path::new("a.ts")), None, None).unwrap();
        assert_eq!(language.id, "typescript");
        assert_eq!(parser.id(), "tree-sitter-typescript");
    }

    #[test]
    fn test_select_parser_alone() {
        let config = AstlensConfig::default();
        let (language, parser) = select(&config, None, None, Some("css-cst")).unwrap();
        assert_eq!(language.id, "css");
        assert_eq!(parser.id(), "css-cst");
        assert!(select(&config, None, None, Some("nope")).is_err());
    }

    #[test]
    fn test_select_falls_back_to_config() {
        let config = AstlensConfig {
            language: Some("css".into()),
            parser: Some("css-cst".into()),
            ..Default::default()
        };
        let (language, parser) = select(&config, Some(Path::new("README")), None, None).unwrap();
        assert_eq!(language.id, "css");
        assert_eq!(parser.id(), "css-cst");

        // a configured parser of another language is ignored
        let (_, parser) = select(&config, Some(Path::new("a.py")), None, None).unwrap();
        assert_eq!(parser.id(), "tree-sitter-python");

        assert!(select(&AstlensConfig::default(), Some(Path::new("README")), None, None).is_err());
    }

    #[test]
    fn test_unknown_parser_for_language() {
        let config = AstlensConfig::default();
        let err = select(&config, None, Some("css"), Some("tree-sitter-go")).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::UnknownParser { .. })));
    }

    #[test]
    fn test_user_options_prefer_flag() {
        let mut config = AstlensConfig::default();
        config
            .options
            .insert("csstree".into(), toml::from_str("positions = false").unwrap());
        let (_, parser) = select(&config, None, Some("css"), None).unwrap();

        let from_config = user_options(&config, parser.as_ref(), &selection()).unwrap().unwrap();
        assert_eq!(from_config.evaluate().unwrap()["positions"], false);

        let mut flagged = selection();
        flagged.options = Some("positions = true".into());
        flagged.options_format = OptionsFormat::Toml;
        let from_flag = user_options(&config, parser.as_ref(), &flagged).unwrap().unwrap();
        assert_eq!(from_flag.evaluate().unwrap()["positions"], true);
    }

    #[test]
    fn test_optional_hook() {
        let (_, parser) = select(&AstlensConfig::default(), None, Some("javascript"), None).unwrap();
        assert_eq!(optional(parser.node_title(&json!({}))).unwrap(), None);
    }
}
