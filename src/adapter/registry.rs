//! Language option registry
//!
//! A process-wide, read-only table of languages and their parsers. Looking
//! up a language or a parser never touches an engine; engines are acquired
//! only when `parse` or `version` runs.

use super::framework::Parser;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// A named group of parsers that accept the same source language
#[derive(Clone)]
pub struct LanguageOption {
    pub id: String,
    pub label: String,
    pub icon: Option<String>,
    /// File extensions this language is picked for
    pub extensions: Vec<String>,
    pub parsers: Vec<Arc<dyn Parser>>,
    /// Example source shown when the language is first selected
    pub code_template: Option<String>,
}

impl LanguageOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            icon: None,
            extensions: Vec::new(),
            parsers: Vec::new(),
            code_template: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parsers.push(Arc::new(parser));
        self
    }

    pub fn with_code_template(mut self, template: impl Into<String>) -> Self {
        self.code_template = Some(template.into());
        self
    }

    /// Find a parser of this language by id
    pub fn parser(&self, id: &str) -> Option<&Arc<dyn Parser>> {
        self.parsers.iter().find(|p| p.id() == id)
    }

    /// The parser selected when the host has no preference
    pub fn default_parser(&self) -> Option<&Arc<dyn Parser>> {
        self.parsers.first()
    }

    /// Check if this language handles a file
    pub fn can_handle(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
        } else {
            false
        }
    }
}

impl fmt::Debug for LanguageOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageOption")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("extensions", &self.extensions)
            .field("parsers", &self.parsers.iter().map(|p| p.id()).collect::<Vec<_>>())
            .finish()
    }
}

/// Registry of language options
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    languages: Vec<LanguageOption>,
    by_id: HashMap<String, usize>,
}

impl LanguageRegistry {
    /// Build a registry; language ids and parser ids must be unique
    pub fn new(languages: Vec<LanguageOption>) -> Result<Self> {
        let mut by_id = HashMap::new();
        let mut parser_ids = HashSet::new();

        for (index, language) in languages.iter().enumerate() {
            if by_id.insert(language.id.clone(), index).is_some() {
                return Err(Error::DuplicateId(language.id.clone()));
            }
            for parser in &language.parsers {
                if !parser_ids.insert(parser.id().to_string()) {
                    return Err(Error::DuplicateId(parser.id().to_string()));
                }
            }
        }

        Ok(Self { languages, by_id })
    }

    /// All languages in catalog order
    pub fn list_languages(&self) -> &[LanguageOption] {
        &self.languages
    }

    pub fn language(&self, id: &str) -> Result<&LanguageOption> {
        self.by_id
            .get(id)
            .map(|&index| &self.languages[index])
            .ok_or_else(|| Error::UnknownLanguage(id.to_string()))
    }

    /// Look up a parser within a language
    pub fn get_adapter(&self, language_id: &str, adapter_id: &str) -> Result<Arc<dyn Parser>> {
        let language = self.language(language_id)?;
        language
            .parser(adapter_id)
            .cloned()
            .ok_or_else(|| Error::UnknownParser {
                language: language_id.to_string(),
                parser: adapter_id.to_string(),
            })
    }

    /// Look up a parser by id alone, with the language it belongs to
    pub fn find_adapter(&self, adapter_id: &str) -> Option<(&LanguageOption, Arc<dyn Parser>)> {
        self.languages.iter().find_map(|language| {
            language
                .parser(adapter_id)
                .map(|parser| (language, Arc::clone(parser)))
        })
    }

    /// Find the language for a file by extension
    pub fn language_for_path(&self, path: &Path) -> Option<&LanguageOption> {
        self.languages.iter().find(|l| l.can_handle(path))
    }
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

/// The process-wide registry of built-in languages, built on first access
pub fn default_registry() -> Result<&'static LanguageRegistry> {
    if let Some(registry) = REGISTRY.get() {
        return Ok(registry);
    }
    let registry = LanguageRegistry::new(crate::catalog::languages())?;
    Ok(REGISTRY.get_or_init(|| registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::framework::Capabilities;
    use crate::options::{OptionsDescriptor, OptionsValue};
    use async_trait::async_trait;
    use serde_json::Value;

    struct TestParser {
        id: &'static str,
        options: OptionsDescriptor,
    }

    impl TestParser {
        fn new(id: &'static str) -> Self {
            Self { id, options: OptionsDescriptor::default() }
        }
    }

    #[async_trait]
    impl Parser for TestParser {
        fn id(&self) -> &str { self.id }
        fn label(&self) -> &str { self.id }
        fn editor_language(&self) -> &str { "test" }
        fn options(&self) -> &OptionsDescriptor { &self.options }
        fn capabilities(&self) -> Capabilities { Capabilities::default() }
        async fn version_at(&self, _requested: Option<&str>) -> Result<String> {
            Ok(format!("{}@0.0.0", self.id))
        }
        async fn parse_at(&self, _code: &str, _options: Option<&OptionsValue>, _requested: Option<&str>) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn registry() -> LanguageRegistry {
        LanguageRegistry::new(vec![
            LanguageOption::new("test", "Test")
                .with_extensions(&["test"])
                .with_parser(TestParser::new("first"))
                .with_parser(TestParser::new("second")),
            LanguageOption::new("other", "Other").with_parser(TestParser::new("third")),
        ])
        .unwrap()
    }

    #[test]
    fn test_registry() {
        let registry = registry();

        assert!(registry.language_for_path(Path::new("foo.test")).is_some());
        assert!(registry.language_for_path(Path::new("foo.TEST")).is_some());
        assert!(registry.language_for_path(Path::new("foo.other")).is_none());
        assert!(registry.language_for_path(Path::new("Makefile")).is_none());
    }

    #[test]
    fn test_lookups() {
        let registry = registry();
        let ids: Vec<_> = registry.list_languages().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["test", "other"]);

        assert_eq!(registry.get_adapter("test", "second").unwrap().id(), "second");
        assert!(matches!(registry.get_adapter("test", "third"), Err(Error::UnknownParser { .. })));
        assert!(matches!(registry.get_adapter("nope", "first"), Err(Error::UnknownLanguage(_))));

        let (language, parser) = registry.find_adapter("third").unwrap();
        assert_eq!(language.id, "other");
        assert_eq!(parser.id(), "third");

        assert_eq!(registry.language("test").unwrap().default_parser().unwrap().id(), "first");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = LanguageRegistry::new(vec![
            LanguageOption::new("a", "A").with_parser(TestParser::new("same")),
            LanguageOption::new("b", "B").with_parser(TestParser::new("same")),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(id) if id == "same"));

        let err = LanguageRegistry::new(vec![LanguageOption::new("a", "A"), LanguageOption::new("a", "A")])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
    }
}
