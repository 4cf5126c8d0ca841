//! Option negotiation
//!
//! Every adapter publishes an [`OptionsDescriptor`]: whether the host may
//! edit options, the default value, and the editor language used to present
//! it. User input is merged shallowly over the default, last write wins.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Language an options value is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionsLanguage {
    Json,
    Toml,
}

impl OptionsLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionsLanguage::Json => "json",
            OptionsLanguage::Toml => "toml",
        }
    }
}

impl std::str::FromStr for OptionsLanguage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OptionsLanguage::Json),
            "toml" => Ok(OptionsLanguage::Toml),
            other => Err(Error::InvalidOptions(format!("unknown options language: {}", other))),
        }
    }
}

/// An options value: a raw object, or source text in a declared sub-language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionsValue {
    Object(Map<String, Value>),
    Source { text: String, language: OptionsLanguage },
}

impl OptionsValue {
    pub fn empty() -> Self {
        OptionsValue::Object(Map::new())
    }

    pub fn source(text: impl Into<String>, language: OptionsLanguage) -> Self {
        OptionsValue::Source {
            text: text.into(),
            language,
        }
    }

    /// Build from an arbitrary JSON value; only objects are accepted
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(OptionsValue::Object(map)),
            other => Err(Error::InvalidOptions(format!(
                "options must be an object, got {}",
                other
            ))),
        }
    }

    /// Evaluate to a plain object
    pub fn evaluate(&self) -> Result<Map<String, Value>> {
        match self {
            OptionsValue::Object(map) => Ok(map.clone()),
            OptionsValue::Source { text, language } => {
                if text.trim().is_empty() {
                    return Ok(Map::new());
                }
                let value = match language {
                    OptionsLanguage::Json => serde_json::from_str::<Value>(text)
                        .map_err(|e| Error::InvalidOptions(format!("invalid JSON options: {}", e)))?,
                    OptionsLanguage::Toml => {
                        let table: toml::Table = toml::from_str(text)
                            .map_err(|e| Error::InvalidOptions(format!("invalid TOML options: {}", e)))?;
                        serde_json::to_value(table)?
                    }
                };
                match value {
                    Value::Object(map) => Ok(map),
                    other => Err(Error::InvalidOptions(format!(
                        "options must evaluate to an object, got {}",
                        other
                    ))),
                }
            }
        }
    }
}

impl Default for OptionsValue {
    fn default() -> Self {
        Self::empty()
    }
}

/// How an adapter's options are presented and negotiated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsDescriptor {
    /// Whether the host may supply options at all
    pub configurable: bool,
    pub default_value: OptionsValue,
    /// Editor language for presenting/editing the default
    pub editor_language: OptionsLanguage,
}

impl OptionsDescriptor {
    /// Configurable options with an object default.
    ///
    /// Defaults are catalog data; a non-object default is a programming
    /// error caught in debug builds and treated as `{}` otherwise.
    pub fn configurable(default: Value) -> Self {
        debug_assert!(default.is_object(), "option defaults must be a JSON object, got {}", default);
        let default_value = match default {
            Value::Object(map) => OptionsValue::Object(map),
            _ => OptionsValue::empty(),
        };
        Self {
            configurable: true,
            default_value,
            editor_language: OptionsLanguage::Json,
        }
    }

    /// Fixed options; user input is never consulted
    pub fn fixed(default: Value) -> Self {
        Self {
            configurable: false,
            ..Self::configurable(default)
        }
    }

    /// Configurable options whose default is source text
    pub fn source(text: impl Into<String>, language: OptionsLanguage) -> Self {
        Self {
            configurable: true,
            default_value: OptionsValue::source(text, language),
            editor_language: language,
        }
    }

    /// Merge `user` over the default.
    ///
    /// When the descriptor is not configurable, `user` is ignored entirely,
    /// without being evaluated.
    pub fn resolve(&self, user: Option<&OptionsValue>) -> Result<Value> {
        let defaults = self.default_value.evaluate()?;
        let merged = match user {
            Some(user) if self.configurable => merge(defaults, user.evaluate()?),
            _ => defaults,
        };
        Ok(Value::Object(merged))
    }
}

impl Default for OptionsDescriptor {
    fn default() -> Self {
        Self::configurable(Value::Object(Map::new()))
    }
}

/// Shallow merge: top-level keys of `user` replace those of `defaults`.
///
/// Nested objects are replaced wholesale, not merged.
pub fn merge(mut defaults: Map<String, Value>, user: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in user {
        defaults.insert(key, value);
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> OptionsValue {
        OptionsValue::from_value(value).unwrap()
    }

    #[test]
    fn test_user_overrides_default() {
        let descriptor = OptionsDescriptor::configurable(json!({ "sourceType": "module", "loc": true }));
        let resolved = descriptor.resolve(Some(&object(json!({ "loc": false })))).unwrap();
        assert_eq!(resolved, json!({ "sourceType": "module", "loc": false }));
    }

    #[test]
    fn test_shallow_merge_replaces_nested_objects() {
        let descriptor = OptionsDescriptor::configurable(json!({
            "parse": {},
            "compile": { "id": "foo.vue", "inline": true }
        }));
        let resolved = descriptor
            .resolve(Some(&object(json!({ "compile": { "inline": false } }))))
            .unwrap();
        assert_eq!(resolved, json!({ "parse": {}, "compile": { "inline": false } }));
    }

    #[test]
    fn test_fixed_ignores_user_options() {
        let descriptor = OptionsDescriptor::fixed(json!({ "positions": true }));
        let user = object(json!({ "positions": false, "extra": 1 }));
        assert_eq!(
            descriptor.resolve(Some(&user)).unwrap(),
            descriptor.resolve(None).unwrap()
        );

        // never evaluated, so malformed input is not an error either
        let broken = OptionsValue::source("{", OptionsLanguage::Json);
        assert_eq!(descriptor.resolve(Some(&broken)).unwrap(), json!({ "positions": true }));
    }

    #[test]
    fn test_source_defaults() {
        let descriptor = OptionsDescriptor::source("includeAnonymous = false\nstrict = true\n", OptionsLanguage::Toml);
        assert_eq!(
            descriptor.resolve(None).unwrap(),
            json!({ "includeAnonymous": false, "strict": true })
        );

        let user = OptionsValue::source(r#"{ "strict": false }"#, OptionsLanguage::Json);
        assert_eq!(
            descriptor.resolve(Some(&user)).unwrap(),
            json!({ "includeAnonymous": false, "strict": false })
        );
    }

    #[test]
    fn test_invalid_user_options() {
        let descriptor = OptionsDescriptor::default();
        let err = descriptor
            .resolve(Some(&OptionsValue::source("[1, 2]", OptionsLanguage::Json)))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));

        assert!(OptionsValue::from_value(json!("positions")).is_err());
        assert!(OptionsValue::source("= nope", OptionsLanguage::Toml).evaluate().is_err());
    }

    #[test]
    fn test_empty_source_is_empty_object() {
        let value = OptionsValue::source("  ", OptionsLanguage::Json);
        assert!(value.evaluate().unwrap().is_empty());
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("TOML".parse::<OptionsLanguage>().unwrap(), OptionsLanguage::Toml);
        assert!("yaml".parse::<OptionsLanguage>().is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "option defaults must be a JSON object")]
    fn test_non_object_default_is_rejected() {
        OptionsDescriptor::configurable(json!(["loc"]));
    }
}
