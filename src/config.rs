use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project settings read from `astlens.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AstlensConfig {
    /// Language picked when a file's extension is not recognized
    pub language: Option<String>,
    /// Preferred parser id
    pub parser: Option<String>,
    /// Log filter directive, e.g. `astlens=debug`
    pub log: Option<String>,
    /// Per-parser options, keyed by parser id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, toml::Table>,
}

impl AstlensConfig {
    /// Saved options for a parser, as JSON
    pub fn options_for(&self, parser_id: &str) -> anyhow::Result<Option<Value>> {
        self.options
            .get(parser_id)
            .map(|table| serde_json::to_value(table).map_err(Into::into))
            .transpose()
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("astlens.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<AstlensConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AstlensConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &AstlensConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
