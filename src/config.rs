//! Export configuration: a flat string-keyed property bag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Resource path of the style document used when none is configured.
pub const DEFAULT_STYLESHEET_PATH: &str = "folio/table-fo.xsl";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration file '{path}': {source}")]
    Io { path: String, source: std::io::Error },

    #[error("Configuration is not a JSON object of strings: {0}")]
    Json(#[from] serde_json::Error),
}

/// String-keyed export properties.
///
/// Recognized keys are listed as associated constants. Unknown keys are kept
/// and ignored, so one configuration file can serve several tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct ExportConfig {
    properties: BTreeMap<String, String>,
}

impl ExportConfig {
    /// Resource path of the style document.
    pub const STYLESHEET_PATH: &'static str = "stylesheet-path";
    /// Literal style document text; overrides `stylesheet-path` when non-empty.
    pub const STYLESHEET_BODY: &'static str = "stylesheet-body";
    /// Title written to the intermediate markup and the PDF metadata.
    pub const DOCUMENT_TITLE: &'static str = "document-title";
    /// `"true"` pretty-prints the intermediate markup.
    pub const MARKUP_INDENT: &'static str = "markup-indent";

    /// A configuration with no properties at all, not even defaults.
    pub fn empty() -> Self {
        Self { properties: BTreeMap::new() }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
        Self::from_json_str(&text)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// A property that is present and not blank.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for ExportConfig {
    /// Points `stylesheet-path` at the bundled table stylesheet.
    fn default() -> Self {
        Self::empty().with(Self::STYLESHEET_PATH, DEFAULT_STYLESHEET_PATH)
    }
}

impl From<BTreeMap<String, String>> for ExportConfig {
    /// Properties missing from `map` take their default values.
    fn from(map: BTreeMap<String, String>) -> Self {
        let mut config = ExportConfig::default();
        config.properties.extend(map);
        config
    }
}

impl From<ExportConfig> for BTreeMap<String, String> {
    fn from(config: ExportConfig) -> Self {
        config.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_keys() {
        let config = ExportConfig::from_json_str(r#"{"document-title": "Sales"}"#).unwrap();
        assert_eq!(config.get(ExportConfig::DOCUMENT_TITLE), Some("Sales"));
        assert_eq!(config.get(ExportConfig::STYLESHEET_PATH), Some(DEFAULT_STYLESHEET_PATH));
        assert!(ExportConfig::empty().get(ExportConfig::STYLESHEET_PATH).is_none());
    }

    #[test]
    fn blank_values_and_flags() {
        let mut config = ExportConfig::empty();
        config.set(ExportConfig::STYLESHEET_BODY, "  ").set(ExportConfig::MARKUP_INDENT, "TRUE");
        assert!(config.get_non_empty(ExportConfig::STYLESHEET_BODY).is_none());
        assert!(config.flag(ExportConfig::MARKUP_INDENT));
        assert!(!config.flag("missing"));
    }

    #[test]
    fn rejects_non_string_values() {
        assert!(matches!(ExportConfig::from_json_str(r#"{"markup-indent": true}"#), Err(ConfigError::Json(_))));
    }

    #[test]
    fn loads_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, r#"{"stylesheet-path": "custom.xsl"}"#).unwrap();
        let config = ExportConfig::from_json_file(&path).unwrap();
        assert_eq!(config.get(ExportConfig::STYLESHEET_PATH), Some("custom.xsl"));
        assert!(matches!(ExportConfig::from_json_file(dir.path().join("nope.json")), Err(ConfigError::Io { .. })));
    }
}
