//! JSON and YAML text, chosen by file extension.
//!
//! YAML is first read into a JSON value and then deserialized, so both
//! formats accept exactly the same structures.

use serde::de::DeserializeOwned;
use std::path::Path;

use yoml_core::DocumentNode;

use crate::deserialize::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// `.json` is JSON; anything else is YAML, which also accepts JSON.
    pub fn from_path(path: &Path) -> Format {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }

    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, CatalogError> {
        let value: serde_json::Value = match self {
            Format::Json => serde_json::from_str(text)?,
            Format::Yaml => serde_yaml::from_str(text)?,
        };
        Ok(serde_json::from_value(value)?)
    }

    pub fn render(self, node: &DocumentNode) -> Result<String, CatalogError> {
        Ok(match self {
            Format::Json => serde_json::to_string_pretty(node)?,
            Format::Yaml => serde_yaml::to_string(node)?,
        })
    }
}

/// Parse a document in the given format.
pub fn parse_document(text: &str, format: Format) -> Result<DocumentNode, CatalogError> {
    format.parse(text)
}
