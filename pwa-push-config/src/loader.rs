// Settings file loaders

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported settings file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "env" => Some(Self::Env),
            _ => None,
        }
    }

    /// Detect the format of `path`; a bare `.env` file counts as `Env`.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.file_name().is_some_and(|name| name == ".env") {
            return Some(Self::Env);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Parses a settings file into a flat JSON object.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Pick the format from the file name.
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path).ok_or_else(|| {
            ConfigError::LoadError(format!("Unsupported settings file: {}", path.display()))
        })?;
        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Read and parse a file.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Map<String, Value>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        self.parse(&content)
    }

    /// Parse file content. The top level must be a table.
    pub fn parse(&self, content: &str) -> Result<Map<String, Value>> {
        let value = match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON: {}", e)))?,
            FileFormat::Toml => {
                let table: toml::Table = toml::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("TOML: {}", e)))?;
                serde_json::to_value(table)
                    .map_err(|e| ConfigError::ParseError(format!("TOML: {}", e)))?
            }
            FileFormat::Env => return parse_env(content),
        };

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(ConfigError::ParseError(
                "settings file must contain a table at the top level".to_string(),
            )),
        }
    }
}

/// `.env` content; keys are lowercased with the `PWA_PUSH_` prefix removed.
fn parse_env(content: &str) -> Result<Map<String, Value>> {
    let mut map = Map::new();

    for item in dotenvy::from_read_iter(content.as_bytes()) {
        let (key, value) = item.map_err(|e| ConfigError::ParseError(format!(".env: {}", e)))?;
        let key = key.strip_prefix("PWA_PUSH_").unwrap_or(&key).to_lowercase();
        map.insert(key, Value::String(value));
    }

    Ok(map)
}
