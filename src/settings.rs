use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for settings operations
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    #[error("Setting not found: {0}")]
    SettingNotFound(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Settings format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl SettingsFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn require(path: &Path) -> Result<Self> {
        Self::from_path(path)
            .ok_or_else(|| SettingsError::UnknownFormat(path.display().to_string()))
    }

    fn parse(self, contents: &str) -> Result<HashMap<String, serde_json::Value>> {
        match self {
            Self::Toml => {
                toml::from_str(contents).map_err(|e| SettingsError::TomlParse(e.to_string()))
            }
            Self::Json => Ok(serde_json::from_str(contents)?),
        }
    }

    fn render(self, raw: &HashMap<String, serde_json::Value>) -> Result<String> {
        match self {
            Self::Toml => toml::to_string(raw).map_err(|e| SettingsError::TomlParse(e.to_string())),
            Self::Json => Ok(serde_json::to_string_pretty(raw)?),
        }
    }
}

/// Flat key/value settings for a crawl
///
/// Keys are upper-case names such as `SEEDING_POLICY`; values keep their
/// JSON type until read with [`Settings::get`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub raw: HashMap<String, serde_json::Value>,

    /// Where the settings were loaded from
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a `.toml` or `.json` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = SettingsFormat::require(path)?;
        let contents = std::fs::read_to_string(path)?;
        Ok(Self {
            raw: format.parse(&contents)?,
            file_path: Some(path.to_path_buf()),
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Self::from_contents(SettingsFormat::Toml, contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Self::from_contents(SettingsFormat::Json, contents)
    }

    fn from_contents(format: SettingsFormat, contents: &str) -> Result<Self> {
        Ok(Self {
            raw: format.parse(contents)?,
            file_path: None,
        })
    }

    /// Read a setting as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .raw
            .get(key)
            .ok_or_else(|| SettingsError::SettingNotFound(key.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Read a setting, falling back to `default` when it is missing or mistyped
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Read a setting that may be absent; only a mistyped value is an error
    pub fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(SettingsError::SettingNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.raw.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.raw.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.raw.remove(key)
    }

    /// Write settings to a `.toml` or `.json` file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = SettingsFormat::require(path)?.render(&self.raw)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
