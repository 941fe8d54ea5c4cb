use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Settings stored in `transom.toml` (or an equivalent JSON document).
///
/// ```toml
/// default_language = "en"
/// cache_prefix = "site-a"
///
/// [languages.default]
/// fallbacks = ["en"]
/// hide_untranslated = false
///
/// [[languages.global]]
/// code = "en"
///
/// [[languages.global]]
/// code = "fr"
/// fallbacks = ["en"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransomSettings {
    #[serde(default = "default_language_code")]
    pub default_language: String,
    #[serde(default = "default_enable_caching")]
    pub enable_caching: bool,
    /// Prefix for deployments that share one cache backend.
    #[serde(default)]
    pub cache_prefix: String,
    #[serde(default = "default_cache_timeout_secs")]
    pub cache_timeout_secs: u64,
    /// Activate the scope's first language on new entities.
    #[serde(default)]
    pub default_activate: bool,
    #[serde(default = "default_database")]
    pub default_database: String,
    #[serde(default)]
    pub languages: RawLanguages,
}

impl Default for TransomSettings {
    fn default() -> Self {
        Self {
            default_language: default_language_code(),
            enable_caching: default_enable_caching(),
            cache_prefix: String::new(),
            cache_timeout_secs: default_cache_timeout_secs(),
            default_activate: false,
            default_database: default_database(),
            languages: RawLanguages::default(),
        }
    }
}

fn default_language_code() -> String {
    "en".to_string()
}

fn default_enable_caching() -> bool {
    true
}

fn default_cache_timeout_secs() -> u64 {
    300
}

fn default_database() -> String {
    "default".to_string()
}

impl TransomSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::single("settings", "config.parse", err.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|err| ConfigError::single("settings", "config.parse", err.to_string()))
    }

    /// Reads a settings file; `.json` files are parsed as JSON, everything else as TOML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            ConfigError::single(
                path.display().to_string(),
                "config.read",
                format!("failed to read settings: {err}"),
            )
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }
}

/// The nested language mapping: a `default` block plus one ordered list per scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLanguages {
    #[serde(default)]
    pub default: RawLanguageDefaults,
    #[serde(flatten)]
    pub scopes: BTreeMap<String, Vec<RawLanguage>>,
}

/// Values inherited by every language entry that leaves them unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLanguageDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<Vec<String>>,
    /// Legacy single-fallback spelling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_untranslated: Option<bool>,
}

/// One language descriptor inside a scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLanguage {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_untranslated: Option<bool>,
}

impl RawLanguage {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// The explicitly configured chain, if any; `fallbacks` wins over `fallback`.
    pub(crate) fn explicit_fallbacks(&self) -> Option<Vec<String>> {
        self.fallbacks
            .clone()
            .or_else(|| self.fallback.clone().map(|code| vec![code]))
    }
}

impl RawLanguageDefaults {
    pub(crate) fn explicit_fallbacks(&self) -> Option<Vec<String>> {
        self.fallbacks
            .clone()
            .or_else(|| self.fallback.clone().map(|code| vec![code]))
    }
}
