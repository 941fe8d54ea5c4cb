use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resolver::ResolveMode;

/// Field values of a master row or of one translation row.
pub type FieldValues = Map<String, Value>;

/// Primary key of a master row, unique within one database alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryKey(String);

impl PrimaryKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PrimaryKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for PrimaryKey {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Describes a translatable model: where it lives and which fields are translated.
///
/// Usually produced by `#[derive(TranslatedModel)]`, but can be assembled by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Application namespace; part of every cache key.
    pub app: String,
    pub model: String,
    pub translated_fields: Vec<String>,
    /// Fields that degrade to any stored language instead of failing.
    pub any_language_fields: Vec<String>,
}

impl ModelDescriptor {
    pub fn new(app: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.translated_fields.push(name.into());
        self
    }

    pub fn with_any_language_field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.any_language_fields.push(name.clone());
        self.translated_fields.push(name);
        self
    }

    /// Storage table of the master rows, e.g. `blog_article`.
    pub fn table(&self) -> String {
        format!("{}_{}", self.app, self.model)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.app, self.model)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.translated_fields.iter().any(|field| field == name)
    }

    /// Resolution mode used when a caller reads a field without choosing one.
    pub fn default_mode(&self, field: &str) -> ResolveMode {
        if self.any_language_fields.iter().any(|name| name == field) {
            ResolveMode::AnyLanguage
        } else {
            ResolveMode::Fallback
        }
    }
}

/// Implemented by the translation struct of a model.
///
/// This trait is automatically implemented by `#[derive(TranslatedModel)]`.
pub trait TranslatedModel {
    fn descriptor() -> ModelDescriptor;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_tracks_any_language_fields() {
        let descriptor = ModelDescriptor::new("blog", "article")
            .with_field("title")
            .with_any_language_field("summary");
        assert_eq!(descriptor.table(), "blog_article");
        assert!(descriptor.has_field("summary"));
        assert_eq!(descriptor.default_mode("title"), ResolveMode::Fallback);
        assert_eq!(descriptor.default_mode("summary"), ResolveMode::AnyLanguage);
    }

    #[test]
    fn numeric_keys_render_as_text() {
        assert_eq!(PrimaryKey::from(123_i64).as_str(), "123");
    }
}
