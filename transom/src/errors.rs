use std::borrow::Cow;

use thiserror::Error;

use crate::{language::LanguageCode, types::PrimaryKey};

/// Top-level error type returned by Transom entities and resolvers.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Language configuration was rejected at load time.
    #[error("invalid language configuration")]
    Configuration(#[from] ConfigError),

    /// The code is malformed or not configured for the active scope.
    #[error("unknown language code '{code}'")]
    UnknownLanguage { code: String },

    /// No candidate language resolved the read.
    ///
    /// Callers usually treat this as an optional value rather than a failure.
    #[error(
        "no translation of '{}' for language '{language}' (tried {tried:?})",
        .field.as_deref().unwrap_or("*")
    )]
    TranslationMissing {
        field: Option<String>,
        language: LanguageCode,
        tried: Vec<LanguageCode>,
    },

    /// A translated field was written before any language was activated.
    #[error("field '{field}' assigned before a language was activated")]
    FieldAssignedTooEarly { field: String },

    /// The field is not declared as translated on the model.
    #[error("'{field}' is not a translated field of {model}")]
    UnknownField { model: String, field: String },

    /// Saving would overwrite an existing row and reconcile its translations.
    #[error("refusing to overwrite row {pk} in database '{database}'")]
    UnsupportedOverwrite { pk: PrimaryKey, database: String },

    /// Persistence bookkeeping is inconsistent; retrying cannot help.
    #[error("save state invariant violated: {message}")]
    InvariantViolation { message: Cow<'static, str> },

    /// The operation needs an entity that has been saved at least once.
    #[error("{operation} requires a saved entity")]
    NotPersisted { operation: &'static str },

    /// A stored translation could not be decoded into the model type.
    #[error("failed to decode translation: {0}")]
    Decode(#[from] serde_json::Error),

    /// Underlying storage call failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Underlying cache call failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl TranslationError {
    /// True for the soft "nothing resolved" condition.
    pub fn is_missing(&self) -> bool {
        matches!(self, TranslationError::TranslationMissing { .. })
    }
}

pub type TranslationResult<T> = Result<T, TranslationError>;

/// Collection of configuration issues found while loading language settings.
#[derive(Debug, Error)]
#[error("configuration errors: {issues:?}")]
pub struct ConfigError {
    pub issues: Vec<ConfigIssue>,
}

impl ConfigError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ConfigIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-issue error.
    pub fn single(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ConfigIssue::new(path, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any issue carries the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

/// A single problem in the configuration, addressed by a dotted path.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub path: String,
    pub code: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(path: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by storage collaborators.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unknown database alias '{database}'")]
    UnknownDatabase { database: String },

    #[error("row {pk} already exists in {table}")]
    DuplicateKey { table: String, pk: PrimaryKey },

    #[error("translation '{language}' of row {pk} already exists in {table}")]
    DuplicateTranslation {
        table: String,
        pk: PrimaryKey,
        language: LanguageCode,
    },

    #[error("row {pk} not found in {table}")]
    RowNotFound { table: String, pk: PrimaryKey },

    #[error("translation '{language}' of row {pk} not found in {table}")]
    TranslationNotFound {
        table: String,
        pk: PrimaryKey,
        language: LanguageCode,
    },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}
