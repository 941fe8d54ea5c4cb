//! Read-through cache of translation rows.
//!
//! Each entry is keyed by (model, primary key, database alias, language) and holds
//! either a snapshot of the row or an explicit "confirmed absent" marker. A key
//! that is not present at all means the language has not been checked yet.

mod memory;
mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::TransomSettings,
    errors::CacheError,
    keys::KeyContext,
    language::LanguageCode,
    types::{FieldValues, ModelDescriptor, PrimaryKey},
};

/// A key-value store with optional expiry.
///
/// Implementations provide atomic per-key operations; nothing spans keys.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> Result<(), CacheError>;

    fn delete(&self, key: &str) -> Result<(), CacheError>;

    fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

/// Identity of a stored master row.
#[derive(Debug, Clone, Copy)]
pub struct CacheIdentity<'a> {
    pub model: &'a ModelDescriptor,
    pub pk: &'a PrimaryKey,
    pub database: &'a str,
}

/// What the cache knows about one language of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedTranslation {
    Present(FieldValues),
    /// Checked against storage: no row exists for this language.
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CachedTranslation),
    NotChecked,
}

/// Wire format of a cache value.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
enum StoredEntry {
    Present {
        values: FieldValues,
        cached_at: DateTime<Utc>,
    },
    Missing {
        cached_at: DateTime<Utc>,
    },
}

/// Translation cache over a pluggable backend.
#[derive(Clone)]
pub struct TranslationCache {
    backend: Option<Arc<dyn CacheBackend>>,
    prefix: String,
    timeout: Option<Duration>,
}

impl TranslationCache {
    pub fn new(backend: Arc<dyn CacheBackend>, prefix: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            backend: Some(backend),
            prefix: prefix.into(),
            timeout,
        }
    }

    /// A cache that never holds anything; every lookup reports `NotChecked`.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            prefix: String::new(),
            timeout: None,
        }
    }

    pub fn from_settings(settings: &TransomSettings, backend: Arc<dyn CacheBackend>) -> Self {
        if !settings.enable_caching {
            return Self::disabled();
        }
        let timeout = (settings.cache_timeout_secs > 0).then(|| Duration::from_secs(settings.cache_timeout_secs));
        Self::new(backend, settings.cache_prefix.clone(), timeout)
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn key(&self, identity: &CacheIdentity<'_>, language: &LanguageCode) -> String {
        KeyContext::new(&self.prefix, &identity.model.app).translation(
            &identity.model.model,
            identity.database,
            identity.pk,
            language,
        )
    }

    pub fn get(&self, identity: &CacheIdentity<'_>, language: &LanguageCode) -> Result<CacheLookup, CacheError> {
        let Some(backend) = &self.backend else {
            return Ok(CacheLookup::NotChecked);
        };
        let key = self.key(identity, language);
        let Some(raw) = backend.get(&key)? else {
            trace!("cache miss {key}");
            return Ok(CacheLookup::NotChecked);
        };
        match serde_json::from_str::<StoredEntry>(&raw) {
            Ok(StoredEntry::Present { values, .. }) => {
                trace!("cache hit {key}");
                Ok(CacheLookup::Hit(CachedTranslation::Present(values)))
            }
            Ok(StoredEntry::Missing { .. }) => {
                trace!("cache hit {key} (absent)");
                Ok(CacheLookup::Hit(CachedTranslation::Missing))
            }
            Err(err) => {
                // An undecodable entry says nothing about storage.
                warn!("ignoring undecodable cache entry {key}: {err}");
                Ok(CacheLookup::NotChecked)
            }
        }
    }

    pub fn put(
        &self,
        identity: &CacheIdentity<'_>,
        language: &LanguageCode,
        entry: &CachedTranslation,
    ) -> Result<(), CacheError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let key = self.key(identity, language);
        let cached_at = Utc::now();
        let stored = match entry {
            CachedTranslation::Present(values) => StoredEntry::Present {
                values: values.clone(),
                cached_at,
            },
            CachedTranslation::Missing => StoredEntry::Missing { cached_at },
        };
        let payload = serde_json::to_string(&stored)?;
        debug!("caching {key}");
        backend.set(&key, &payload, self.timeout)
    }

    pub fn invalidate(&self, identity: &CacheIdentity<'_>, language: &LanguageCode) -> Result<(), CacheError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let key = self.key(identity, language);
        debug!("invalidating {key}");
        backend.delete(&key)
    }

    /// Removes every language entry of a row by enumerating the given codes.
    pub fn invalidate_all_for(
        &self,
        identity: &CacheIdentity<'_>,
        languages: &[LanguageCode],
    ) -> Result<(), CacheError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let keys: Vec<String> = languages.iter().map(|language| self.key(identity, language)).collect();
        debug!(
            "invalidating {} cached languages of {} {} in '{}'",
            keys.len(),
            identity.model.qualified_name(),
            identity.pk,
            identity.database
        );
        backend.delete_many(&keys)
    }
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("enabled", &self.is_enabled())
            .field("prefix", &self.prefix)
            .field("timeout", &self.timeout)
            .finish()
    }
}
