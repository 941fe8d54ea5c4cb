use std::sync::Arc;

use crate::{
    cache::{CacheBackend, TranslationCache},
    config::{LanguageConfig, TransomSettings},
    errors::ConfigError,
    resolver::FallbackResolver,
    storage::Storage,
};

/// Collaborators shared by every entity of a deployment.
///
/// Cloning is cheap; every entity holds its own clone.
#[derive(Clone)]
pub struct TranslationContext {
    config: Arc<LanguageConfig>,
    resolver: FallbackResolver,
    cache: TranslationCache,
    storage: Arc<dyn Storage>,
    default_database: String,
    default_activate: bool,
}

impl TranslationContext {
    pub fn new(config: Arc<LanguageConfig>, storage: Arc<dyn Storage>, cache: TranslationCache) -> Self {
        Self {
            resolver: FallbackResolver::new(Arc::clone(&config)),
            config,
            cache,
            storage,
            default_database: "default".to_string(),
            default_activate: false,
        }
    }

    /// Validates the language settings and wires the cache according to them.
    pub fn from_settings(
        settings: &TransomSettings,
        storage: Arc<dyn Storage>,
        cache_backend: Arc<dyn CacheBackend>,
    ) -> Result<Self, ConfigError> {
        let config = Arc::new(LanguageConfig::from_settings(settings)?);
        let cache = TranslationCache::from_settings(settings, cache_backend);
        Ok(Self::new(config, storage, cache)
            .with_default_database(settings.default_database.clone())
            .with_default_activate(settings.default_activate))
    }

    pub fn with_default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = database.into();
        self
    }

    pub fn with_default_activate(mut self, activate: bool) -> Self {
        self.default_activate = activate;
        self
    }

    pub fn config(&self) -> &LanguageConfig {
        &self.config
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub(crate) fn storage_handle(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    pub fn default_activate(&self) -> bool {
        self.default_activate
    }
}

impl std::fmt::Debug for TranslationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationContext")
            .field("cache", &self.cache)
            .field("default_database", &self.default_database)
            .field("default_activate", &self.default_activate)
            .finish_non_exhaustive()
    }
}
