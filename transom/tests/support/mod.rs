#![allow(dead_code)]

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use transom::{
    LanguageConfig, MemoryCache, MemoryStorage, PrimaryKey, Scope, Target, Translatable, TranslatedModel,
    TranslationCache, TranslationContext,
};

pub const DATABASES: [&str; 3] = ["default", "other_db_1", "other_db_2"];

#[derive(TranslatedModel, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[transom(app = "blog", model = "article")]
pub struct ArticleTranslation {
    pub title: String,
    #[transom(any_language)]
    pub slug: String,
}

pub struct Fixture {
    pub storage: Arc<MemoryStorage>,
    pub cache: Arc<MemoryCache>,
    pub ctx: TranslationContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(standard_config())
    }

    pub fn with_config(config: LanguageConfig) -> Self {
        let storage = Arc::new(MemoryStorage::new(DATABASES));
        let cache = Arc::new(MemoryCache::new());
        let ctx = TranslationContext::new(
            Arc::new(config),
            storage.clone(),
            TranslationCache::new(cache.clone(), "tests", None),
        );
        Self { storage, cache, ctx }
    }

    pub fn article(&self) -> Translatable<ArticleTranslation> {
        Translatable::new(&self.ctx, Scope::global())
    }

    pub fn load(&self, database: &str, pk: &PrimaryKey) -> Translatable<ArticleTranslation> {
        Translatable::load(&self.ctx, Scope::global(), database, pk.clone()).expect("row should load")
    }

    /// Saves an article with the given (language, title) pairs into `database`.
    pub fn seed(&self, database: &str, titles: &[(&str, &str)]) -> PrimaryKey {
        let mut article = self.article();
        for (language, title) in titles {
            article.set_field("title", *title, Some(*language)).unwrap();
        }
        article.save_to(database).unwrap().pk
    }

    pub fn stored_title(&self, database: &str, pk: &PrimaryKey, language: &str) -> Option<String> {
        use transom::Storage;
        let language = transom::LanguageCode::parse(language).unwrap();
        self.storage
            .fetch_translation(Target::new(database, "blog_article"), pk, &language)
            .unwrap()
            .and_then(|values| values.get("title").and_then(|v| v.as_str()).map(str::to_string))
    }

    pub fn translation_fetches(&self) -> usize {
        self.storage.stats().translation_fetches()
    }
}

/// en, fr -> en, de -> fr -> en, nl; every language inherits `en` by default.
pub fn standard_config() -> LanguageConfig {
    LanguageConfig::builder("en")
        .default_fallbacks(&["en"])
        .language("global", "en")
        .language_with_fallbacks("global", "fr", &["en"])
        .language_with_fallbacks("global", "de", &["fr", "en"])
        .language("global", "nl")
        .build()
        .expect("fixture config is valid")
}
