mod support;

use std::sync::Arc;

use serde_json::json;
use support::{Fixture, standard_config};
use transom::{
    CacheIdentity, CacheLookup, CachedTranslation, LanguageCode, MemoryStorage, Scope, Translatable,
    TranslationCache, TranslationContext, TranslatedModel,
};

#[test]
fn consecutive_reads_fetch_at_most_once() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello")]);
    fixture.cache.clear();
    fixture.storage.stats().reset();

    let mut article = fixture.load("default", &pk);
    article.get_field("title", Some("en")).unwrap();
    article.get_field("title", Some("en")).unwrap();
    assert_eq!(fixture.translation_fetches(), 1);

    let mut again = fixture.load("default", &pk);
    again.get_field("title", Some("en")).unwrap();
    assert_eq!(fixture.translation_fetches(), 1, "second instance should be served from cache");
}

#[test]
fn confirmed_absence_is_cached() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello")]);
    fixture.cache.clear();
    fixture.storage.stats().reset();

    let mut first = fixture.load("default", &pk);
    assert_eq!(first.get_field("title", Some("fr")).unwrap().language, "en");
    assert_eq!(fixture.translation_fetches(), 2);

    let mut second = fixture.load("default", &pk);
    assert_eq!(second.get_field("title", Some("fr")).unwrap().language, "en");
    assert_eq!(fixture.translation_fetches(), 2);

    let descriptor = support::ArticleTranslation::descriptor();
    let identity = CacheIdentity {
        model: &descriptor,
        pk: &pk,
        database: "default",
    };
    let fr = LanguageCode::parse("fr").unwrap();
    assert_eq!(
        fixture.ctx.cache().get(&identity, &fr).unwrap(),
        CacheLookup::Hit(CachedTranslation::Missing)
    );
}

#[test]
fn saves_refresh_cached_snapshots() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello")]);

    let mut editor = fixture.load("default", &pk);
    editor.set_field("title", "Hello again", Some("en")).unwrap();
    editor.set_field("title", "Bonjour", Some("fr")).unwrap();
    editor.save().unwrap();
    fixture.storage.stats().reset();

    let mut reader = fixture.load("default", &pk);
    assert_eq!(reader.get_field("title", Some("en")).unwrap().value, json!("Hello again"));
    assert_eq!(reader.get_field("title", Some("fr")).unwrap().value, json!("Bonjour"));
    assert_eq!(fixture.translation_fetches(), 0);
}

#[test]
fn new_translation_replaces_a_cached_absence() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello")]);

    let mut reader = fixture.load("default", &pk);
    assert!(!reader.has_translation(Some("fr")).unwrap());

    let mut editor = fixture.load("default", &pk);
    editor.set_field("title", "Bonjour", Some("fr")).unwrap();
    editor.save().unwrap();

    let mut fresh = fixture.load("default", &pk);
    assert!(fresh.has_translation(Some("fr")).unwrap());
}

#[test]
fn deleted_translation_is_not_served_from_cache() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello"), ("fr", "Bonjour")]);

    let mut editor = fixture.load("default", &pk);
    assert_eq!(editor.delete_translation("fr").unwrap(), 1);

    let mut reader = fixture.load("default", &pk);
    let resolved = reader.get_field("title", Some("fr")).unwrap();
    assert_eq!(resolved.language, "en");
}

#[test]
fn database_aliases_never_share_entries() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello")]);

    let mut copy = fixture.load("default", &pk);
    copy.get_field("title", Some("en")).unwrap();
    copy.set_pk(Some(pk.clone()));
    copy.save_to("other_db_1").unwrap();
    copy.set_field("title", "Copy", Some("en")).unwrap();
    copy.save().unwrap();

    let mut original = fixture.load("default", &pk);
    assert_eq!(original.get_field("title", Some("en")).unwrap().value, json!("Hello"));
    let mut duplicate = fixture.load("other_db_1", copy.pk().unwrap());
    assert_eq!(duplicate.get_field("title", Some("en")).unwrap().value, json!("Copy"));
}

#[test]
fn disabled_cache_always_reads_storage() {
    let storage = Arc::new(MemoryStorage::new(["default"]));
    let ctx = TranslationContext::new(Arc::new(standard_config()), storage.clone(), TranslationCache::disabled());

    let mut article: Translatable<support::ArticleTranslation> = Translatable::new(&ctx, Scope::global());
    article.set_field("title", "Hello", Some("en")).unwrap();
    let pk = article.save().unwrap().pk;
    storage.stats().reset();

    for _ in 0..2 {
        let mut reader: Translatable<support::ArticleTranslation> =
            Translatable::load(&ctx, Scope::global(), "default", pk.clone()).unwrap();
        reader.get_field("title", Some("en")).unwrap();
    }
    assert_eq!(storage.stats().translation_fetches(), 2);
}
