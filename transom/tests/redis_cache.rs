//! Exercises the Redis cache backend. Needs a reachable server:
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored`.

mod support;

use std::{sync::Arc, time::Duration};

use serde_json::json;
use serial_test::serial;
use support::standard_config;
use transom::{
    CacheBackend, MemoryStorage, RedisCache, Scope, Translatable, TranslationCache, TranslationContext,
};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn unique_prefix() -> String {
    format!("transom_test_{}", nanoid::nanoid!(8))
}

#[test]
#[ignore = "requires a running Redis"]
#[serial]
fn stores_and_deletes_raw_entries() {
    let cache = RedisCache::open(&redis_url()).expect("Failed to connect to Redis");
    let prefix = unique_prefix();
    let first = format!("{prefix}:a");
    let second = format!("{prefix}:b");

    cache.set(&first, "one", None).unwrap();
    cache.set(&second, "two", Some(Duration::from_secs(30))).unwrap();
    assert_eq!(cache.get(&first).unwrap().as_deref(), Some("one"));

    cache.delete_many(&[first.clone(), second.clone()]).unwrap();
    assert_eq!(cache.get(&first).unwrap(), None);
    assert_eq!(cache.get(&second).unwrap(), None);
}

#[test]
#[ignore = "requires a running Redis"]
#[serial]
fn short_timeouts_expire() {
    let cache = RedisCache::open(&redis_url()).expect("Failed to connect to Redis");
    let key = format!("{}:short", unique_prefix());

    cache.set(&key, "soon gone", Some(Duration::from_millis(50))).unwrap();
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(cache.get(&key).unwrap(), None);
}

#[test]
#[ignore = "requires a running Redis"]
#[serial]
fn entities_share_translations_through_redis() {
    let backend = Arc::new(RedisCache::open(&redis_url()).expect("Failed to connect to Redis"));
    let storage = Arc::new(MemoryStorage::new(["default"]));
    let ctx = TranslationContext::new(
        Arc::new(standard_config()),
        storage.clone(),
        TranslationCache::new(backend, unique_prefix(), Some(Duration::from_secs(60))),
    );

    let mut article: Translatable<support::ArticleTranslation> = Translatable::new(&ctx, Scope::global());
    article.set_field("title", "Hello", Some("en")).unwrap();
    let pk = article.save().unwrap().pk;
    storage.stats().reset();

    let mut reader: Translatable<support::ArticleTranslation> =
        Translatable::load(&ctx, Scope::global(), "default", pk).unwrap();
    assert_eq!(reader.get_field("title", Some("fr")).unwrap().value, json!("Hello"));
    assert_eq!(storage.stats().translation_fetches(), 1, "only the fr absence should hit storage");

    assert_eq!(reader.delete().unwrap(), 2);
}
