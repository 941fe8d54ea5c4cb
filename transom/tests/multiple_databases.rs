mod support;

use serde_json::json;
use support::{ArticleTranslation, DATABASES, Fixture};
use transom::{CacheIdentity, LanguageCode, PrimaryKey, SaveRoute, Target, TranslatedModel};

fn seed_with_key(fixture: &Fixture, database: &str, pk: &str, title: &str) {
    let mut article = fixture.article();
    article.set_pk(Some(PrimaryKey::from(pk)));
    article.set_field("title", title, Some("en")).unwrap();
    let outcome = article.save_to(database).unwrap();
    assert_eq!(outcome.route, SaveRoute::FirstSave);
}

#[test]
fn same_key_in_two_databases_stays_independent() {
    let fixture = Fixture::new();
    seed_with_key(&fixture, "default", "42", "Primary");
    seed_with_key(&fixture, "other_db_1", "42", "Replica");
    let pk = PrimaryKey::from("42");

    let mut primary = fixture.load("default", &pk);
    let mut replica = fixture.load("other_db_1", &pk);
    assert_eq!(primary.get_field("title", Some("en")).unwrap().value, json!("Primary"));
    assert_eq!(replica.get_field("title", Some("en")).unwrap().value, json!("Replica"));

    let descriptor = ArticleTranslation::descriptor();
    let en = LanguageCode::parse("en").unwrap();
    let keys: Vec<String> = DATABASES
        .iter()
        .map(|&database| {
            let identity = CacheIdentity {
                model: &descriptor,
                pk: &pk,
                database,
            };
            fixture.ctx.cache().key(&identity, &en)
        })
        .collect();
    assert_eq!(keys[0], "tests:transom:blog.article:default:42:en");
    assert_ne!(keys[0], keys[1]);
    assert_ne!(keys[1], keys[2]);
}

#[test]
fn loaded_entity_updates_its_own_database() {
    let fixture = Fixture::new();
    let pk = fixture.seed("other_db_2", &[("en", "Hello")]);

    let mut article = fixture.load("other_db_2", &pk);
    article.set_field("title", "Updated", Some("en")).unwrap();
    let outcome = article.save().unwrap();

    assert_eq!(outcome.route, SaveRoute::RegularUpdate);
    assert_eq!(outcome.database, "other_db_2");
    assert_eq!(fixture.stored_title("other_db_2", &pk, "en").as_deref(), Some("Updated"));
    assert_eq!(
        fixture.storage.master_count(Target::new("default", "blog_article")).unwrap(),
        0
    );
}

#[test]
fn explicit_home_database_is_a_regular_update() {
    let fixture = Fixture::new();
    let pk = fixture.seed("other_db_1", &[("en", "Hello")]);

    let mut article = fixture.load("other_db_1", &pk);
    article.set_field("title", "Again", Some("en")).unwrap();
    let outcome = article.save_to("other_db_1").unwrap();
    assert_eq!(outcome.route, SaveRoute::RegularUpdate);
    assert_eq!(outcome.pk, pk);
}

#[test]
fn duplicates_chain_across_every_alias() {
    let fixture = Fixture::new();
    let origin = fixture.seed("default", &[("en", "Hello"), ("nl", "Hallo")]);

    let mut article = fixture.load("default", &origin);
    let first = article.duplicate_into("other_db_1").unwrap();
    let second = article.duplicate_into("other_db_2").unwrap();

    assert_eq!(article.database(), Some("other_db_2"));
    assert_eq!(article.pk(), Some(&second.pk));
    for (database, pk) in [("default", &origin), ("other_db_1", &first.pk), ("other_db_2", &second.pk)] {
        assert_eq!(fixture.stored_title(database, pk, "nl").as_deref(), Some("Hallo"));
    }
}

#[test]
fn deleting_a_copy_keeps_the_source_readable() {
    let fixture = Fixture::new();
    let origin = fixture.seed("default", &[("en", "Hello"), ("fr", "Bonjour")]);

    let mut copy = fixture.load("default", &origin);
    let duplicated = copy.duplicate_into("other_db_1").unwrap();
    assert_eq!(copy.delete().unwrap(), 3);
    assert_eq!(
        fixture
            .storage
            .translation_count(Target::new("other_db_1", "blog_article"), &duplicated.pk)
            .unwrap(),
        0
    );

    let mut source = fixture.load("default", &origin);
    assert_eq!(source.get_field("title", Some("fr")).unwrap().value, json!("Bonjour"));
}
