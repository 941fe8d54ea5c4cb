mod support;

use serde_json::{Value, json};
use support::{Fixture, standard_config};
use transom::{LanguageConfig, ResolveMode, Scope, Translatable, TranslationError};

#[test]
fn falls_back_and_reports_the_satisfying_language() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello")]);
    let mut article = fixture.load("default", &pk);

    let resolved = article.get_field("title", Some("fr")).unwrap();
    assert_eq!(resolved.value, json!("Hello"));
    assert_eq!(resolved.language, "en");
    assert_eq!(resolved.requested, "fr");
    assert!(resolved.is_fallback());
    assert_eq!(article.resolved_language().unwrap(), "en");
}

#[test]
fn follows_multi_step_chains() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello"), ("fr", "Bonjour")]);
    let mut article = fixture.load("default", &pk);

    let resolved = article.get_field("title", Some("de")).unwrap();
    assert_eq!(resolved.value, json!("Bonjour"));
    assert_eq!(resolved.language, "fr");
}

#[test]
fn strict_mode_reports_missing_translation() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello")]);
    let mut article = fixture.load("default", &pk);

    let err = article
        .get_field_in_mode("title", Some("fr"), ResolveMode::Strict)
        .unwrap_err();
    assert!(err.is_missing());
    match err {
        TranslationError::TranslationMissing { field, language, tried } => {
            assert_eq!(field.as_deref(), Some("title"));
            assert_eq!(language, "fr");
            assert_eq!(tried.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn safe_getter_returns_default_only_for_missing() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("fr", "Bonjour")]);
    let mut article = fixture.load("default", &pk);

    let value = article.safe_get_field("title", Some("nl"), json!("untitled")).unwrap();
    assert_eq!(value, json!("untitled"));

    let err = article.safe_get_field("body", Some("nl"), Value::Null).unwrap_err();
    assert!(matches!(err, TranslationError::UnknownField { .. }));
}

#[test]
fn any_language_fields_degrade_to_whatever_exists() {
    let fixture = Fixture::new();
    let mut article = fixture.article();
    article.set_field("slug", "hallo-wereld", Some("nl")).unwrap();
    let pk = article.save().unwrap().pk;

    let mut article = fixture.load("default", &pk);
    let resolved = article.get_field("slug", Some("fr")).unwrap();
    assert_eq!(resolved.value, json!("hallo-wereld"));
    assert_eq!(resolved.language, "nl");

    let err = article.get_field("title", Some("fr")).unwrap_err();
    assert!(err.is_missing());
}

#[test]
fn uncommitted_edit_wins_over_storage() {
    let fixture = Fixture::new();
    let pk = fixture.seed("default", &[("en", "Hello")]);
    let mut article = fixture.load("default", &pk);

    article.set_field("title", "Draft", Some("en")).unwrap();
    assert_eq!(article.get_field("title", Some("en")).unwrap().value, json!("Draft"));
    assert_eq!(fixture.stored_title("default", &pk, "en").as_deref(), Some("Hello"));
}

#[test]
fn falsy_values_are_real_values() {
    let fixture = Fixture::new();
    let mut article = fixture.article();
    article.set_field("title", "Hello", Some("en")).unwrap();
    article.set_field("title", "", Some("fr")).unwrap();
    article.save().unwrap();

    let resolved = article.get_field("title", Some("fr")).unwrap();
    assert_eq!(resolved.value, json!(""));
    assert_eq!(resolved.language, "fr");
}

#[test]
fn current_language_is_validated_eagerly() {
    let fixture = Fixture::new();
    let mut article = fixture.article();

    let err = article.set_current_language("es").unwrap_err();
    assert!(matches!(err, TranslationError::UnknownLanguage { .. }));
    let err = article.set_current_language("not a code").unwrap_err();
    assert!(matches!(err, TranslationError::UnknownLanguage { .. }));

    article.set_current_language("fr_CA").unwrap();
    assert_eq!(article.current_language().unwrap(), "fr-ca");
}

#[test]
fn writes_need_a_language() {
    let fixture = Fixture::new();
    let mut article = fixture.article();

    let err = article.set_field("title", "Hello", None).unwrap_err();
    assert!(matches!(err, TranslationError::FieldAssignedTooEarly { .. }));

    article.set_current_language("fr").unwrap();
    article.set_field("title", "Bonjour", None).unwrap();
    assert!(article.has_translation(Some("fr")).unwrap());
    assert!(!article.has_translation(Some("en")).unwrap());
}

#[test]
fn reads_without_language_use_the_first_configured_language() {
    let fixture = Fixture::new();
    let mut article = fixture.article();
    article.set_field("title", "Hello", Some("en")).unwrap();

    let resolved = article.get_field("title", None).unwrap();
    assert_eq!(resolved.requested, "en");
}

#[test]
fn default_activate_starts_in_the_first_language() {
    let fixture = Fixture::new();
    let ctx = fixture.ctx.clone().with_default_activate(true);
    let mut article: Translatable<support::ArticleTranslation> = Translatable::new(&ctx, Scope::global());
    assert_eq!(article.current_language().unwrap(), "en");
    article.set_field("title", "Hello", None).unwrap();
}

#[test]
fn unknown_scope_behaves_as_single_language_site() {
    let fixture = Fixture::new();
    let mut article: Translatable<support::ArticleTranslation> = Translatable::new(&fixture.ctx, Scope::site(7));
    article.set_current_language("en").unwrap();
    assert!(article.set_current_language("fr").is_err());
}

#[test]
fn visibility_respects_hide_untranslated() {
    let hidden = LanguageConfig::builder("en")
        .hide_untranslated(true)
        .language("global", "en")
        .language_with_fallbacks("global", "fr", &["en"])
        .build()
        .unwrap();
    let fixture = Fixture::with_config(hidden);
    let pk = fixture.seed("default", &[("en", "Hello")]);
    let mut article = fixture.load("default", &pk);
    assert!(article.is_visible(Some("en")).unwrap());
    assert!(!article.is_visible(Some("fr")).unwrap());

    let fixture = Fixture::with_config(standard_config());
    let pk = fixture.seed("default", &[("en", "Hello")]);
    let mut article = fixture.load("default", &pk);
    assert!(article.is_visible(Some("fr")).unwrap());
}
