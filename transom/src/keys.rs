use std::borrow::Cow;

use crate::{language::LanguageCode, types::PrimaryKey};

/// Common key-construction helpers for cached translations.
///
/// Keys carry the deployment prefix, the model's application namespace and the
/// database alias, so deployments sharing a backend and duplicated rows in
/// other databases never collide.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub namespace: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, namespace: &'a str) -> Self {
        Self { prefix, namespace }
    }

    fn root(&self) -> String {
        if self.prefix.is_empty() {
            format!("transom:{}", self.namespace)
        } else {
            format!("{}:transom:{}", self.prefix, self.namespace)
        }
    }

    pub fn translation(&self, model: &str, database: &str, pk: &PrimaryKey, language: &LanguageCode) -> String {
        format!(
            "{}.{}:{}:{}:{}",
            self.root(),
            model,
            escape_segment(database),
            escape_segment(pk.as_str()),
            language
        )
    }
}

/// Escapes `%` and `:` so a segment never introduces a separator of its own.
fn escape_segment(raw: &str) -> Cow<'_, str> {
    if raw.contains(['%', ':']) {
        Cow::Owned(raw.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> LanguageCode {
        LanguageCode::parse("en").unwrap()
    }

    #[test]
    fn builds_translation_keys() {
        let ctx = KeyContext::new("site-a", "blog");
        assert_eq!(
            ctx.translation("article", "default", &PrimaryKey::from("42"), &en()),
            "site-a:transom:blog.article:default:42:en"
        );
    }

    #[test]
    fn omits_empty_prefix() {
        let ctx = KeyContext::new("", "blog");
        assert_eq!(
            ctx.translation("article", "default", &PrimaryKey::from("42"), &en()),
            "transom:blog.article:default:42:en"
        );
    }

    #[test]
    fn database_alias_separates_keys() {
        let ctx = KeyContext::new("", "blog");
        let pk = PrimaryKey::from("42");
        assert_ne!(
            ctx.translation("article", "default", &pk, &en()),
            ctx.translation("article", "other_db", &pk, &en())
        );
    }

    #[test]
    fn separators_inside_segments_do_not_collide() {
        let ctx = KeyContext::new("tests", "blog");
        let split_pk = ctx.translation("article", "a", &PrimaryKey::from("b:c"), &en());
        let split_db = ctx.translation("article", "a:b", &PrimaryKey::from("c"), &en());
        assert_ne!(split_pk, split_db);
        assert_eq!(split_pk, "tests:transom:blog.article:a:b%3Ac:en");
        assert_eq!(split_db, "tests:transom:blog.article:a%3Ab:c:en");

        let escaped = ctx.translation("article", "a", &PrimaryKey::from("b%3Ac"), &en());
        assert_ne!(escaped, split_pk);
    }
}
