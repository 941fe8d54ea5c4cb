//! Language configuration: per-scope ordered language lists and fallback chains.
//!
//! A [`LanguageConfig`] is built once from [`TransomSettings`] (or the builder),
//! validated eagerly, and then shared read-only.

mod settings;

pub use settings::{RawLanguage, RawLanguageDefaults, RawLanguages, TransomSettings};

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ConfigError, ConfigIssue},
    language::LanguageCode,
};

/// Configuration namespace, e.g. a site identifier or a single global scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn global() -> Self {
        Self::new("global")
    }

    pub fn site(id: u64) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Resolved settings of one language within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageSettings {
    pub code: LanguageCode,
    pub fallbacks: Vec<LanguageCode>,
    pub hide_untranslated: bool,
}

/// Validated, immutable language configuration.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageConfig {
    default: LanguageSettings,
    scopes: BTreeMap<Scope, Vec<LanguageSettings>>,
}

impl LanguageConfig {
    pub fn builder(default_language: &str) -> LanguageConfigBuilder {
        LanguageConfigBuilder::new(default_language)
    }

    pub fn from_settings(settings: &TransomSettings) -> Result<Self, ConfigError> {
        Self::from_raw(&settings.default_language, &settings.languages)
    }

    /// Applies defaults, normalises codes and rejects invalid or cyclic chains.
    pub fn from_raw(default_language: &str, raw: &RawLanguages) -> Result<Self, ConfigError> {
        let mut issues = Vec::new();

        let default_code_raw = raw.default.code.as_deref().unwrap_or(default_language);
        let default_code = parse_code(default_code_raw, "languages.default.code", &mut issues);
        let default_fallbacks_raw = raw
            .default
            .explicit_fallbacks()
            .unwrap_or_else(|| vec![default_code_raw.to_string()]);
        let default_fallbacks: Vec<LanguageCode> = default_fallbacks_raw
            .iter()
            .enumerate()
            .filter_map(|(i, code)| parse_code(code, &format!("languages.default.fallbacks[{i}]"), &mut issues))
            .collect();
        let default_hide = raw.default.hide_untranslated.unwrap_or(false);

        let mut scopes = BTreeMap::new();
        for (scope_name, entries) in &raw.scopes {
            let path = format!("languages.{scope_name}");
            if entries.is_empty() {
                issues.push(ConfigIssue::new(
                    path.clone(),
                    "config.no_languages",
                    "scope has an empty language list",
                ));
                continue;
            }

            let mut seen = BTreeSet::new();
            let mut languages = Vec::with_capacity(entries.len());
            for (i, entry) in entries.iter().enumerate() {
                let entry_path = format!("{path}[{i}]");
                let Some(code) = parse_code(&entry.code, &format!("{entry_path}.code"), &mut issues) else {
                    continue;
                };
                if !seen.insert(code.clone()) {
                    issues.push(ConfigIssue::new(
                        format!("{entry_path}.code"),
                        "config.duplicate_code",
                        format!("language '{code}' is listed twice"),
                    ));
                    continue;
                }

                let fallbacks = match entry.explicit_fallbacks() {
                    Some(explicit) => {
                        let mut parsed = Vec::with_capacity(explicit.len());
                        for (j, raw_code) in explicit.iter().enumerate() {
                            let fallback_path = format!("{entry_path}.fallbacks[{j}]");
                            let Some(fallback) = parse_code(raw_code, &fallback_path, &mut issues) else {
                                continue;
                            };
                            if fallback == code {
                                issues.push(ConfigIssue::new(
                                    fallback_path,
                                    "config.self_fallback",
                                    format!("language '{code}' falls back to itself"),
                                ));
                                continue;
                            }
                            push_unique(&mut parsed, fallback);
                        }
                        parsed
                    }
                    // Inherited chains silently skip the entry's own code.
                    None => default_fallbacks
                        .iter()
                        .filter(|fallback| **fallback != code)
                        .cloned()
                        .fold(Vec::new(), |mut acc, fallback| {
                            push_unique(&mut acc, fallback);
                            acc
                        }),
                };

                languages.push(LanguageSettings {
                    code,
                    fallbacks,
                    hide_untranslated: entry.hide_untranslated.unwrap_or(default_hide),
                });
            }

            if let Some(cycle) = find_fallback_cycle(&languages) {
                let rendered: Vec<&str> = cycle.iter().map(LanguageCode::as_str).collect();
                issues.push(ConfigIssue::new(
                    path.clone(),
                    "config.fallback_cycle",
                    format!("fallback chains form a cycle: {}", rendered.join(" -> ")),
                ));
            }

            scopes.insert(Scope::new(scope_name.clone()), languages);
        }

        match default_code {
            Some(code) if issues.is_empty() => Ok(Self {
                default: LanguageSettings {
                    code,
                    fallbacks: default_fallbacks,
                    hide_untranslated: default_hide,
                },
                scopes,
            }),
            _ => Err(ConfigError::new(issues)),
        }
    }

    /// The deployment-wide default language code.
    pub fn default_language(&self) -> &LanguageCode {
        &self.default.code
    }

    pub fn defaults(&self) -> &LanguageSettings {
        &self.default
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.keys()
    }

    pub fn has_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains_key(scope)
    }

    /// Languages of a scope in configured order.
    ///
    /// An unconfigured scope behaves as a single-language deployment of the default code.
    pub fn languages(&self, scope: &Scope) -> &[LanguageSettings] {
        match self.scopes.get(scope) {
            Some(languages) => languages,
            None => std::slice::from_ref(&self.default),
        }
    }

    /// Settings for a code: exact match, then a variant sharing its base, then the defaults.
    pub fn get_language(&self, scope: &Scope, code: &LanguageCode) -> &LanguageSettings {
        let languages = self.languages(scope);
        languages
            .iter()
            .find(|settings| settings.code == *code)
            .or_else(|| languages.iter().find(|settings| settings.code.shares_base_with(code)))
            .unwrap_or(&self.default)
    }

    /// Whether the code, or its base language, is configured for the scope.
    pub fn is_configured(&self, scope: &Scope, code: &LanguageCode) -> bool {
        self.languages(scope)
            .iter()
            .any(|settings| settings.code == *code || settings.code.shares_base_with(code))
    }

    /// The configured chain for a language, never containing the language itself.
    pub fn fallback_chain(&self, scope: &Scope, code: &LanguageCode) -> Vec<LanguageCode> {
        self.get_language(scope, code)
            .fallbacks
            .iter()
            .filter(|fallback| *fallback != code)
            .cloned()
            .collect()
    }

    /// Languages visible for a request: the language itself plus its fallbacks,
    /// unless untranslated content is hidden for it.
    pub fn active_choices(&self, scope: &Scope, code: &LanguageCode) -> Vec<LanguageCode> {
        let settings = self.get_language(scope, code);
        let mut choices = vec![code.clone()];
        if !settings.hide_untranslated {
            for fallback in self.fallback_chain(scope, code) {
                push_unique(&mut choices, fallback);
            }
        }
        choices
    }

    pub fn fallback_languages(&self, scope: &Scope, code: &LanguageCode) -> Vec<LanguageCode> {
        self.active_choices(scope, code).split_off(1)
    }

    /// First configured language of the scope, e.g. for the first tab of an editor.
    pub fn first_language(&self, scope: &Scope) -> &LanguageCode {
        self.languages(scope)
            .first()
            .map(|settings| &settings.code)
            .unwrap_or(&self.default.code)
    }

    /// Every code mentioned anywhere, in a deterministic order.
    ///
    /// Used to enumerate cache keys without a secondary index.
    pub fn all_languages(&self) -> Vec<LanguageCode> {
        let mut codes = vec![self.default.code.clone()];
        for fallback in &self.default.fallbacks {
            push_unique(&mut codes, fallback.clone());
        }
        for languages in self.scopes.values() {
            for settings in languages {
                push_unique(&mut codes, settings.code.clone());
                for fallback in &settings.fallbacks {
                    push_unique(&mut codes, fallback.clone());
                }
            }
        }
        codes
    }
}

/// Programmatic construction, validated by the same rules as settings files.
#[derive(Debug, Clone)]
pub struct LanguageConfigBuilder {
    default_language: String,
    raw: RawLanguages,
}

impl LanguageConfigBuilder {
    pub fn new(default_language: &str) -> Self {
        Self {
            default_language: default_language.to_string(),
            raw: RawLanguages::default(),
        }
    }

    /// Fallbacks inherited by languages that do not declare their own.
    pub fn default_fallbacks(mut self, codes: &[&str]) -> Self {
        self.raw.default.fallbacks = Some(codes.iter().map(|code| code.to_string()).collect());
        self
    }

    pub fn hide_untranslated(mut self, hide: bool) -> Self {
        self.raw.default.hide_untranslated = Some(hide);
        self
    }

    /// Adds a language that inherits the default chain.
    pub fn language(mut self, scope: &str, code: &str) -> Self {
        self.raw
            .scopes
            .entry(scope.to_string())
            .or_default()
            .push(RawLanguage::new(code));
        self
    }

    pub fn language_with_fallbacks(mut self, scope: &str, code: &str, fallbacks: &[&str]) -> Self {
        let mut entry = RawLanguage::new(code);
        entry.fallbacks = Some(fallbacks.iter().map(|code| code.to_string()).collect());
        self.raw.scopes.entry(scope.to_string()).or_default().push(entry);
        self
    }

    pub fn push(mut self, scope: &str, entry: RawLanguage) -> Self {
        self.raw.scopes.entry(scope.to_string()).or_default().push(entry);
        self
    }

    /// Registers a scope with no languages; rejected by `build`.
    pub fn empty_scope(mut self, scope: &str) -> Self {
        self.raw.scopes.entry(scope.to_string()).or_default();
        self
    }

    pub fn build(self) -> Result<LanguageConfig, ConfigError> {
        LanguageConfig::from_raw(&self.default_language, &self.raw)
    }
}

fn parse_code(raw: &str, path: &str, issues: &mut Vec<ConfigIssue>) -> Option<LanguageCode> {
    match LanguageCode::parse(raw) {
        Ok(code) => Some(code),
        Err(_) => {
            issues.push(ConfigIssue::new(
                path,
                "config.invalid_code",
                format!("'{raw}' is not a valid language code"),
            ));
            None
        }
    }
}

pub(crate) fn push_unique(codes: &mut Vec<LanguageCode>, code: LanguageCode) {
    if !codes.contains(&code) {
        codes.push(code);
    }
}

/// Depth-first search over the scope's fallback edges.
///
/// Codes that have no entry of their own are leaves.
fn find_fallback_cycle(languages: &[LanguageSettings]) -> Option<Vec<LanguageCode>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        code: &'a LanguageCode,
        edges: &HashMap<&'a LanguageCode, &'a [LanguageCode]>,
        marks: &mut HashMap<&'a LanguageCode, Mark>,
        path: &mut Vec<&'a LanguageCode>,
    ) -> Option<Vec<LanguageCode>> {
        match marks.get(code) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => {
                let start = path.iter().position(|step| *step == code).unwrap_or(0);
                let mut cycle: Vec<LanguageCode> = path[start..].iter().map(|step| (*step).clone()).collect();
                cycle.push(code.clone());
                return Some(cycle);
            }
            None => {}
        }

        marks.insert(code, Mark::Visiting);
        path.push(code);
        if let Some(next) = edges.get(code).copied() {
            for fallback in next {
                if let Some(cycle) = visit(fallback, edges, marks, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        marks.insert(code, Mark::Done);
        None
    }

    let edges: HashMap<&LanguageCode, &[LanguageCode]> = languages
        .iter()
        .map(|settings| (&settings.code, settings.fallbacks.as_slice()))
        .collect();
    let mut marks = HashMap::new();
    for settings in languages {
        let mut path = Vec::new();
        if let Some(cycle) = visit(&settings.code, &edges, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> LanguageCode {
        LanguageCode::parse(raw).unwrap()
    }

    fn sample() -> LanguageConfig {
        LanguageConfig::builder("en")
            .default_fallbacks(&["en"])
            .language("global", "en")
            .language_with_fallbacks("global", "fr", &["en"])
            .language_with_fallbacks("global", "de", &["fr", "en"])
            .language("global", "nl")
            .build()
            .unwrap()
    }

    #[test]
    fn inherited_chain_skips_own_code() {
        let config = sample();
        let en = config.get_language(&Scope::global(), &code("en"));
        assert!(en.fallbacks.is_empty());
        let nl = config.get_language(&Scope::global(), &code("nl"));
        assert_eq!(nl.fallbacks, vec![code("en")]);
    }

    #[test]
    fn variants_match_their_base_language() {
        let config = sample();
        let settings = config.get_language(&Scope::global(), &code("fr-ca"));
        assert_eq!(settings.code, "fr");
        assert!(config.is_configured(&Scope::global(), &code("fr-ca")));
        assert!(!config.is_configured(&Scope::global(), &code("es")));
    }

    #[test]
    fn unknown_scope_behaves_as_single_language_site() {
        let config = sample();
        let scope = Scope::site(42);
        assert_eq!(config.languages(&scope).len(), 1);
        assert_eq!(config.first_language(&scope), &code("en"));
        assert!(config.is_configured(&scope, &code("en")));
        assert!(!config.is_configured(&scope, &code("fr")));
    }

    #[test]
    fn active_choices_honour_hide_untranslated() {
        let config = LanguageConfig::builder("en")
            .hide_untranslated(true)
            .language("global", "en")
            .language_with_fallbacks("global", "fr", &["en"])
            .build()
            .unwrap();
        assert_eq!(config.active_choices(&Scope::global(), &code("fr")), vec![code("fr")]);

        let visible = sample();
        assert_eq!(
            visible.active_choices(&Scope::global(), &code("de")),
            vec![code("de"), code("fr"), code("en")]
        );
        assert_eq!(visible.fallback_languages(&Scope::global(), &code("de")), vec![code("fr"), code("en")]);
    }

    #[test]
    fn rejects_explicit_self_fallback() {
        let err = LanguageConfig::builder("en")
            .language_with_fallbacks("global", "fr", &["fr"])
            .build()
            .unwrap_err();
        assert!(err.has_code("config.self_fallback"));
    }

    #[test]
    fn rejects_fallback_cycles() {
        let err = LanguageConfig::builder("en")
            .language_with_fallbacks("global", "fr", &["de"])
            .language_with_fallbacks("global", "de", &["nl"])
            .language_with_fallbacks("global", "nl", &["fr"])
            .build()
            .unwrap_err();
        assert!(err.has_code("config.fallback_cycle"));
        let issue = err.issues.iter().find(|issue| issue.code == "config.fallback_cycle").unwrap();
        assert!(issue.message.contains("fr -> de -> nl -> fr"), "{}", issue.message);
    }

    #[test]
    fn rejects_empty_scopes_and_bad_codes() {
        let err = LanguageConfig::builder("en")
            .empty_scope("site-b")
            .language("global", "not a code")
            .language("global", "en")
            .language("global", "EN")
            .build()
            .unwrap_err();
        assert!(err.has_code("config.no_languages"));
        assert!(err.has_code("config.invalid_code"));
        assert!(err.has_code("config.duplicate_code"));
    }

    #[test]
    fn all_languages_is_deterministic() {
        let config = sample();
        assert_eq!(
            config.all_languages(),
            vec![code("en"), code("fr"), code("de"), code("nl")]
        );
    }
}
