//! Candidate-language computation for reads.

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    config::{LanguageConfig, Scope, push_unique},
    errors::{ConfigError, TranslationError},
    language::LanguageCode,
};

/// How far a read may stray from the requested language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Only the requested language.
    Strict,
    /// The requested language, then its configured chain.
    #[default]
    Fallback,
    /// The fallback candidates, then every other language of the scope.
    ///
    /// Which language wins differs between objects; ties follow configured order.
    AnyLanguage,
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolveMode::Strict => "strict",
            ResolveMode::Fallback => "fallback",
            ResolveMode::AnyLanguage => "any_language",
        };
        f.write_str(name)
    }
}

impl FromStr for ResolveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(ResolveMode::Strict),
            "fallback" => Ok(ResolveMode::Fallback),
            "any" | "any_language" => Ok(ResolveMode::AnyLanguage),
            other => Err(format!("unknown resolve mode '{other}'")),
        }
    }
}

/// Computes the ordered, duplicate-free list of languages to try for a read.
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    config: Arc<LanguageConfig>,
}

impl FallbackResolver {
    pub fn new(config: Arc<LanguageConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LanguageConfig {
        &self.config
    }

    /// Parses the requested code and computes its candidates.
    pub fn candidates(
        &self,
        scope: &Scope,
        requested: &str,
        mode: ResolveMode,
    ) -> Result<Vec<LanguageCode>, TranslationError> {
        let code = LanguageCode::parse(requested)?;
        self.candidates_for(scope, &code, mode)
    }

    pub fn candidates_for(
        &self,
        scope: &Scope,
        requested: &LanguageCode,
        mode: ResolveMode,
    ) -> Result<Vec<LanguageCode>, TranslationError> {
        let languages = self.config.languages(scope);
        if languages.is_empty() {
            return Err(ConfigError::single(
                format!("languages.{scope}"),
                "config.no_languages",
                "scope has an empty language list",
            )
            .into());
        }

        let mut candidates = vec![requested.clone()];
        if mode == ResolveMode::Strict {
            return Ok(candidates);
        }

        for fallback in self.config.fallback_chain(scope, requested) {
            push_unique(&mut candidates, fallback);
        }
        if mode == ResolveMode::AnyLanguage {
            for settings in languages {
                push_unique(&mut candidates, settings.code.clone());
            }
        }
        Ok(candidates)
    }
}
