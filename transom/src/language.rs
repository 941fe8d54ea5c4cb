use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::errors::TranslationError;

/// Accepted shape after normalisation: a 2-3 letter language with optional subtags.
static LANGUAGE_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{2,3}(-[a-z0-9]{1,8})*$").expect("language code pattern compiles"));

/// Undo the differences between language code notations (`EN_us` -> `en-us`).
pub fn normalize_language_code(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('_', "-")
}

/// A normalised language code such as `en`, `fr-ca` or `zh-hant`.
///
/// The code of a translation record never changes after creation, so this type
/// is immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Normalises and validates a code, failing with `UnknownLanguage` when it is malformed.
    pub fn parse(raw: &str) -> Result<Self, TranslationError> {
        let normalized = normalize_language_code(raw);
        if LANGUAGE_CODE_PATTERN.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(TranslationError::UnknownLanguage { code: raw.to_string() })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary language subtag (`fr-ca` -> `fr`).
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    pub fn is_variant(&self) -> bool {
        self.0.contains('-')
    }

    pub fn shares_base_with(&self, other: &LanguageCode) -> bool {
        self.base() == other.base()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LanguageCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for LanguageCode {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq<str> for LanguageCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LanguageCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for LanguageCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LanguageCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        LanguageCode::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_notation() {
        let code = LanguageCode::parse(" EN_us ").unwrap();
        assert_eq!(code.as_str(), "en-us");
        assert_eq!(code.base(), "en");
        assert!(code.is_variant());
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in ["", "e", "english", "en--us", "fr!", "12"] {
            let err = LanguageCode::parse(raw).unwrap_err();
            assert!(matches!(err, TranslationError::UnknownLanguage { .. }), "{raw} should be rejected");
        }
    }

    #[test]
    fn variants_share_base() {
        let fr = LanguageCode::parse("fr").unwrap();
        let fr_ca = LanguageCode::parse("fr-CA").unwrap();
        assert!(fr_ca.shares_base_with(&fr));
        assert!(!fr.is_variant());
    }

    #[test]
    fn deserializes_through_parse() {
        let code: LanguageCode = serde_json::from_str("\"NL_be\"").unwrap();
        assert_eq!(code, "nl-be");
        assert!(serde_json::from_str::<LanguageCode>("\"??\"").is_err());
    }
}
