use serde::Serialize;
use serde_json::Value;

use crate::{language::LanguageCode, routing::PendingTranslation, types::FieldValues};

/// Where a held record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Loaded,
    Created,
    /// Copied from another database by a duplicating save.
    CarriedOver,
}

/// Lifecycle position of a held record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Created,
    Loaded,
    Modified,
    Saved,
}

/// Translated field values of one language, as held by an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRecord {
    language: LanguageCode,
    values: FieldValues,
    dirty: bool,
    provenance: Provenance,
    stored: bool,
    saved: bool,
}

impl TranslationRecord {
    pub(crate) fn created(language: LanguageCode) -> Self {
        Self {
            language,
            values: FieldValues::new(),
            dirty: true,
            provenance: Provenance::Created,
            stored: false,
            saved: false,
        }
    }

    pub(crate) fn loaded(language: LanguageCode, values: FieldValues) -> Self {
        Self {
            language,
            values,
            dirty: false,
            provenance: Provenance::Loaded,
            stored: true,
            saved: false,
        }
    }

    pub fn language(&self) -> &LanguageCode {
        &self.language
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Present and not null. Empty strings, zero and `false` count as populated.
    pub fn is_populated(&self, field: &str) -> bool {
        self.values.get(field).is_some_and(|value| !value.is_null())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Whether a row for this language exists under the entity's home identity.
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    pub fn state(&self) -> RecordState {
        match (self.dirty, self.saved, self.provenance) {
            (true, false, Provenance::Created) => RecordState::Created,
            (true, _, _) => RecordState::Modified,
            (false, true, _) => RecordState::Saved,
            (false, false, _) => RecordState::Loaded,
        }
    }

    pub(crate) fn set(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
        self.dirty = true;
    }

    pub(crate) fn mark_saved(&mut self) {
        self.dirty = false;
        self.stored = true;
        self.saved = true;
    }

    pub(crate) fn mark_carried_over(&mut self) {
        if self.provenance == Provenance::Loaded {
            self.provenance = Provenance::CarriedOver;
        }
    }

    /// The stored row is gone; the values must be written again on the next save.
    pub(crate) fn mark_unsaved(&mut self) {
        self.dirty = true;
        self.stored = false;
    }

    pub(crate) fn as_pending(&self) -> PendingTranslation<'_> {
        PendingTranslation {
            language: &self.language,
            values: &self.values,
            dirty: self.dirty,
            stored: self.stored,
        }
    }
}
