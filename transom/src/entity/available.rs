use std::sync::Arc;

use crate::{
    errors::{TranslationError, TranslationResult},
    language::LanguageCode,
    storage::{Storage, Target},
    types::PrimaryKey,
};

#[derive(Clone)]
struct StoredRows {
    storage: Arc<dyn Storage>,
    database: String,
    table: String,
    pk: PrimaryKey,
}

/// Languages with a translation, as a restartable sequence.
///
/// Held languages are yielded first; storage is only listed once iteration
/// moves past them, and again on every new pass.
#[derive(Clone)]
pub struct AvailableLanguages {
    held: Vec<LanguageCode>,
    stored: Option<StoredRows>,
}

impl AvailableLanguages {
    pub(crate) fn new(held: Vec<LanguageCode>) -> Self {
        Self {
            held,
            stored: None,
        }
    }

    pub(crate) fn with_stored(
        mut self,
        storage: Arc<dyn Storage>,
        database: impl Into<String>,
        table: impl Into<String>,
        pk: PrimaryKey,
    ) -> Self {
        self.stored = Some(StoredRows {
            storage,
            database: database.into(),
            table: table.into(),
            pk,
        });
        self
    }

    pub fn iter(&self) -> AvailableIter<'_> {
        AvailableIter {
            languages: self,
            position: 0,
            listed: None,
            finished: false,
        }
    }

    /// Runs one full pass.
    pub fn to_vec(&self) -> TranslationResult<Vec<LanguageCode>> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &'a AvailableLanguages {
    type Item = TranslationResult<LanguageCode>;
    type IntoIter = AvailableIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for AvailableLanguages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailableLanguages")
            .field("held", &self.held)
            .field("lists_storage", &self.stored.is_some())
            .finish()
    }
}

pub struct AvailableIter<'a> {
    languages: &'a AvailableLanguages,
    position: usize,
    listed: Option<std::vec::IntoIter<LanguageCode>>,
    finished: bool,
}

impl Iterator for AvailableIter<'_> {
    type Item = TranslationResult<LanguageCode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(code) = self.languages.held.get(self.position) {
            self.position += 1;
            return Some(Ok(code.clone()));
        }

        if self.listed.is_none() {
            let Some(stored) = &self.languages.stored else {
                self.finished = true;
                return None;
            };
            let target = Target::new(&stored.database, &stored.table);
            match stored.storage.translation_languages(target, &stored.pk) {
                Ok(codes) => self.listed = Some(codes.into_iter()),
                Err(err) => {
                    self.finished = true;
                    return Some(Err(TranslationError::from(err)));
                }
            }
        }

        let listed = self.listed.as_mut()?;
        for code in listed.by_ref() {
            if !self.languages.held.contains(&code) {
                return Some(Ok(code));
            }
        }
        self.finished = true;
        None
    }
}
