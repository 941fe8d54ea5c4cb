//! Per-instance runtime state of a translated master entity.
//!
//! A [`Translatable`] owns the shared attributes, the working set of
//! [`TranslationRecord`]s and the active language. Reads resolve through the
//! working set, then the cache, then storage. Writes stay in memory until
//! [`Translatable::save`].

mod available;
mod context;
mod record;

pub use self::available::{AvailableIter, AvailableLanguages};
pub use self::context::TranslationContext;
pub use self::record::{Provenance, RecordState, TranslationRecord};

use std::{
    collections::{BTreeMap, BTreeSet},
    marker::PhantomData,
};

use log::{debug, trace};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    cache::{CacheIdentity, CacheLookup, CachedTranslation},
    config::{Scope, push_unique},
    errors::{StorageError, TranslationError, TranslationResult},
    language::LanguageCode,
    resolver::ResolveMode,
    routing::{PendingTranslation, SaveRoute, SaveRouter, SaveState},
    storage::Target,
    types::{FieldValues, ModelDescriptor, PrimaryKey, TranslatedModel},
};

/// Outcome of a field read.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    /// Language whose record satisfied the read.
    pub language: LanguageCode,
    pub requested: LanguageCode,
}

impl Resolved {
    pub fn is_fallback(&self) -> bool {
        self.language != self.requested
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub route: SaveRoute,
    pub database: String,
    pub pk: PrimaryKey,
    pub written_languages: Vec<LanguageCode>,
}

/// A master entity of model `M` with its translations.
///
/// Instances are single-owner and not shared across threads while mutated.
pub struct Translatable<M> {
    ctx: TranslationContext,
    descriptor: ModelDescriptor,
    table: String,
    scope: Scope,
    pk: Option<PrimaryKey>,
    shared: FieldValues,
    database: Option<String>,
    last_persisted_pk: Option<PrimaryKey>,
    current_language: Option<LanguageCode>,
    translations: BTreeMap<LanguageCode, TranslationRecord>,
    known_missing: BTreeSet<LanguageCode>,
    resolved_language: Option<LanguageCode>,
    _model: PhantomData<fn() -> M>,
}

impl<M: TranslatedModel> Translatable<M> {
    /// A new, never-saved entity.
    pub fn new(ctx: &TranslationContext, scope: Scope) -> Self {
        let descriptor = M::descriptor();
        let current_language = ctx
            .default_activate()
            .then(|| ctx.config().first_language(&scope).clone());
        Self {
            ctx: ctx.clone(),
            table: descriptor.table(),
            descriptor,
            scope,
            pk: None,
            shared: FieldValues::new(),
            database: None,
            last_persisted_pk: None,
            current_language,
            translations: BTreeMap::new(),
            known_missing: BTreeSet::new(),
            resolved_language: None,
            _model: PhantomData,
        }
    }

    pub fn with_language(ctx: &TranslationContext, scope: Scope, language: &str) -> TranslationResult<Self> {
        let mut entity = Self::new(ctx, scope);
        entity.set_current_language(language)?;
        Ok(entity)
    }

    /// Loads the master row; translations are fetched lazily on first read.
    pub fn load(ctx: &TranslationContext, scope: Scope, database: &str, pk: PrimaryKey) -> TranslationResult<Self> {
        let mut entity = Self::new(ctx, scope);
        let shared = ctx
            .storage()
            .fetch_master(Target::new(database, &entity.table), &pk)?
            .ok_or_else(|| StorageError::RowNotFound {
                table: entity.table.clone(),
                pk: pk.clone(),
            })?;
        entity.shared = shared;
        entity.database = Some(database.to_string());
        entity.pk = Some(pk.clone());
        entity.last_persisted_pk = Some(pk);
        Ok(entity)
    }
}

impl<M> Translatable<M> {
    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn pk(&self) -> Option<&PrimaryKey> {
        self.pk.as_ref()
    }

    /// Changes the in-memory key; the next save routes on the difference.
    pub fn set_pk(&mut self, pk: Option<PrimaryKey>) {
        self.pk = pk;
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn last_persisted_pk(&self) -> Option<&PrimaryKey> {
        self.last_persisted_pk.as_ref()
    }

    pub fn is_persisted(&self) -> bool {
        self.database.is_some() && self.last_persisted_pk.is_some()
    }

    pub fn current_language(&self) -> Option<&LanguageCode> {
        self.current_language.as_ref()
    }

    /// Switches the language targeted by later reads and writes.
    ///
    /// Touches neither cache nor storage. The code must be configured for the
    /// scope, either exactly or through its base language.
    pub fn set_current_language(&mut self, code: &str) -> TranslationResult<()> {
        let language = self.configured(code)?;
        self.current_language = Some(language);
        Ok(())
    }

    /// Language that satisfied the most recent successful field read.
    pub fn resolved_language(&self) -> Option<&LanguageCode> {
        self.resolved_language.as_ref()
    }

    pub fn shared(&self) -> &FieldValues {
        &self.shared
    }

    pub fn shared_field(&self, name: &str) -> Option<&Value> {
        self.shared.get(name)
    }

    pub fn set_shared(&mut self, name: &str, value: impl Into<Value>) {
        self.shared.insert(name.to_string(), value.into());
    }

    /// Working-set languages, without consulting storage.
    pub fn held_languages(&self) -> impl Iterator<Item = &LanguageCode> {
        self.translations.keys()
    }

    /// Reads a field with the field's declared resolution mode.
    pub fn get_field(&mut self, name: &str, language: Option<&str>) -> TranslationResult<Resolved> {
        let mode = self.descriptor.default_mode(name);
        self.get_field_in_mode(name, language, mode)
    }

    /// Resolves a field over the candidate languages of `mode`.
    ///
    /// The first candidate whose record holds a non-null value wins. Fails with
    /// `TranslationMissing` when none does.
    pub fn get_field_in_mode(
        &mut self,
        name: &str,
        language: Option<&str>,
        mode: ResolveMode,
    ) -> TranslationResult<Resolved> {
        self.check_field(name)?;
        let requested = self.target_language(language)?;
        let candidates = self.ctx.resolver().candidates_for(&self.scope, &requested, mode)?;

        for candidate in &candidates {
            if !self.ensure_loaded(candidate)? {
                continue;
            }
            let value = self
                .translations
                .get(candidate)
                .and_then(|record| record.get(name))
                .filter(|value| !value.is_null())
                .cloned();
            if let Some(value) = value {
                if *candidate != requested {
                    trace!("'{name}' of {} resolved via fallback {candidate}", self.descriptor.qualified_name());
                }
                self.resolved_language = Some(candidate.clone());
                return Ok(Resolved {
                    value,
                    language: candidate.clone(),
                    requested,
                });
            }
        }

        Err(TranslationError::TranslationMissing {
            field: Some(name.to_string()),
            language: requested,
            tried: candidates,
        })
    }

    /// Like [`get_field`](Self::get_field), with `default` in place of a missing translation.
    pub fn safe_get_field(&mut self, name: &str, language: Option<&str>, default: Value) -> TranslationResult<Value> {
        match self.get_field(name, language) {
            Ok(resolved) => Ok(resolved.value),
            Err(err) if err.is_missing() => Ok(default),
            Err(err) => Err(err),
        }
    }

    pub fn field_as<T: DeserializeOwned>(&mut self, name: &str, language: Option<&str>) -> TranslationResult<T> {
        let resolved = self.get_field(name, language)?;
        Ok(serde_json::from_value(resolved.value)?)
    }

    /// Writes a field of the target language into the working set.
    ///
    /// Without an explicit language the current one is used; if none is active
    /// the write fails with `FieldAssignedTooEarly`.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>, language: Option<&str>) -> TranslationResult<()> {
        self.check_field(name)?;
        let language = match language {
            Some(raw) => self.configured(raw)?,
            None => self
                .current_language
                .clone()
                .ok_or_else(|| TranslationError::FieldAssignedTooEarly { field: name.to_string() })?,
        };

        // Edits apply on top of a stored row, never replace it.
        if !self.ensure_loaded(&language)? {
            self.translations
                .insert(language.clone(), TranslationRecord::created(language.clone()));
        }
        if let Some(record) = self.translations.get_mut(&language) {
            record.set(name, value.into());
        }
        Ok(())
    }

    pub fn set_field_as<T: Serialize>(&mut self, name: &str, value: &T, language: Option<&str>) -> TranslationResult<()> {
        let value = serde_json::to_value(value)?;
        self.set_field(name, value, language)
    }

    /// Whether a record exists in exactly this language, held or stored.
    pub fn has_translation(&mut self, language: Option<&str>) -> TranslationResult<bool> {
        let language = self.target_language(language)?;
        self.ensure_loaded(&language)
    }

    /// Whether any language visible for `language` has a record.
    pub fn is_visible(&mut self, language: Option<&str>) -> TranslationResult<bool> {
        let language = self.target_language(language)?;
        for choice in self.ctx.config().active_choices(&self.scope, &language) {
            if self.ensure_loaded(&choice)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Languages with a record. Unsaved records are included on request.
    pub fn available_languages(&self, include_unsaved: bool) -> AvailableLanguages {
        let held = self
            .translations
            .values()
            .filter(|record| include_unsaved || record.is_stored())
            .map(|record| record.language().clone())
            .collect();
        let languages = AvailableLanguages::new(held);
        match (self.database.as_deref(), self.last_persisted_pk.as_ref()) {
            (Some(database), Some(pk)) => {
                languages.with_stored(self.ctx.storage_handle(), database, self.table.clone(), pk.clone())
            }
            _ => languages,
        }
    }

    /// The record of a language, loading it if it exists in storage.
    pub fn translation(&mut self, language: Option<&str>) -> TranslationResult<Option<&TranslationRecord>> {
        let language = self.target_language(language)?;
        if self.ensure_loaded(&language)? {
            Ok(self.translations.get(&language))
        } else {
            Ok(None)
        }
    }

    /// Decodes a record into the model's translation type.
    pub fn translation_as(&mut self, language: Option<&str>) -> TranslationResult<M>
    where
        M: DeserializeOwned,
    {
        let language = self.target_language(language)?;
        if !self.ensure_loaded(&language)? {
            return Err(TranslationError::TranslationMissing {
                field: None,
                tried: vec![language.clone()],
                language,
            });
        }
        let values = self
            .translations
            .get(&language)
            .map(|record| record.values().clone())
            .unwrap_or_default();
        Ok(serde_json::from_value(Value::Object(values))?)
    }

    /// Saves into the home database (or the default database on first save).
    pub fn save(&mut self) -> TranslationResult<SaveOutcome> {
        self.save_into(None)
    }

    /// Saves into an explicit database, duplicating under the same key when it is not the home database.
    pub fn save_to(&mut self, database: &str) -> TranslationResult<SaveOutcome> {
        self.save_into(Some(database))
    }

    /// Copies the entity and every translation into `database` under a new key.
    ///
    /// The instance then belongs to the copy; the source row is untouched.
    pub fn duplicate_into(&mut self, database: &str) -> TranslationResult<SaveOutcome> {
        if !self.is_persisted() {
            return Err(TranslationError::NotPersisted {
                operation: "duplicate_into",
            });
        }
        let previous = self.pk.take();
        let outcome = self.save_into(Some(database));
        if outcome.is_err() {
            self.pk = previous;
        }
        outcome
    }

    fn save_into(&mut self, requested: Option<&str>) -> TranslationResult<SaveOutcome> {
        let state = SaveState {
            database: self.database.as_deref(),
            requested_database: requested,
            pk: self.pk.as_ref(),
            last_persisted_pk: self.last_persisted_pk.as_ref(),
        };
        let decision = SaveRouter::new(self.ctx.storage(), &self.table, self.ctx.default_database()).route(&state)?;
        let duplicate = decision.write.is_duplicate();
        if duplicate {
            self.load_all_stored()?;
        }

        let pending: Vec<PendingTranslation<'_>> = self.translations.values().map(TranslationRecord::as_pending).collect();
        let plan = SaveRouter::new(self.ctx.storage(), &self.table, self.ctx.default_database()).plan(
            &decision,
            &self.shared,
            &pending,
        );
        let written = plan.translation_languages();
        let pk = self.ctx.storage().execute(&plan)?;

        let moved = self.database.as_deref() != Some(decision.database.as_str());
        self.database = Some(decision.database.clone());
        self.pk = Some(pk.clone());
        self.last_persisted_pk = Some(pk.clone());
        if duplicate {
            self.known_missing.clear();
        }
        for language in &written {
            self.known_missing.remove(language);
            if let Some(record) = self.translations.get_mut(language) {
                if duplicate && moved {
                    record.mark_carried_over();
                }
                record.mark_saved();
            }
        }

        let identity = CacheIdentity {
            model: &self.descriptor,
            pk: &pk,
            database: &decision.database,
        };
        for language in &written {
            if let Some(record) = self.translations.get(language) {
                self.ctx.cache().put(
                    &identity,
                    language,
                    &CachedTranslation::Present(record.values().clone()),
                )?;
            }
        }

        debug!(
            "saved {} {pk} into '{}' as {} ({} translations written)",
            self.descriptor.qualified_name(),
            decision.database,
            decision.route,
            written.len()
        );
        Ok(SaveOutcome {
            route: decision.route,
            database: decision.database,
            pk,
            written_languages: written,
        })
    }

    /// Deletes one language's stored row and held record.
    ///
    /// Returns the number of stored rows removed. Fails with `TranslationMissing`
    /// when the language existed neither in storage nor in the working set.
    pub fn delete_translation(&mut self, language: &str) -> TranslationResult<usize> {
        let language = LanguageCode::parse(language)?;
        let mut removed = 0;
        if let (Some(database), Some(pk)) = (self.database.as_deref(), self.last_persisted_pk.as_ref()) {
            removed = self
                .ctx
                .storage()
                .delete_translation(Target::new(database, &self.table), pk, &language)?;
            let identity = CacheIdentity {
                model: &self.descriptor,
                pk,
                database,
            };
            self.ctx.cache().invalidate(&identity, &language)?;
            self.known_missing.insert(language.clone());
        }
        let held = self.translations.remove(&language).is_some();

        if removed == 0 && !held {
            return Err(TranslationError::TranslationMissing {
                field: None,
                tried: vec![language.clone()],
                language,
            });
        }
        debug!(
            "deleted translation {language} of {} ({removed} stored rows)",
            self.descriptor.qualified_name()
        );
        Ok(removed)
    }

    /// Deletes the master row and all its translations from the home database.
    ///
    /// The instance becomes unsaved again; held records stay, marked dirty.
    pub fn delete(&mut self) -> TranslationResult<usize> {
        let (Some(database), Some(pk)) = (self.database.clone(), self.last_persisted_pk.clone()) else {
            return Err(TranslationError::NotPersisted { operation: "delete" });
        };
        let target = Target::new(&database, &self.table);
        let mut languages = self.cached_languages();
        for stored in self.ctx.storage().translation_languages(target, &pk)? {
            push_unique(&mut languages, stored);
        }
        let removed = self.ctx.storage().delete_master_cascade(target, &pk)?;
        let identity = CacheIdentity {
            model: &self.descriptor,
            pk: &pk,
            database: &database,
        };
        self.ctx.cache().invalidate_all_for(&identity, &languages)?;

        self.database = None;
        self.pk = None;
        self.last_persisted_pk = None;
        self.known_missing.clear();
        for record in self.translations.values_mut() {
            record.mark_unsaved();
        }
        debug!(
            "deleted {} {pk} from '{database}' ({removed} rows)",
            self.descriptor.qualified_name()
        );
        Ok(removed)
    }

    /// Reloads shared attributes and drops every held record and cache entry.
    ///
    /// Unsaved edits are discarded.
    pub fn refresh(&mut self) -> TranslationResult<()> {
        let (Some(database), Some(pk)) = (self.database.clone(), self.last_persisted_pk.clone()) else {
            return Err(TranslationError::NotPersisted { operation: "refresh" });
        };
        let shared = self
            .ctx
            .storage()
            .fetch_master(Target::new(&database, &self.table), &pk)?
            .ok_or_else(|| StorageError::RowNotFound {
                table: self.table.clone(),
                pk: pk.clone(),
            })?;
        let identity = CacheIdentity {
            model: &self.descriptor,
            pk: &pk,
            database: &database,
        };
        self.ctx.cache().invalidate_all_for(&identity, &self.cached_languages())?;

        self.shared = shared;
        self.pk = Some(pk);
        self.translations.clear();
        self.known_missing.clear();
        self.resolved_language = None;
        Ok(())
    }

    /// Codes whose cache entries may exist for this entity.
    fn cached_languages(&self) -> Vec<LanguageCode> {
        let mut languages = self.ctx.config().all_languages();
        for language in self.translations.keys().chain(self.known_missing.iter()) {
            push_unique(&mut languages, language.clone());
        }
        languages
    }

    fn check_field(&self, name: &str) -> TranslationResult<()> {
        if self.descriptor.has_field(name) {
            Ok(())
        } else {
            Err(TranslationError::UnknownField {
                model: self.descriptor.qualified_name(),
                field: name.to_string(),
            })
        }
    }

    fn configured(&self, raw: &str) -> TranslationResult<LanguageCode> {
        let language = LanguageCode::parse(raw)?;
        if self.ctx.config().is_configured(&self.scope, &language) {
            Ok(language)
        } else {
            Err(TranslationError::UnknownLanguage { code: raw.to_string() })
        }
    }

    /// Explicit language, else the current one, else the scope's first language.
    fn target_language(&self, language: Option<&str>) -> TranslationResult<LanguageCode> {
        match (language, &self.current_language) {
            (Some(raw), _) => LanguageCode::parse(raw),
            (None, Some(current)) => Ok(current.clone()),
            (None, None) => Ok(self.ctx.config().first_language(&self.scope).clone()),
        }
    }

    /// Makes sure a language's record is held if it exists anywhere.
    ///
    /// Looks at the working set, then the known-absent set, then the cache,
    /// then storage. The storage answer, present or absent, is cached.
    fn ensure_loaded(&mut self, language: &LanguageCode) -> TranslationResult<bool> {
        if self.translations.contains_key(language) {
            return Ok(true);
        }
        if self.known_missing.contains(language) {
            return Ok(false);
        }
        match self.fetch_stored(language)? {
            Some(values) => {
                self.translations
                    .insert(language.clone(), TranslationRecord::loaded(language.clone(), values));
                Ok(true)
            }
            None => {
                if self.is_persisted() {
                    self.known_missing.insert(language.clone());
                }
                Ok(false)
            }
        }
    }

    fn fetch_stored(&self, language: &LanguageCode) -> TranslationResult<Option<FieldValues>> {
        let (Some(database), Some(pk)) = (self.database.as_deref(), self.last_persisted_pk.as_ref()) else {
            return Ok(None);
        };
        let identity = CacheIdentity {
            model: &self.descriptor,
            pk,
            database,
        };
        match self.ctx.cache().get(&identity, language)? {
            CacheLookup::Hit(CachedTranslation::Present(values)) => return Ok(Some(values)),
            CacheLookup::Hit(CachedTranslation::Missing) => return Ok(None),
            CacheLookup::NotChecked => {}
        }

        let fetched = self
            .ctx
            .storage()
            .fetch_translation(Target::new(database, &self.table), pk, language)?;
        let entry = match &fetched {
            Some(values) => CachedTranslation::Present(values.clone()),
            None => CachedTranslation::Missing,
        };
        self.ctx.cache().put(&identity, language, &entry)?;
        Ok(fetched)
    }

    /// Loads every stored language not yet held, so a duplicate copies them all.
    fn load_all_stored(&mut self) -> TranslationResult<()> {
        let (Some(database), Some(pk)) = (self.database.clone(), self.last_persisted_pk.clone()) else {
            return Ok(());
        };
        let stored = self
            .ctx
            .storage()
            .translation_languages(Target::new(&database, &self.table), &pk)?;
        for language in stored {
            if !self.translations.contains_key(&language) {
                self.known_missing.remove(&language);
                self.ensure_loaded(&language)?;
            }
        }
        Ok(())
    }
}

impl<M> std::fmt::Debug for Translatable<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translatable")
            .field("model", &self.descriptor.qualified_name())
            .field("scope", &self.scope)
            .field("pk", &self.pk)
            .field("database", &self.database)
            .field("last_persisted_pk", &self.last_persisted_pk)
            .field("current_language", &self.current_language)
            .field("translations", &self.translations.keys().collect::<Vec<_>>())
            .finish()
    }
}
