use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use log::debug;

use super::{Storage, Target, WritePlan, execute_plan};
use crate::{
    errors::StorageError,
    id::generate_primary_key,
    language::LanguageCode,
    types::{FieldValues, PrimaryKey},
};

#[derive(Debug, Clone, Default)]
struct Row {
    attrs: FieldValues,
    translations: BTreeMap<LanguageCode, FieldValues>,
}

#[derive(Debug, Clone, Default)]
struct Database {
    tables: HashMap<String, BTreeMap<PrimaryKey, Row>>,
}

impl Database {
    fn row(&self, table: &str, pk: &PrimaryKey) -> Option<&Row> {
        self.tables.get(table).and_then(|rows| rows.get(pk))
    }

    fn row_mut(&mut self, table: &str, pk: &PrimaryKey) -> Result<&mut Row, StorageError> {
        self.tables
            .get_mut(table)
            .and_then(|rows| rows.get_mut(pk))
            .ok_or_else(|| StorageError::RowNotFound {
                table: table.to_string(),
                pk: pk.clone(),
            })
    }

    fn insert_master(
        &mut self,
        table: &str,
        pk: Option<&PrimaryKey>,
        attrs: &FieldValues,
    ) -> Result<PrimaryKey, StorageError> {
        let rows = self.tables.entry(table.to_string()).or_default();
        let pk = match pk {
            Some(pk) if rows.contains_key(pk) => {
                return Err(StorageError::DuplicateKey {
                    table: table.to_string(),
                    pk: pk.clone(),
                });
            }
            Some(pk) => pk.clone(),
            None => loop {
                let candidate = generate_primary_key();
                if !rows.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        rows.insert(
            pk.clone(),
            Row {
                attrs: attrs.clone(),
                translations: BTreeMap::new(),
            },
        );
        Ok(pk)
    }

    fn update_master(&mut self, table: &str, pk: &PrimaryKey, attrs: &FieldValues) -> Result<(), StorageError> {
        self.row_mut(table, pk)?.attrs = attrs.clone();
        Ok(())
    }

    fn insert_translation(
        &mut self,
        table: &str,
        pk: &PrimaryKey,
        language: &LanguageCode,
        values: &FieldValues,
    ) -> Result<(), StorageError> {
        let row = self.row_mut(table, pk)?;
        if row.translations.contains_key(language) {
            return Err(StorageError::DuplicateTranslation {
                table: table.to_string(),
                pk: pk.clone(),
                language: language.clone(),
            });
        }
        row.translations.insert(language.clone(), values.clone());
        Ok(())
    }

    fn update_translation(
        &mut self,
        table: &str,
        pk: &PrimaryKey,
        language: &LanguageCode,
        values: &FieldValues,
    ) -> Result<(), StorageError> {
        let row = self.row_mut(table, pk)?;
        match row.translations.get_mut(language) {
            Some(stored) => {
                *stored = values.clone();
                Ok(())
            }
            None => Err(StorageError::TranslationNotFound {
                table: table.to_string(),
                pk: pk.clone(),
                language: language.clone(),
            }),
        }
    }
}

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct StorageStats {
    master_fetches: AtomicUsize,
    translation_fetches: AtomicUsize,
    existence_checks: AtomicUsize,
    language_listings: AtomicUsize,
    row_writes: AtomicUsize,
    plans: AtomicUsize,
}

/// Point-in-time copy of [`StorageStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStatsSnapshot {
    pub master_fetches: usize,
    pub translation_fetches: usize,
    pub existence_checks: usize,
    pub language_listings: usize,
    pub row_writes: usize,
    pub plans: usize,
}

impl StorageStats {
    pub fn snapshot(&self) -> StorageStatsSnapshot {
        StorageStatsSnapshot {
            master_fetches: self.master_fetches.load(Ordering::Relaxed),
            translation_fetches: self.translation_fetches.load(Ordering::Relaxed),
            existence_checks: self.existence_checks.load(Ordering::Relaxed),
            language_listings: self.language_listings.load(Ordering::Relaxed),
            row_writes: self.row_writes.load(Ordering::Relaxed),
            plans: self.plans.load(Ordering::Relaxed),
        }
    }

    pub fn translation_fetches(&self) -> usize {
        self.translation_fetches.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        for counter in [
            &self.master_fetches,
            &self.translation_fetches,
            &self.existence_checks,
            &self.language_listings,
            &self.row_writes,
            &self.plans,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// In-process storage with one isolated database per alias.
#[derive(Debug)]
pub struct MemoryStorage {
    databases: RwLock<HashMap<String, Database>>,
    stats: StorageStats,
}

impl MemoryStorage {
    /// Creates storage with the given database aliases; any other alias is rejected.
    pub fn new<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            databases: RwLock::new(
                aliases
                    .into_iter()
                    .map(|alias| (alias.into(), Database::default()))
                    .collect(),
            ),
            stats: StorageStats::default(),
        }
    }

    pub fn stats(&self) -> &StorageStats {
        &self.stats
    }

    pub fn master_count(&self, target: Target<'_>) -> Result<usize, StorageError> {
        self.read(target.database, |db| {
            Ok(db.tables.get(target.table).map_or(0, BTreeMap::len))
        })
    }

    pub fn translation_count(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<usize, StorageError> {
        self.read(target.database, |db| {
            Ok(db.row(target.table, pk).map_or(0, |row| row.translations.len()))
        })
    }

    fn read<T>(&self, database: &str, f: impl FnOnce(&Database) -> Result<T, StorageError>) -> Result<T, StorageError> {
        let databases = self.databases.read().unwrap_or_else(PoisonError::into_inner);
        let db = databases.get(database).ok_or_else(|| unknown_database(database))?;
        f(db)
    }

    fn write<T>(
        &self,
        database: &str,
        f: impl FnOnce(&mut Database) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut databases = self.databases.write().unwrap_or_else(PoisonError::into_inner);
        let db = databases.get_mut(database).ok_or_else(|| unknown_database(database))?;
        StorageStats::bump(&self.stats.row_writes);
        f(db)
    }
}

fn unknown_database(database: &str) -> StorageError {
    StorageError::UnknownDatabase {
        database: database.to_string(),
    }
}

impl Storage for MemoryStorage {
    fn insert_master(
        &self,
        target: Target<'_>,
        pk: Option<&PrimaryKey>,
        attrs: &FieldValues,
    ) -> Result<PrimaryKey, StorageError> {
        self.write(target.database, |db| db.insert_master(target.table, pk, attrs))
    }

    fn update_master(&self, target: Target<'_>, pk: &PrimaryKey, attrs: &FieldValues) -> Result<(), StorageError> {
        self.write(target.database, |db| db.update_master(target.table, pk, attrs))
    }

    fn fetch_master(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<Option<FieldValues>, StorageError> {
        StorageStats::bump(&self.stats.master_fetches);
        self.read(target.database, |db| Ok(db.row(target.table, pk).map(|row| row.attrs.clone())))
    }

    fn exists(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<bool, StorageError> {
        StorageStats::bump(&self.stats.existence_checks);
        self.read(target.database, |db| Ok(db.row(target.table, pk).is_some()))
    }

    fn insert_translation(
        &self,
        target: Target<'_>,
        pk: &PrimaryKey,
        language: &LanguageCode,
        values: &FieldValues,
    ) -> Result<(), StorageError> {
        self.write(target.database, |db| db.insert_translation(target.table, pk, language, values))
    }

    fn update_translation(
        &self,
        target: Target<'_>,
        pk: &PrimaryKey,
        language: &LanguageCode,
        values: &FieldValues,
    ) -> Result<(), StorageError> {
        self.write(target.database, |db| db.update_translation(target.table, pk, language, values))
    }

    fn delete_translation(
        &self,
        target: Target<'_>,
        pk: &PrimaryKey,
        language: &LanguageCode,
    ) -> Result<usize, StorageError> {
        self.write(target.database, |db| {
            let removed = db
                .tables
                .get_mut(target.table)
                .and_then(|rows| rows.get_mut(pk))
                .and_then(|row| row.translations.remove(language));
            Ok(usize::from(removed.is_some()))
        })
    }

    fn delete_master_cascade(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<usize, StorageError> {
        self.write(target.database, |db| {
            let removed = db.tables.get_mut(target.table).and_then(|rows| rows.remove(pk));
            Ok(removed.map_or(0, |row| 1 + row.translations.len()))
        })
    }

    fn fetch_translation(
        &self,
        target: Target<'_>,
        pk: &PrimaryKey,
        language: &LanguageCode,
    ) -> Result<Option<FieldValues>, StorageError> {
        StorageStats::bump(&self.stats.translation_fetches);
        self.read(target.database, |db| {
            Ok(db
                .row(target.table, pk)
                .and_then(|row| row.translations.get(language))
                .cloned())
        })
    }

    fn translation_languages(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<Vec<LanguageCode>, StorageError> {
        StorageStats::bump(&self.stats.language_listings);
        self.read(target.database, |db| {
            Ok(db
                .row(target.table, pk)
                .map(|row| row.translations.keys().cloned().collect())
                .unwrap_or_default())
        })
    }

    /// Stages the plan on a copy of the database and swaps it in only on success.
    ///
    /// The copy costs a full clone of the target database per save, which is
    /// accepted for an in-process backend.
    fn execute(&self, plan: &WritePlan) -> Result<PrimaryKey, StorageError> {
        StorageStats::bump(&self.stats.plans);
        let mut databases = self.databases.write().unwrap_or_else(PoisonError::into_inner);
        let current = databases
            .get(&plan.database)
            .ok_or_else(|| unknown_database(&plan.database))?;

        let staging = MemoryStorage {
            databases: RwLock::new(HashMap::from([(plan.database.clone(), current.clone())])),
            stats: StorageStats::default(),
        };
        let pk = execute_plan(&staging, plan)?;
        let staged = staging
            .databases
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&plan.database)
            .ok_or_else(|| unknown_database(&plan.database))?;

        self.stats.row_writes.fetch_add(plan.ops.len(), Ordering::Relaxed);
        databases.insert(plan.database.clone(), staged);
        debug!(
            "applied {} writes to {} in '{}' for row {pk}",
            plan.ops.len(),
            plan.table,
            plan.database
        );
        Ok(pk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::WriteOp;
    use serde_json::json;

    fn values(title: &str) -> FieldValues {
        let mut values = FieldValues::new();
        values.insert("title".to_string(), json!(title));
        values
    }

    fn en() -> LanguageCode {
        LanguageCode::parse("en").unwrap()
    }

    #[test]
    fn rejects_unknown_database() {
        let storage = MemoryStorage::new(["default"]);
        let err = storage
            .exists(Target::new("elsewhere", "blog_article"), &PrimaryKey::from("1"))
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownDatabase { .. }));
    }

    #[test]
    fn cascade_removes_translations() {
        let storage = MemoryStorage::new(["default"]);
        let target = Target::new("default", "blog_article");
        let pk = storage.insert_master(target, None, &FieldValues::new()).unwrap();
        storage.insert_translation(target, &pk, &en(), &values("Hello")).unwrap();
        assert_eq!(storage.delete_master_cascade(target, &pk).unwrap(), 2);
        assert!(!storage.exists(target, &pk).unwrap());
        assert_eq!(storage.fetch_translation(target, &pk, &en()).unwrap(), None);
    }

    #[test]
    fn failed_plan_leaves_database_untouched() {
        let storage = MemoryStorage::new(["default"]);
        let target = Target::new("default", "blog_article");
        let pk = storage.insert_master(target, Some(&PrimaryKey::from("7")), &values("kept")).unwrap();

        let mut plan = WritePlan::new("default", "blog_article");
        plan.push(WriteOp::UpdateMaster {
            pk: pk.clone(),
            attrs: values("changed"),
        });
        plan.push(WriteOp::UpdateTranslation {
            language: en(),
            values: values("missing row"),
        });
        let err = storage.execute(&plan).unwrap_err();
        assert!(matches!(err, StorageError::TranslationNotFound { .. }));
        assert_eq!(storage.fetch_master(target, &pk).unwrap(), Some(values("kept")));
    }

    #[test]
    fn plan_writes_land_only_in_the_target_database() {
        let storage = MemoryStorage::new(["default", "other"]);
        let mut plan = WritePlan::new("other", "blog_article");
        plan.push(WriteOp::InsertMaster {
            pk: Some(PrimaryKey::from("5")),
            attrs: values("master"),
        });
        plan.push(WriteOp::InsertTranslation {
            language: en(),
            values: values("Hello"),
        });
        storage.stats().reset();

        let pk = storage.execute(&plan).unwrap();
        assert_eq!(pk, PrimaryKey::from("5"));
        let other = Target::new("other", "blog_article");
        assert_eq!(storage.fetch_translation(other, &pk, &en()).unwrap(), Some(values("Hello")));
        assert_eq!(storage.master_count(Target::new("default", "blog_article")).unwrap(), 0);

        let stats = storage.stats().snapshot();
        assert_eq!(stats.plans, 1);
        assert_eq!(stats.row_writes, 2);

        let err = storage.execute(&plan).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { .. }));
        assert_eq!(storage.translation_count(other, &pk).unwrap(), 1);
    }

    #[test]
    fn duplicate_translation_is_rejected() {
        let storage = MemoryStorage::new(["default"]);
        let target = Target::new("default", "blog_article");
        let pk = storage.insert_master(target, None, &FieldValues::new()).unwrap();
        storage.insert_translation(target, &pk, &en(), &values("a")).unwrap();
        let err = storage.insert_translation(target, &pk, &en(), &values("b")).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateTranslation { .. }));
    }

    #[test]
    fn counts_fetches() {
        let storage = MemoryStorage::new(["default"]);
        let target = Target::new("default", "blog_article");
        let pk = PrimaryKey::from("1");
        storage.fetch_translation(target, &pk, &en()).unwrap();
        storage.fetch_translation(target, &pk, &en()).unwrap();
        assert_eq!(storage.stats().translation_fetches(), 2);
        storage.stats().reset();
        assert_eq!(storage.stats().snapshot(), StorageStatsSnapshot::default());
    }
}
