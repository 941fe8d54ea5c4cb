//! Save classification and write-plan construction.
//!
//! Every save is classified from the instance's database provenance before any
//! row is touched:
//!
//! | home db | requested db | pk                         | last persisted | route                          |
//! |---------|--------------|----------------------------|----------------|--------------------------------|
//! | none    | any          | any                        | none           | first save                     |
//! | set     | any          | any                        | none           | invariant violation            |
//! | set     | same         | == last persisted          | set            | regular update                 |
//! | set     | same         | != last persisted or none  | set            | overwrite-or-duplicate, same db|
//! | set     | different    | == last persisted or none  | set            | duplicate into new db          |
//! | set     | different    | other                      | set            | overwrite-or-duplicate, new db |
//!
//! Every duplicating route with a key checks the destination: an absent row
//! becomes a duplicate under that same key, an existing row is refused. A
//! duplicate without a key gets one from storage.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::{
    errors::{TranslationError, TranslationResult},
    language::LanguageCode,
    storage::{Storage, Target, WriteOp, WritePlan},
    types::{FieldValues, PrimaryKey},
};

/// Database provenance of an instance at save time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveState<'a> {
    /// Database the instance considers home; `None` before the first save.
    pub database: Option<&'a str>,
    /// Explicit destination; `None` means the home database.
    pub requested_database: Option<&'a str>,
    pub pk: Option<&'a PrimaryKey>,
    /// Key as of the last successful write to the home database.
    pub last_persisted_pk: Option<&'a PrimaryKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveRoute {
    FirstSave,
    RegularUpdate,
    OverwriteOrDuplicateSameDb,
    DuplicateIntoNewDb,
    OverwriteOrDuplicateNewDb,
}

impl fmt::Display for SaveRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveRoute::FirstSave => "first save",
            SaveRoute::RegularUpdate => "regular update",
            SaveRoute::OverwriteOrDuplicateSameDb => "overwrite-or-duplicate in same db",
            SaveRoute::DuplicateIntoNewDb => "duplicate into new db",
            SaveRoute::OverwriteOrDuplicateNewDb => "overwrite-or-duplicate in new db",
        };
        f.write_str(name)
    }
}

impl SaveState<'_> {
    pub fn classify(&self) -> TranslationResult<SaveRoute> {
        let Some(home) = self.database else {
            return match self.last_persisted_pk {
                None => Ok(SaveRoute::FirstSave),
                Some(pk) => Err(invariant(format!(
                    "row {pk} has a persisted key but no home database"
                ))),
            };
        };

        let same_db = self.requested_database.is_none_or(|requested| requested == home);
        let Some(last) = self.last_persisted_pk else {
            return Err(if same_db {
                invariant(format!("home database '{home}' is set but no key was ever persisted there"))
            } else {
                invariant(format!(
                    "home database '{home}' is set but no key was ever persisted there (saving into another database)"
                ))
            });
        };

        let pk_unchanged = self.pk == Some(last);
        Ok(match (same_db, pk_unchanged, self.pk.is_none()) {
            (true, true, _) => SaveRoute::RegularUpdate,
            (true, false, _) => SaveRoute::OverwriteOrDuplicateSameDb,
            (false, true, _) | (false, false, true) => SaveRoute::DuplicateIntoNewDb,
            (false, false, false) => SaveRoute::OverwriteOrDuplicateNewDb,
        })
    }

    /// Database the save writes into.
    pub fn destination<'b>(&'b self, default_database: &'b str) -> &'b str {
        match (self.database, self.requested_database) {
            (_, Some(requested)) => requested,
            (Some(home), None) => home,
            (None, None) => default_database,
        }
    }
}

fn invariant(message: String) -> TranslationError {
    TranslationError::InvariantViolation {
        message: message.into(),
    }
}

/// How rows are written once a route is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Insert a new master row, with an explicit key when given.
    Insert { pk: Option<PrimaryKey> },
    /// Update the master row and write dirty translations in place.
    Update { pk: PrimaryKey },
    /// Insert a new master row and every held translation.
    Duplicate { pk: Option<PrimaryKey> },
}

impl WriteMode {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, WriteMode::Duplicate { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDecision {
    pub route: SaveRoute,
    pub database: String,
    pub write: WriteMode,
}

/// A working-set translation as the router sees it.
#[derive(Debug, Clone, Copy)]
pub struct PendingTranslation<'a> {
    pub language: &'a LanguageCode,
    pub values: &'a FieldValues,
    pub dirty: bool,
    /// A row for this language exists under the home identity.
    pub stored: bool,
}

/// Classifies saves and turns them into write plans.
pub struct SaveRouter<'a> {
    storage: &'a dyn Storage,
    table: &'a str,
    default_database: &'a str,
}

impl<'a> SaveRouter<'a> {
    pub fn new(storage: &'a dyn Storage, table: &'a str, default_database: &'a str) -> Self {
        Self {
            storage,
            table,
            default_database,
        }
    }

    /// Classifies the save and resolves overwrite-or-duplicate routes by checking the destination.
    pub fn route(&self, state: &SaveState<'_>) -> TranslationResult<SaveDecision> {
        let route = state.classify()?;
        let database = state.destination(self.default_database).to_string();

        let write = match route {
            SaveRoute::FirstSave => match state.pk {
                Some(pk) => {
                    self.reject_existing(&database, pk)?;
                    WriteMode::Insert { pk: Some(pk.clone()) }
                }
                None => WriteMode::Insert { pk: None },
            },
            SaveRoute::RegularUpdate => match state.last_persisted_pk {
                Some(pk) => WriteMode::Update { pk: pk.clone() },
                None => return Err(invariant("regular update without a persisted key".to_string())),
            },
            SaveRoute::DuplicateIntoNewDb
            | SaveRoute::OverwriteOrDuplicateSameDb
            | SaveRoute::OverwriteOrDuplicateNewDb => match state.pk {
                Some(pk) => {
                    self.reject_existing(&database, pk)?;
                    WriteMode::Duplicate { pk: Some(pk.clone()) }
                }
                None => WriteMode::Duplicate { pk: None },
            },
        };

        debug!("classified save of {} as {route} into '{database}' ({write:?})", self.table);
        Ok(SaveDecision { route, database, write })
    }

    fn reject_existing(&self, database: &str, pk: &PrimaryKey) -> TranslationResult<()> {
        if self.storage.exists(Target::new(database, self.table), pk)? {
            return Err(TranslationError::UnsupportedOverwrite {
                pk: pk.clone(),
                database: database.to_string(),
            });
        }
        Ok(())
    }

    /// Builds the row writes: the master row first, then translations.
    ///
    /// Inserts and updates write dirty translations only; duplicates write all of them.
    pub fn plan(
        &self,
        decision: &SaveDecision,
        shared: &FieldValues,
        translations: &[PendingTranslation<'_>],
    ) -> WritePlan {
        let mut plan = WritePlan::new(decision.database.clone(), self.table);

        match &decision.write {
            WriteMode::Insert { pk } => {
                plan.push(WriteOp::InsertMaster {
                    pk: pk.clone(),
                    attrs: shared.clone(),
                });
                for pending in translations.iter().filter(|pending| pending.dirty) {
                    plan.push(insert(pending));
                }
            }
            WriteMode::Update { pk } => {
                plan.push(WriteOp::UpdateMaster {
                    pk: pk.clone(),
                    attrs: shared.clone(),
                });
                for pending in translations.iter().filter(|pending| pending.dirty) {
                    plan.push(if pending.stored {
                        WriteOp::UpdateTranslation {
                            language: pending.language.clone(),
                            values: pending.values.clone(),
                        }
                    } else {
                        insert(pending)
                    });
                }
            }
            WriteMode::Duplicate { pk } => {
                plan.push(WriteOp::InsertMaster {
                    pk: pk.clone(),
                    attrs: shared.clone(),
                });
                for pending in translations {
                    plan.push(insert(pending));
                }
            }
        }

        plan
    }
}

fn insert(pending: &PendingTranslation<'_>) -> WriteOp {
    WriteOp::InsertTranslation {
        language: pending.language.clone(),
        values: pending.values.clone(),
    }
}
