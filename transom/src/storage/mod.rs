//! Storage collaborator interface and write plans.
//!
//! The relational engine itself lives outside this crate; implementations map
//! these per-row calls onto it. [`MemoryStorage`] is the bundled implementation.

mod memory;

pub use self::memory::{MemoryStorage, StorageStats, StorageStatsSnapshot};

use std::borrow::Cow;

use serde::Serialize;

use crate::{
    errors::StorageError,
    language::LanguageCode,
    types::{FieldValues, PrimaryKey},
};

/// Database alias and table a call operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target<'a> {
    pub database: &'a str,
    pub table: &'a str,
}

impl<'a> Target<'a> {
    pub fn new(database: &'a str, table: &'a str) -> Self {
        Self { database, table }
    }
}

/// Per-row storage operations.
///
/// Every method is synchronous and touches exactly one master row or one
/// translation row, except `delete_master_cascade` and `execute`.
pub trait Storage: Send + Sync {
    /// Inserts a master row, using `pk` when given and assigning one otherwise.
    fn insert_master(
        &self,
        target: Target<'_>,
        pk: Option<&PrimaryKey>,
        attrs: &FieldValues,
    ) -> Result<PrimaryKey, StorageError>;

    fn update_master(&self, target: Target<'_>, pk: &PrimaryKey, attrs: &FieldValues) -> Result<(), StorageError>;

    fn fetch_master(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<Option<FieldValues>, StorageError>;

    fn exists(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<bool, StorageError>;

    fn insert_translation(
        &self,
        target: Target<'_>,
        pk: &PrimaryKey,
        language: &LanguageCode,
        values: &FieldValues,
    ) -> Result<(), StorageError>;

    fn update_translation(
        &self,
        target: Target<'_>,
        pk: &PrimaryKey,
        language: &LanguageCode,
        values: &FieldValues,
    ) -> Result<(), StorageError>;

    /// Returns the number of rows removed (0 or 1).
    fn delete_translation(
        &self,
        target: Target<'_>,
        pk: &PrimaryKey,
        language: &LanguageCode,
    ) -> Result<usize, StorageError>;

    /// Removes the master row and all of its translation rows; returns the number of rows removed.
    fn delete_master_cascade(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<usize, StorageError>;

    fn fetch_translation(
        &self,
        target: Target<'_>,
        pk: &PrimaryKey,
        language: &LanguageCode,
    ) -> Result<Option<FieldValues>, StorageError>;

    /// Languages with a stored translation row for the master row.
    fn translation_languages(&self, target: Target<'_>, pk: &PrimaryKey) -> Result<Vec<LanguageCode>, StorageError>;

    /// Applies a save's writes with all-or-nothing semantics and returns the master key.
    ///
    /// The default runs the calls in order without a transaction; implementations
    /// backed by a transactional engine should override it.
    fn execute(&self, plan: &WritePlan) -> Result<PrimaryKey, StorageError> {
        execute_plan(self, plan)
    }
}

/// The ordered row writes of one save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WritePlan {
    pub database: String,
    pub table: String,
    pub ops: Vec<WriteOp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum WriteOp {
    InsertMaster {
        pk: Option<PrimaryKey>,
        attrs: FieldValues,
    },
    UpdateMaster {
        pk: PrimaryKey,
        attrs: FieldValues,
    },
    InsertTranslation {
        language: LanguageCode,
        values: FieldValues,
    },
    UpdateTranslation {
        language: LanguageCode,
        values: FieldValues,
    },
}

impl WritePlan {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            ops: Vec::new(),
        }
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn target(&self) -> Target<'_> {
        Target::new(&self.database, &self.table)
    }

    /// Languages whose translation rows the plan writes, in plan order.
    pub fn translation_languages(&self) -> Vec<LanguageCode> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                WriteOp::InsertTranslation { language, .. } | WriteOp::UpdateTranslation { language, .. } => {
                    Some(language.clone())
                }
                _ => None,
            })
            .collect()
    }
}

/// Runs a plan call by call. Translation writes target the key produced by the
/// preceding master write.
pub fn execute_plan<S>(storage: &S, plan: &WritePlan) -> Result<PrimaryKey, StorageError>
where
    S: Storage + ?Sized,
{
    let target = plan.target();
    let mut master: Option<PrimaryKey> = None;

    for op in &plan.ops {
        match op {
            WriteOp::InsertMaster { pk, attrs } => {
                master = Some(storage.insert_master(target, pk.as_ref(), attrs)?);
            }
            WriteOp::UpdateMaster { pk, attrs } => {
                storage.update_master(target, pk, attrs)?;
                master = Some(pk.clone());
            }
            WriteOp::InsertTranslation { language, values } => {
                let pk = master.as_ref().ok_or_else(translation_before_master)?;
                storage.insert_translation(target, pk, language, values)?;
            }
            WriteOp::UpdateTranslation { language, values } => {
                let pk = master.as_ref().ok_or_else(translation_before_master)?;
                storage.update_translation(target, pk, language, values)?;
            }
        }
    }

    master.ok_or_else(|| StorageError::Other {
        message: Cow::Borrowed("write plan has no master row operation"),
    })
}

fn translation_before_master() -> StorageError {
    StorageError::Other {
        message: Cow::Borrowed("translation write precedes the master row write"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn title(value: &str) -> FieldValues {
        let mut values = FieldValues::new();
        values.insert("title".to_string(), json!(value));
        values
    }

    #[test]
    fn call_by_call_execution_targets_the_new_master() {
        let storage = MemoryStorage::new(["default"]);
        let en = LanguageCode::parse("en").unwrap();
        let mut plan = WritePlan::new("default", "blog_article");
        plan.push(WriteOp::InsertMaster {
            pk: None,
            attrs: FieldValues::new(),
        });
        plan.push(WriteOp::InsertTranslation {
            language: en.clone(),
            values: title("Hello"),
        });

        let pk = execute_plan(&storage, &plan).unwrap();
        let stored = storage.fetch_translation(plan.target(), &pk, &en).unwrap();
        assert_eq!(stored, Some(title("Hello")));
        assert_eq!(plan.translation_languages(), vec![en]);
    }

    #[test]
    fn translation_without_master_is_rejected() {
        let storage = MemoryStorage::new(["default"]);
        let mut plan = WritePlan::new("default", "blog_article");
        plan.push(WriteOp::UpdateTranslation {
            language: LanguageCode::parse("fr").unwrap(),
            values: title("Bonjour"),
        });
        let err = execute_plan(&storage, &plan).unwrap_err();
        assert!(matches!(err, StorageError::Other { .. }));
    }

    #[test]
    fn plans_serialize_with_tagged_ops() {
        let mut plan = WritePlan::new("default", "blog_article");
        plan.push(WriteOp::UpdateMaster {
            pk: PrimaryKey::from("7"),
            attrs: FieldValues::new(),
        });
        let encoded = serde_json::to_value(&plan).unwrap();
        assert_eq!(encoded["ops"][0]["op"], "update_master");
        assert_eq!(encoded["ops"][0]["pk"], "7");
    }
}
