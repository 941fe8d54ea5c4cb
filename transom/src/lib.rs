//! Transom core library.
//!
//! Multilingual entities: language fallback resolution, a read-through
//! translation cache and save routing across database aliases.

extern crate self as transom;

pub mod cache;
pub mod config;
pub mod entity;
pub mod errors;
pub mod id;
pub mod keys;
pub mod language;
pub mod resolver;
pub mod routing;
pub mod storage;
pub mod types;

pub use cache::{CacheBackend, CacheIdentity, CacheLookup, CachedTranslation, MemoryCache, RedisCache, TranslationCache};
pub use config::{LanguageConfig, LanguageConfigBuilder, LanguageSettings, Scope, TransomSettings};
pub use entity::{
    AvailableLanguages, Provenance, RecordState, Resolved, SaveOutcome, Translatable, TranslationContext,
    TranslationRecord,
};
pub use errors::*;
pub use language::LanguageCode;
pub use resolver::{FallbackResolver, ResolveMode};
pub use routing::{SaveDecision, SaveRoute, SaveRouter, SaveState, WriteMode};
pub use storage::{MemoryStorage, Storage, Target, WriteOp, WritePlan};
pub use transom_macros::TranslatedModel;
pub use types::{FieldValues, ModelDescriptor, PrimaryKey, TranslatedModel};

pub use redis;
