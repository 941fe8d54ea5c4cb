use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use log::debug;

use super::CacheBackend;
use crate::errors::CacheError;

/// Cache backend over a single Redis connection.
///
/// Calls are serialised through one connection; share the backend behind an `Arc`.
pub struct RedisCache {
    connection: Mutex<redis::Connection>,
}

impl RedisCache {
    pub fn open(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection()?;
        debug!("connected translation cache to {url}");
        Ok(Self::from_connection(connection))
    }

    pub fn from_connection(connection: redis::Connection) -> Self {
        Self {
            connection: Mutex::new(connection),
        }
    }
}

impl CacheBackend for RedisCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let value: Option<String> = redis::cmd("GET").arg(key).query(&mut *conn)?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(expiry) = expiry {
            // Redis rejects EX 0; a sub-second expiry rounds up.
            cmd.arg("PX").arg(expiry.as_millis().max(1) as u64);
        }
        let _: () = cmd.query(&mut *conn)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let _: i64 = redis::cmd("DEL").arg(key).query(&mut *conn)?;
        Ok(())
    }

    fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let _: i64 = redis::cmd("DEL").arg(keys).query(&mut *conn)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}
