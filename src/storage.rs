// src/storage.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use futures::FutureExt;
use mongodb::bson::doc;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::MongoDB;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// String key-value storage, one value per key. Writes replace the whole
/// value so readers never observe a partial collection.
pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StorageError>>;

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>>;
}

/// Process-local backend.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        let result = self
            .entries
            .read()
            .map(|entries| entries.get(key).cloned())
            .map_err(|_| StorageError::Poisoned);
        futures::future::ready(result).boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = self
            .entries
            .write()
            .map(|mut entries| {
                entries.insert(key.to_string(), value);
            })
            .map_err(|_| StorageError::Poisoned);
        futures::future::ready(result).boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        let result = self
            .entries
            .write()
            .map(|mut entries| {
                entries.remove(key);
            })
            .map_err(|_| StorageError::Poisoned);
        futures::future::ready(result).boxed()
    }
}

/// Document shape in the `kv_store` collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct KvEntry {
    #[serde(rename = "_id")]
    pub key: String,
    pub value: String,
}

/// MongoDB backend: one document per key, upserted with `replace_one`.
pub struct MongoStore {
    coll: Collection<KvEntry>,
}

impl MongoStore {
    pub fn new(mongodb: Arc<MongoDB>) -> Self {
        MongoStore {
            coll: mongodb.kv_collection(),
        }
    }
}

impl KeyValueStore for MongoStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StorageError>> {
        async move {
            let entry = self.coll.find_one(doc! { "_id": key }).await?;
            Ok(entry.map(|e| e.value))
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StorageError>> {
        async move {
            let entry = KvEntry {
                key: key.to_string(),
                value,
            };
            self.coll
                .replace_one(doc! { "_id": key }, &entry)
                .upsert(true)
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StorageError>> {
        async move {
            self.coll.delete_one(doc! { "_id": key }).await?;
            Ok(())
        }
        .boxed()
    }
}
