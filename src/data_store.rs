// src/data_store.rs

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use actix::Recipient;
use log::{debug, warn};
use serde::Serialize;

use crate::models::{Entity, EntityKind, Member, Project, Task};
use crate::notifier::CollectionChanged;
use crate::storage::{KeyValueStore, StorageError};
use crate::workspace::Workspace;

const KEY_PREFIX: &str = "projectflow";

/// Partition under which a set of collections is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope(String);

impl Scope {
    pub fn global() -> Self {
        Scope("global".to_string())
    }

    pub fn user(user_id: &str) -> Self {
        Scope(format!("user:{}", user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an untouched key is initialised with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    Empty,
    Sample,
}

impl FromStr for SeedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(SeedPolicy::Empty),
            "sample" | "rich" => Ok(SeedPolicy::Sample),
            other => Err(format!("unknown seed policy '{}'", other)),
        }
    }
}

impl SeedPolicy {
    pub fn seed<K: Entity>(&self) -> Vec<K> {
        match self {
            SeedPolicy::Empty => Vec::new(),
            SeedPolicy::Sample => K::sample(),
        }
    }
}

/// Typed collections on top of the key-value boundary.
#[derive(Clone)]
pub struct DataStore {
    kv: Arc<dyn KeyValueStore>,
    seed: SeedPolicy,
    listener: Option<Recipient<CollectionChanged>>,
}

impl DataStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, seed: SeedPolicy) -> Self {
        DataStore {
            kv,
            seed,
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Recipient<CollectionChanged>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn key_for(scope: &Scope, kind: EntityKind) -> String {
        format!("{}:{}:{}", KEY_PREFIX, scope, kind)
    }

    /// Stored collection for `scope`. Missing or unreadable data is replaced
    /// by the default seed, which is written back and returned.
    pub async fn load<K: Entity>(&self, scope: &Scope) -> Result<Vec<K>, StorageError> {
        let key = Self::key_for(scope, K::KIND);
        let raw = match self.kv.get(&key).await? {
            Some(raw) => raw,
            None => {
                debug!("Seeding {} for first touch", key);
                return self.reseed(&key).await;
            }
        };
        match serde_json::from_str::<Vec<K>>(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("Stored {} is malformed ({}), reseeding", key, e);
                self.reseed(&key).await
            }
        }
    }

    /// Overwrites the collection, then notifies listeners of the scope.
    pub async fn save<K: Entity>(&self, scope: &Scope, items: &[K]) -> Result<(), StorageError> {
        let key = Self::key_for(scope, K::KIND);
        self.write(&key, items).await?;
        self.notify(scope, K::KIND);
        Ok(())
    }

    /// Writes the seed for every collection of `scope`, whatever is there.
    pub async fn seed_scope(&self, scope: &Scope, policy: SeedPolicy) -> Result<(), StorageError> {
        self.save(scope, &policy.seed::<Project>()).await?;
        self.save(scope, &policy.seed::<Task>()).await?;
        self.save(scope, &policy.seed::<Member>()).await
    }

    pub async fn snapshot(&self, scope: &Scope) -> Result<Workspace, StorageError> {
        Ok(Workspace {
            projects: self.load(scope).await?,
            tasks: self.load(scope).await?,
            members: self.load(scope).await?,
        })
    }

    /// Replaces all three collections. Callers validate beforehand so a
    /// backend failure is the only way to stop halfway.
    pub async fn replace(&self, scope: &Scope, workspace: &Workspace) -> Result<(), StorageError> {
        self.save(scope, &workspace.projects).await?;
        self.save(scope, &workspace.tasks).await?;
        self.save(scope, &workspace.members).await
    }

    async fn reseed<K: Entity>(&self, key: &str) -> Result<Vec<K>, StorageError> {
        let seed = self.seed.seed::<K>();
        self.write(key, &seed).await?;
        Ok(seed)
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(key, raw).await
    }

    fn notify(&self, scope: &Scope, kind: EntityKind) {
        if let Some(listener) = &self.listener {
            listener.do_send(CollectionChanged {
                kind,
                scope: scope.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};
    use crate::notifier::tests::recorder;
    use crate::storage::MemoryStore;
    use chrono::{NaiveDate, Utc};

    fn store(seed: SeedPolicy) -> (Arc<MemoryStore>, DataStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), DataStore::new(kv, seed))
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {}", id),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Low,
            assignee: None,
            project_id: None,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn first_load_writes_and_returns_seed() {
        let (kv, store) = store(SeedPolicy::Sample);
        let scope = Scope::user("u1");
        let projects: Vec<Project> = store.load(&scope).await.unwrap();
        assert_eq!(projects, Project::sample());

        let raw = kv
            .get(&DataStore::key_for(&scope, EntityKind::Projects))
            .await
            .unwrap()
            .expect("seed written");
        let stored: Vec<Project> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, projects);
    }

    #[actix_web::test]
    async fn empty_policy_seeds_nothing() {
        let (_, store) = store(SeedPolicy::Empty);
        let members: Vec<Member> = store.load(&Scope::global()).await.unwrap();
        assert!(members.is_empty());
    }

    #[actix_web::test]
    async fn save_then_load_round_trips() {
        let (_, store) = store(SeedPolicy::Sample);
        let scope = Scope::user("u1");
        let tasks = vec![task("t_1"), task("t_2")];
        store.save(&scope, &tasks).await.unwrap();
        let loaded: Vec<Task> = store.load(&scope).await.unwrap();
        assert_eq!(loaded, tasks);
    }

    #[actix_web::test]
    async fn malformed_data_falls_back_to_seed() {
        let (kv, store) = store(SeedPolicy::Sample);
        let scope = Scope::user("u1");
        kv.set(&DataStore::key_for(&scope, EntityKind::Tasks), "{not json".into())
            .await
            .unwrap();
        let tasks: Vec<Task> = store.load(&scope).await.unwrap();
        assert_eq!(tasks, Task::sample());
    }

    #[actix_web::test]
    async fn scopes_are_isolated() {
        let (_, store) = store(SeedPolicy::Empty);
        store.save(&Scope::user("a"), &[task("t_a")]).await.unwrap();
        let other: Vec<Task> = store.load(&Scope::user("b")).await.unwrap();
        assert!(other.is_empty());
    }

    #[actix_web::test]
    async fn save_emits_one_change_event() {
        let (recorder_addr, seen) = recorder::<CollectionChanged>();
        let (_, store) = store(SeedPolicy::Empty);
        let store = store.with_listener(recorder_addr.clone().recipient());
        let scope = Scope::user("u1");

        let _: Vec<Task> = store.load(&scope).await.unwrap();
        store.save(&scope, &[task("t_1")]).await.unwrap();
        recorder_addr
            .send(CollectionChanged { kind: EntityKind::Members, scope: "flush".into() })
            .await
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(
            seen[0],
            CollectionChanged { kind: EntityKind::Tasks, scope: scope.to_string() }
        );
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn seed_policy_parses() {
        assert_eq!("Empty".parse::<SeedPolicy>().unwrap(), SeedPolicy::Empty);
        assert_eq!("sample".parse::<SeedPolicy>().unwrap(), SeedPolicy::Sample);
        assert!("other".parse::<SeedPolicy>().is_err());
    }

    #[test]
    fn keys_are_per_scope_and_kind() {
        assert_eq!(
            DataStore::key_for(&Scope::user("42"), EntityKind::Members),
            "projectflow:user:42:members"
        );
    }
}
