// src/service.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::data_store::{DataStore, Scope};
use crate::error::AppResult;
use crate::models::EntityKind;
use crate::storage::StorageError;
use crate::workspace::{Effect, Transition, Workspace};

/// Loads a scope's workspace, applies a transition and writes back the
/// collections the transition touched. Mutations of one scope are
/// serialized; different scopes proceed independently.
#[derive(Clone)]
pub struct WorkspaceService {
    store: DataStore,
    locks: Arc<Mutex<HashMap<Scope, Arc<AsyncMutex<()>>>>>,
}

impl WorkspaceService {
    pub fn new(store: DataStore) -> Self {
        WorkspaceService {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub async fn read(&self, scope: &Scope) -> AppResult<Workspace> {
        Ok(self.store.snapshot(scope).await?)
    }

    pub async fn mutate<T, F>(&self, scope: &Scope, apply: F) -> AppResult<T>
    where
        F: FnOnce(&mut Workspace) -> AppResult<Transition<T>>,
    {
        let _guard = self.lock(scope).await?;
        let mut workspace = self.store.snapshot(scope).await?;
        let Transition { value, effects } = apply(&mut workspace)?;
        self.persist(scope, &workspace, &effects).await?;
        Ok(value)
    }

    /// Swaps the whole workspace, e.g. after an import.
    pub async fn replace(&self, scope: &Scope, workspace: &Workspace) -> AppResult<()> {
        let _guard = self.lock(scope).await?;
        self.store.replace(scope, workspace).await?;
        Ok(())
    }

    async fn persist(&self, scope: &Scope, workspace: &Workspace, effects: &[Effect]) -> AppResult<()> {
        let mut done: Vec<EntityKind> = Vec::with_capacity(effects.len());
        for Effect::Persist(kind) in effects.iter().copied() {
            if done.contains(&kind) {
                continue;
            }
            debug!("Persisting {} for scope {}", kind, scope);
            match kind {
                EntityKind::Projects => self.store.save(scope, &workspace.projects).await?,
                EntityKind::Tasks => self.store.save(scope, &workspace.tasks).await?,
                EntityKind::Members => self.store.save(scope, &workspace.members).await?,
            }
            done.push(kind);
        }
        Ok(())
    }

    async fn lock(&self, scope: &Scope) -> Result<ScopeLock, StorageError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| StorageError::Poisoned)?;
            locks.entry(scope.clone()).or_default().clone()
        };
        Ok(ScopeLock {
            guard: Some(lock.lock_owned().await),
            scope: scope.clone(),
            locks: Arc::clone(&self.locks),
        })
    }
}

/// Holds a scope's mutation lock. The map entry is dropped with the last
/// holder so idle scopes do not accumulate.
struct ScopeLock {
    guard: Option<OwnedMutexGuard<()>>,
    scope: Scope,
    locks: Arc<Mutex<HashMap<Scope, Arc<AsyncMutex<()>>>>>,
}

impl Drop for ScopeLock {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the entry under the map lock, so a count of one
        // means nobody else is queued on this scope.
        if let Ok(mut locks) = self.locks.lock() {
            if locks.get(&self.scope).is_some_and(|l| Arc::strong_count(l) == 1) {
                locks.remove(&self.scope);
            }
        }
    }
}
