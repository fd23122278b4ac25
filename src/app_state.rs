use crate::auth::{AuthService, Session};
use crate::config::{Config, ScopePolicy};
use crate::data_store::{DataStore, Scope};
use crate::notifier::ChangeHub;
use crate::service::WorkspaceService;
use crate::storage::KeyValueStore;
use actix::Addr;
use chrono::Duration;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub workspaces: WorkspaceService,
    pub change_hub: Addr<ChangeHub>,
    pub config: Config,
}

impl AppState {
    /// Wires accounts and collections onto one backend; every save is
    /// reported to the change hub.
    pub fn new(config: Config, kv: Arc<dyn KeyValueStore>, change_hub: Addr<ChangeHub>) -> Self {
        let store = DataStore::new(kv.clone(), config.seed_policy)
            .with_listener(change_hub.clone().recipient());
        let auth = AuthService::new(
            kv,
            config.jwt_secret.clone(),
            Duration::hours(config.session_ttl_hours),
            config.bcrypt_cost,
        );
        AppState {
            auth: Arc::new(auth),
            workspaces: WorkspaceService::new(store),
            change_hub,
            config,
        }
    }

    /// Storage scope for the signed-in user under the configured policy.
    pub fn scope_for(&self, session: &Session) -> Scope {
        match self.config.scope_policy {
            ScopePolicy::Global => Scope::global(),
            ScopePolicy::PerUser => Scope::user(&session.user.user_id),
        }
    }
}
