// src/auth.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::config::ScopePolicy;
use crate::data_store::SeedPolicy;
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::forms::{LoginForm, PasswordChangeForm, ProfileDraft, ProfileForm, SignupDraft, SignupForm};
use crate::models::{UserAccount, UserProfile};
use crate::storage::{KeyValueStore, StorageError};

const ACCOUNTS_KEY: &str = "projectflow:accounts";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    /// Session id; revoked ids fail the session check even before `exp`.
    pub sid: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

struct LiveSession {
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// Email/password accounts and revocable JWT sessions.
pub struct AuthService {
    kv: Arc<dyn KeyValueStore>,
    jwt_secret: String,
    session_ttl: Duration,
    bcrypt_cost: u32,
    sessions: RwLock<HashMap<String, LiveSession>>,
    accounts_lock: Mutex<()>,
}

impl AuthService {
    pub fn new(kv: Arc<dyn KeyValueStore>, jwt_secret: String, session_ttl: Duration, bcrypt_cost: u32) -> Self {
        AuthService {
            kv,
            jwt_secret,
            session_ttl,
            bcrypt_cost,
            sessions: RwLock::new(HashMap::new()),
            accounts_lock: Mutex::new(()),
        }
    }

    pub async fn sign_up(&self, draft: SignupDraft) -> AppResult<Session> {
        let _guard = self.accounts_lock.lock().await;
        let mut accounts = self.load_accounts().await?;
        if accounts.iter().any(|a| a.email == draft.email) {
            return Err(AppError::DuplicateAccount);
        }
        let account = UserAccount {
            user_id: Uuid::new_v4().to_string(),
            email: draft.email,
            display_name: draft.display_name,
            password_hash: hash(&draft.password, self.bcrypt_cost)?,
            created_at: Utc::now(),
        };
        accounts.push(account.clone());
        self.save_accounts(&accounts).await?;
        info!("Account created for {}", account.user_id);
        self.issue_session(&account)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let account = self.verify_credentials(email, password).await?;
        info!("User {} signed in", account.user_id);
        self.issue_session(&account)
    }

    pub fn sign_out(&self, session: &Session) -> AppResult<()> {
        let mut sessions = self.sessions.write().map_err(|_| StorageError::Poisoned)?;
        sessions.remove(&session.session_id);
        info!("Session {} signed out", session.session_id);
        Ok(())
    }

    /// `None` for malformed, expired or revoked tokens.
    pub async fn get_session(&self, token: &str) -> Option<Session> {
        let claims = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        ) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Token rejected: {}", e);
                if matches!(e.kind(), ErrorKind::ExpiredSignature) {
                    self.forget_expired(token);
                }
                return None;
            }
        };
        let live = self
            .sessions
            .read()
            .ok()?
            .get(&claims.sid)
            .is_some_and(|s| s.user_id == claims.sub);
        if !live {
            return None;
        }
        let accounts = self.load_accounts().await.ok()?;
        let account = accounts.iter().find(|a| a.user_id == claims.sub)?;
        Some(Session {
            session_id: claims.sid,
            token: token.to_string(),
            expires_at: DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now),
            user: UserProfile::from(account),
        })
    }

    pub async fn update_user(&self, user_id: &str, draft: ProfileDraft) -> AppResult<UserProfile> {
        let _guard = self.accounts_lock.lock().await;
        let mut accounts = self.load_accounts().await?;
        if let Some(email) = &draft.email {
            if accounts.iter().any(|a| &a.email == email && a.user_id != user_id) {
                return Err(AppError::DuplicateAccount);
            }
        }
        let account = accounts
            .iter_mut()
            .find(|a| a.user_id == user_id)
            .ok_or(AppError::Unauthorized)?;
        if let Some(email) = draft.email {
            account.email = email;
        }
        if let Some(name) = draft.display_name {
            account.display_name = name;
        }
        let profile = UserProfile::from(&*account);
        self.save_accounts(&accounts).await?;
        info!("Profile updated for {}", user_id);
        Ok(profile)
    }

    /// Re-authenticates with the current password before replacing it.
    pub async fn change_password(&self, user_id: &str, current: &str, new_password: &str) -> AppResult<()> {
        let email = {
            let accounts = self.load_accounts().await?;
            accounts
                .iter()
                .find(|a| a.user_id == user_id)
                .map(|a| a.email.clone())
                .ok_or(AppError::Unauthorized)?
        };
        match self.verify_credentials(&email, current).await {
            Ok(_) => {}
            Err(AppError::InvalidCredentials) => {
                return Err(AppError::Validation(ValidationErrors::single(
                    "currentPassword",
                    "Current password is incorrect.",
                )));
            }
            Err(e) => return Err(e),
        }

        let password_hash = hash(new_password, self.bcrypt_cost)?;
        let _guard = self.accounts_lock.lock().await;
        let mut accounts = self.load_accounts().await?;
        let account = accounts
            .iter_mut()
            .find(|a| a.user_id == user_id)
            .ok_or(AppError::Unauthorized)?;
        account.password_hash = password_hash;
        self.save_accounts(&accounts).await?;
        info!("Password changed for {}", user_id);
        Ok(())
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<UserAccount> {
        let accounts = self.load_accounts().await?;
        let account = accounts
            .into_iter()
            .find(|a| a.email == email)
            .ok_or(AppError::InvalidCredentials)?;
        if verify(password, &account.password_hash).unwrap_or(false) {
            Ok(account)
        } else {
            warn!("Failed sign-in for {}", account.user_id);
            Err(AppError::InvalidCredentials)
        }
    }

    fn issue_session(&self, account: &UserAccount) -> AppResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.session_ttl;
        let claims = Claims {
            sub: account.user_id.clone(),
            sid: session_id.clone(),
            exp: expires_at.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?;
        {
            let mut sessions = self.sessions.write().map_err(|_| StorageError::Poisoned)?;
            let now = Utc::now();
            sessions.retain(|_, s| s.expires_at > now);
            sessions.insert(
                session_id.clone(),
                LiveSession {
                    user_id: account.user_id.clone(),
                    expires_at,
                },
            );
        }
        Ok(Session {
            session_id,
            token,
            expires_at,
            user: UserProfile::from(account),
        })
    }

    /// Drops the session id of a token whose signature is valid but expired.
    fn forget_expired(&self, token: &str) {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        let key = DecodingKey::from_secret(self.jwt_secret.as_ref());
        if let Ok(data) = decode::<Claims>(token, &key, &validation) {
            if let Ok(mut sessions) = self.sessions.write() {
                sessions.remove(&data.claims.sid);
            }
        }
    }

    async fn load_accounts(&self) -> Result<Vec<UserAccount>, StorageError> {
        match self.kv.get(ACCOUNTS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_accounts(&self, accounts: &[UserAccount]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(accounts)?;
        self.kv.set(ACCOUNTS_KEY, raw).await
    }
}

/// Session attached by the authentication middleware, or 401.
pub fn current_session(req: &HttpRequest) -> AppResult<Session> {
    req.extensions()
        .get::<Session>()
        .cloned()
        .ok_or(AppError::Unauthorized)
}

// ─── ENDPOINTS ─────────────────────────────────────────────────────────────────

/// POST /auth/signup
pub async fn signup(data: web::Data<AppState>, form: web::Json<SignupForm>) -> AppResult<HttpResponse> {
    let draft = form.into_inner().validate()?;
    let session = data.auth.sign_up(draft).await?;
    // New accounts start with empty collections rather than the sample set.
    if data.config.scope_policy == ScopePolicy::PerUser {
        let scope = data.scope_for(&session);
        data.workspaces.store().seed_scope(&scope, SeedPolicy::Empty).await?;
    }
    Ok(HttpResponse::Ok().json(session))
}

/// POST /auth/login
pub async fn login(data: web::Data<AppState>, form: web::Json<LoginForm>) -> AppResult<HttpResponse> {
    let (email, password) = form.into_inner().validate()?;
    let session = data.auth.sign_in(&email, &password).await?;
    Ok(HttpResponse::Ok().json(session))
}

/// POST /auth/logout
pub async fn logout(req: HttpRequest, data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    data.auth.sign_out(&session)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "Signed out" })))
}

/// GET /auth/session
pub async fn session(req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().json(req.extensions().get::<Session>())
}

/// PUT /auth/user
pub async fn update_user(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<ProfileForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let draft = form.into_inner().validate()?;
    let profile = data.auth.update_user(&session.user.user_id, draft).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PUT /auth/password
pub async fn change_password(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Json<PasswordChangeForm>,
) -> AppResult<HttpResponse> {
    let session = current_session(&req)?;
    let (current, new_password) = form.into_inner().validate()?;
    data.auth
        .change_password(&session.user.user_id, &current, &new_password)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "Password updated successfully." })))
}
