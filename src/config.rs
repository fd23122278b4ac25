use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

use thiserror::Error;

use crate::data_store::SeedPolicy;

/// One hour up to one year.
const SESSION_TTL_RANGE: RangeInclusive<i64> = 1..=8760;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Mongo,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// How request scopes are derived from sessions. One policy per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopePolicy {
    Global,
    PerUser,
}

impl FromStr for ScopePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(ScopePolicy::Global),
            "per-user" | "per_user" | "user" => Ok(ScopePolicy::PerUser),
            other => Err(format!("unknown scope policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub frontend_origin: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub storage_backend: StorageBackend,
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub scope_policy: ScopePolicy,
    pub seed_policy: SeedPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` uses the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_backend: StorageBackend = parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Memory)?;
        let mongo_uri = lookup("MONGO_URI");
        let session_ttl_hours: i64 = parse_or(&lookup, "SESSION_TTL_HOURS", 24)?;
        if !SESSION_TTL_RANGE.contains(&session_ttl_hours) {
            return Err(ConfigError::Invalid {
                name: "SESSION_TTL_HOURS",
                reason: format!(
                    "must be between {} and {} hours",
                    SESSION_TTL_RANGE.start(),
                    SESSION_TTL_RANGE.end()
                ),
            });
        }
        if storage_backend == StorageBackend::Mongo && mongo_uri.is_none() {
            return Err(ConfigError::Missing("MONGO_URI"));
        }

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            frontend_origin: lookup("FRONTEND_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            jwt_secret: lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            session_ttl_hours,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            storage_backend,
            mongo_uri,
            database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "projectflow".to_string()),
            scope_policy: parse_or(&lookup, "SCOPE_POLICY", ScopePolicy::PerUser)?,
            seed_policy: parse_or(&lookup, "SEED_POLICY", SeedPolicy::Sample)?,
        })
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.scope_policy, ScopePolicy::PerUser);
        assert_eq!(config.seed_policy, SeedPolicy::Sample);
        assert_eq!(config.session_ttl_hours, 24);
    }

    #[test]
    fn secret_is_required() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
    }

    #[test]
    fn mongo_backend_needs_uri() {
        let result = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("STORAGE_BACKEND", "mongo")]));
        assert!(matches!(result, Err(ConfigError::Missing("MONGO_URI"))));
    }

    #[test]
    fn session_ttl_must_be_in_range() {
        let max = i64::MAX.to_string();
        for raw in ["0", "-3", "8761", max.as_str()] {
            let result = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("SESSION_TTL_HOURS", raw)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { name: "SESSION_TTL_HOURS", .. })),
                "{}",
                raw
            );
        }
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("SESSION_TTL_HOURS", "8760")])).unwrap();
        assert_eq!(config.session_ttl_hours, 8760);
    }

    #[test]
    fn invalid_policy_is_reported() {
        let result = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("SCOPE_POLICY", "team")]));
        assert!(matches!(result, Err(ConfigError::Invalid { name: "SCOPE_POLICY", .. })));
    }
}
