//! Configuration module
//!
//! Configuration is read from the process environment (after loading a `.env`
//! file when present). Every setting has a default except the ones that depend
//! on the selected store backend.

use std::env;
use std::time::Duration;

use crate::constants::{DEFAULT_ROLE_CACHE_CAPACITY, DEFAULT_ROLE_CACHE_TTL_SECS};
use crate::store_types::StoreBackend;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub store_backend: StoreBackend,
    pub local_store_path: Option<String>,
    pub role_cache_ttl_secs: u64,
    pub role_cache_capacity: usize,
    /// Session tenant used when a caller does not pass one explicitly.
    pub session_tenant_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            store_backend: StoreBackend::Memory,
            local_store_path: None,
            role_cache_ttl_secs: DEFAULT_ROLE_CACHE_TTL_SECS,
            role_cache_capacity: DEFAULT_ROLE_CACHE_CAPACITY,
            session_tenant_id: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// `from_env` delegates here; tests pass a map lookup instead of mutating
    /// the process environment.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match var("STORE_BACKEND") {
            Some(raw) => raw.parse::<StoreBackend>()?,
            None => StoreBackend::Memory,
        };

        let config = Config {
            environment: var("COACHDESK_ENV")
                .unwrap_or_else(|| "development".to_string())
                .to_lowercase(),
            store_backend,
            local_store_path: var("LOCAL_STORE_PATH").filter(|s| !s.trim().is_empty()),
            role_cache_ttl_secs: var("ROLE_CACHE_TTL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ROLE_CACHE_TTL_SECS),
            role_cache_capacity: var("ROLE_CACHE_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ROLE_CACHE_CAPACITY),
            session_tenant_id: var("TENANT_ID").filter(|s| !s.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.role_cache_capacity == 0 {
            return Err(anyhow::anyhow!(
                "ROLE_CACHE_CAPACITY must be greater than zero"
            ));
        }

        match self.store_backend {
            StoreBackend::Local => {
                if self.local_store_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORE_PATH must be set when using the local store backend"
                    ));
                }
            }
            StoreBackend::Memory => {}
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.eq("production") || self.environment.eq("prod")
    }

    /// Role cache TTL; `None` when caching is disabled.
    pub fn role_cache_ttl(&self) -> Option<Duration> {
        if self.role_cache_ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.role_cache_ttl_secs))
        }
    }
}
