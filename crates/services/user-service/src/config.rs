//! User service configuration.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use common::{CacheConfig, DatabaseConfig, ServiceConfig};

/// User service configuration.
#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    /// Accounts reported as frozen by the account-state source
    pub frozen_user_ids: HashSet<i64>,
}

impl UserServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            service: ServiceConfig {
                service_name: defaults.service.service_name,
                host: env::var("USER_SERVICE_HOST").unwrap_or(defaults.service.host),
                port: parse_var("USER_SERVICE_PORT").unwrap_or(defaults.service.port),
                request_timeout_ms: parse_var("USER_SERVICE_REQUEST_TIMEOUT_MS")
                    .unwrap_or(defaults.service.request_timeout_ms),
            },
            database: DatabaseConfig {
                url: env::var("USER_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.database.url),
                max_connections: parse_var("USER_SERVICE_DB_MAX_CONNECTIONS")
                    .unwrap_or(defaults.database.max_connections),
                min_connections: parse_var("USER_SERVICE_DB_MIN_CONNECTIONS")
                    .unwrap_or(defaults.database.min_connections),
            },
            cache: CacheConfig {
                url: env::var("USER_SERVICE_REDIS_URL")
                    .or_else(|_| env::var("REDIS_URL"))
                    .unwrap_or(defaults.cache.url),
                default_ttl_seconds: parse_var("USER_SERVICE_CACHE_TTL_SECONDS")
                    .unwrap_or(defaults.cache.default_ttl_seconds),
            },
            frozen_user_ids: env::var("USER_SERVICE_FROZEN_USER_IDS")
                .map(|raw| parse_id_list(&raw))
                .unwrap_or_default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.service.request_timeout_ms)
    }
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                service_name: "user-service".to_string(),
                ..ServiceConfig::default()
            },
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            frozen_user_ids: HashSet::new(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Parse a comma-separated id list, skipping blank or malformed entries.
fn parse_id_list(raw: &str) -> HashSet<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}
