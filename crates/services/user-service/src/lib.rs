//! User Service Library
//!
//! Account CRUD over gRPC, backed by a relational store with a cache-aside
//! read path.

pub mod config;
pub mod grpc;
pub mod infra;
pub mod repository;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tonic::transport::Server;
use tracing::info;

use common::CacheConfig;

use crate::config::UserServiceConfig;
use crate::grpc::UserGrpcService;
use crate::infra::{cache::MEMORY_CACHE_SCHEME, CacheStore, Database, MemoryCache, RedisCache};
use crate::repository::{FrozenUserIds, TransactionManager, UserStore};
use crate::service::{UserManager, UserService};

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = UserServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Open the cache backend named by `config.url`.
///
/// `memory://` selects the in-process cache, anything else is a Redis URL.
pub async fn connect_cache(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, redis::RedisError> {
    if config.url.starts_with(MEMORY_CACHE_SCHEME) {
        info!("Using in-process cache");
        return Ok(Arc::new(MemoryCache::new()));
    }
    Ok(Arc::new(RedisCache::connect(config).await?))
}

/// Wire repository, transaction boundary and use cases over one connection.
pub fn build_user_service(
    db: DatabaseConnection,
    cache: Arc<dyn CacheStore>,
    config: &UserServiceConfig,
) -> Arc<dyn UserService> {
    let freeze = Arc::new(FrozenUserIds::new(config.frozen_user_ids.iter().copied()));
    let repo = UserStore::new(db.clone(), cache)
        .with_freeze_policy(freeze)
        .with_cache_ttl(config.cache.default_ttl_seconds);

    Arc::new(UserManager::new(Arc::new(repo), TransactionManager::new(db)))
}

/// Connect the store and cache, then serve gRPC until the process exits.
pub async fn run_server(config: UserServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database).await?;
    let cache = connect_cache(&config.cache).await?;

    let user_service = build_user_service(db.get_connection(), cache, &config);
    let grpc_service = UserGrpcService::new(user_service, config.request_timeout());

    let addr: SocketAddr = format!("{}:{}", config.service.host, config.service.port).parse()?;
    info!(service = %config.service.service_name, "User service listening on {}", addr);

    Server::builder()
        .timeout(config.request_timeout())
        .add_service(proto::UserServiceServer::new(grpc_service))
        .serve(addr)
        .await?;

    Ok(())
}
