//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;

use user_service_lib::infra::{MemoryCache, Migrator};
use user_service_lib::repository::entities::user;
use user_service_lib::repository::{FreezePolicy, UserStore};

/// In-memory SQLite with the schema applied.
///
/// One pooled connection, so every test sees the same database. While a
/// transaction is open only its context may touch the store.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub struct Fixture {
    pub db: DatabaseConnection,
    pub cache: Arc<MemoryCache>,
    pub repo: Arc<UserStore>,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = setup_db().await;
        let cache = Arc::new(MemoryCache::new());
        let repo = Arc::new(UserStore::new(db.clone(), cache.clone()));
        Self { db, cache, repo }
    }

    pub async fn with_freeze_policy(policy: Arc<dyn FreezePolicy>) -> Self {
        let db = setup_db().await;
        let cache = Arc::new(MemoryCache::new());
        let repo = Arc::new(UserStore::new(db.clone(), cache.clone()).with_freeze_policy(policy));
        Self { db, cache, repo }
    }

    /// Insert a row straight into the store, bypassing repository and cache.
    pub async fn insert_raw(&self, username: Option<&str>) -> i64 {
        let model = user::ActiveModel {
            username: Set(username.map(str::to_string)),
            password: Set(None),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        };
        user::Entity::insert(model)
            .exec(&self.db)
            .await
            .unwrap()
            .last_insert_id
    }

    /// Rename a row straight in the store, bypassing repository and cache.
    pub async fn rename_raw(&self, id: i64, username: &str) {
        let model = user::ActiveModel {
            id: Set(id),
            username: Set(Some(username.to_string())),
            ..Default::default()
        };
        user::Entity::update(model).exec(&self.db).await.unwrap();
    }

    pub async fn delete_raw(&self, id: i64) {
        user::Entity::delete_by_id(id).exec(&self.db).await.unwrap();
    }

    pub async fn find_raw(&self, id: i64) -> Option<user::Model> {
        user::Entity::find_by_id(id).one(&self.db).await.unwrap()
    }

    pub async fn count_raw(&self) -> usize {
        user::Entity::find().all(&self.db).await.unwrap().len()
    }
}
