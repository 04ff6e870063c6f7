//! User repository with a cache-aside read path.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use common::{AppError, AppResult, OptionExt};
use domain::{user_cache_key, CreateUser, Pagination, Password, User, USER_CACHE_TTL_SECONDS};

use super::context::Context;
use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use super::filter::UserFilter;
use super::freeze::{FreezePolicy, NeverFrozen};
use crate::infra::CacheStore;

/// Run `$body` against the context's transaction when present, otherwise
/// against `$db`.
macro_rules! on_executor {
    ($ctx:expr, $db:expr, |$conn:ident| $body:expr) => {
        match $ctx.transaction() {
            Some($conn) => $body,
            None => {
                let $conn = $db;
                $body
            }
        }
    };
}

/// User repository trait for dependency injection.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// One page of users, newest first, plus the total matching the filter.
    async fn list_user(
        &self,
        ctx: &Context<'_>,
        page: i64,
        page_size: i64,
        username: Option<&str>,
    ) -> AppResult<(Vec<User>, u64)>;

    /// Cache-aside lookup by id.
    async fn get_by_id(&self, ctx: &Context<'_>, id: i64) -> AppResult<User>;

    /// Username of an active (not frozen) account.
    async fn get_username(&self, ctx: &Context<'_>, id: i64) -> AppResult<String>;

    /// Usernames keyed by id. Unknown ids are left out.
    async fn get_username_batch(
        &self,
        ctx: &Context<'_>,
        ids: &[i64],
    ) -> AppResult<HashMap<i64, String>>;

    /// Insert a user and return the generated id.
    async fn save(&self, ctx: &Context<'_>, user: CreateUser) -> AppResult<i64>;

    /// Write the provided fields and stamp `updated_at`. The password
    /// arrives already hashed.
    async fn update(
        &self,
        ctx: &Context<'_>,
        id: i64,
        username: Option<String>,
        password: Option<Password>,
    ) -> AppResult<()>;

    async fn delete(&self, ctx: &Context<'_>, id: i64) -> AppResult<()>;

    /// Drop the cached copy of a user. Best-effort.
    async fn evict(&self, id: i64);
}

/// SeaORM + cache implementation of [`UserRepository`].
pub struct UserStore {
    db: DatabaseConnection,
    cache: Arc<dyn CacheStore>,
    freeze: Arc<dyn FreezePolicy>,
    cache_ttl_seconds: u64,
}

impl UserStore {
    pub fn new(db: DatabaseConnection, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            db,
            cache,
            freeze: Arc::new(NeverFrozen),
            cache_ttl_seconds: USER_CACHE_TTL_SECONDS,
        }
    }

    pub fn with_freeze_policy(mut self, freeze: Arc<dyn FreezePolicy>) -> Self {
        self.freeze = freeze;
        self
    }

    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl_seconds = seconds;
        self
    }

    /// Cached user, or `None` on any miss. Read and decode failures are misses.
    async fn read_cache(&self, key: &str) -> Option<User> {
        let json = match self.cache.get_document(key).await {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Overwrite the cached copy and reset its TTL. Failures are logged only.
    async fn write_cache(&self, key: &str, user: &User) {
        let json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache serialization failed");
                return;
            }
        };

        if let Err(e) = self.cache.set_document(key, &json).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
            return;
        }
        if let Err(e) = self.cache.expire(key, self.cache_ttl_seconds).await {
            tracing::warn!(key = %key, error = %e, "Cache expire failed");
        }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn list_user(
        &self,
        ctx: &Context<'_>,
        page: i64,
        page_size: i64,
        username: Option<&str>,
    ) -> AppResult<(Vec<User>, u64)> {
        let pagination = Pagination::new(page, page_size);
        let filter = UserFilter::new().username_contains(username);
        tracing::debug!(
            page = pagination.page(),
            page_size = pagination.page_size(),
            "Listing users"
        );

        let (models, total) =
            on_executor!(ctx, &self.db, |conn| fetch_page(conn, filter, pagination).await)?;

        Ok((models.into_iter().map(User::from).collect(), total))
    }

    async fn get_by_id(&self, ctx: &Context<'_>, id: i64) -> AppResult<User> {
        // Uncommitted rows must never reach the shared cache, and the
        // transaction must see its own writes
        if let Some(txn) = ctx.transaction() {
            return find_user(txn, id).await;
        }

        let key = user_cache_key(id);

        if let Some(user) = self.read_cache(&key).await {
            tracing::debug!(user_id = id, "User cache hit");
            return Ok(user);
        }
        tracing::debug!(user_id = id, "User cache miss");

        let user = find_user(&self.db, id).await?;

        self.write_cache(&key, &user).await;
        Ok(user)
    }

    async fn get_username(&self, ctx: &Context<'_>, id: i64) -> AppResult<String> {
        let filter = UserFilter::new().id(id);

        let username = on_executor!(ctx, &self.db, |conn| UserEntity::find()
            .select_only()
            .column(user::Column::Username)
            .filter(filter.into_condition())
            .into_tuple::<Option<String>>()
            .one(conn)
            .await)?
        .ok_or_user_not_found()?;

        if self.freeze.is_frozen(id) {
            return Err(AppError::UserIsFrozen);
        }

        Ok(username.unwrap_or_default())
    }

    async fn get_username_batch(
        &self,
        ctx: &Context<'_>,
        ids: &[i64],
    ) -> AppResult<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let filter = UserFilter::new().id_in(ids.iter().copied());

        let rows = on_executor!(ctx, &self.db, |conn| UserEntity::find()
            .select_only()
            .column(user::Column::Id)
            .column(user::Column::Username)
            .filter(filter.into_condition())
            .into_tuple::<(i64, Option<String>)>()
            .all(conn)
            .await)?;

        Ok(rows
            .into_iter()
            .map(|(id, username)| (id, username.unwrap_or_default()))
            .collect())
    }

    async fn save(&self, ctx: &Context<'_>, user: CreateUser) -> AppResult<i64> {
        let password = match user.password {
            Some(plain) => Some(hash_password(plain).await?),
            None => None,
        };

        let mut active = ActiveModel::new();
        active.username = Set(user.username);
        active.password = Set(password.map(Password::into_string));
        active.created_at = Set(chrono::Utc::now());
        active.updated_at = Set(None);

        let result = on_executor!(ctx, &self.db, |conn| UserEntity::insert(active)
            .exec(conn)
            .await)?;

        Ok(result.last_insert_id)
    }

    async fn update(
        &self,
        ctx: &Context<'_>,
        id: i64,
        username: Option<String>,
        password: Option<Password>,
    ) -> AppResult<()> {
        let mut active = ActiveModel::new();
        if let Some(username) = username {
            active.username = Set(Some(username));
        }
        if let Some(password) = password {
            active.password = Set(Some(password.into_string()));
        }
        active.updated_at = Set(Some(chrono::Utc::now()));

        let filter = UserFilter::new().id(id);
        let result = on_executor!(ctx, &self.db, |conn| UserEntity::update_many()
            .set(active)
            .filter(filter.into_condition())
            .exec(conn)
            .await)?;

        if result.rows_affected == 0 {
            return Err(AppError::UserNotFound);
        }

        self.evict(id).await;
        Ok(())
    }

    async fn delete(&self, ctx: &Context<'_>, id: i64) -> AppResult<()> {
        let result = on_executor!(ctx, &self.db, |conn| UserEntity::delete_by_id(id)
            .exec(conn)
            .await)?;

        if result.rows_affected == 0 {
            return Err(AppError::UserNotFound);
        }

        self.evict(id).await;
        Ok(())
    }

    async fn evict(&self, id: i64) {
        let key = user_cache_key(id);
        if let Err(e) = self.cache.delete(&key).await {
            tracing::warn!(key = %key, error = %e, "Cache eviction failed");
        }
    }
}

async fn find_user<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<User> {
    UserEntity::find_by_id(id)
        .one(conn)
        .await?
        .map(User::from)
        .ok_or_user_not_found()
}

/// Count the filtered set, then fetch one page of it ordered by `created_at` desc.
async fn fetch_page<C: ConnectionTrait>(
    conn: &C,
    filter: UserFilter,
    pagination: Pagination,
) -> Result<(Vec<user::Model>, u64), sea_orm::DbErr> {
    let query = UserEntity::find().filter(filter.into_condition());

    let total = query.clone().count(conn).await?;
    let models = query
        .order_by_desc(user::Column::CreatedAt)
        .offset(pagination.offset())
        .limit(pagination.limit())
        .all(conn)
        .await?;

    Ok((models, total))
}

/// Hash a plaintext password on the blocking pool.
pub async fn hash_password(plain: String) -> AppResult<Password> {
    tokio::task::spawn_blocking(move || Password::new(&plain))
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}
