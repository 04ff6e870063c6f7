//! User service - Handles user-related business logic.
//!
//! Orchestrates repository calls and owns the transaction boundary for
//! multi-step writes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use common::AppResult;
use domain::{CreateUser, UpdateUser, User};

use crate::in_transaction;
use crate::repository::{hash_password, Context, Transaction, UserRepository};

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// One page of users plus the total matching the optional username filter
    async fn list_user(
        &self,
        ctx: &Context<'_>,
        page: i64,
        page_size: i64,
        username: Option<String>,
    ) -> AppResult<(Vec<User>, u64)>;

    async fn get_user_by_id(&self, ctx: &Context<'_>, id: i64) -> AppResult<User>;

    /// Username of an active account
    async fn get_username(&self, ctx: &Context<'_>, id: i64) -> AppResult<String>;

    async fn get_username_batch(
        &self,
        ctx: &Context<'_>,
        ids: Vec<i64>,
    ) -> AppResult<HashMap<i64, String>>;

    /// Create a user, returning its id
    async fn save_user(&self, ctx: &Context<'_>, user: CreateUser) -> AppResult<i64>;

    async fn update_user(&self, ctx: &Context<'_>, user: UpdateUser) -> AppResult<()>;

    async fn delete_user(&self, ctx: &Context<'_>, id: i64) -> AppResult<()>;
}

/// Concrete implementation of UserService.
pub struct UserManager<T: Transaction> {
    repo: Arc<dyn UserRepository>,
    tx: T,
}

impl<T: Transaction> UserManager<T> {
    pub fn new(repo: Arc<dyn UserRepository>, tx: T) -> Self {
        Self { repo, tx }
    }
}

#[async_trait]
impl<T: Transaction> UserService for UserManager<T> {
    async fn list_user(
        &self,
        ctx: &Context<'_>,
        page: i64,
        page_size: i64,
        username: Option<String>,
    ) -> AppResult<(Vec<User>, u64)> {
        self.repo
            .list_user(ctx, page, page_size, username.as_deref())
            .await
    }

    async fn get_user_by_id(&self, ctx: &Context<'_>, id: i64) -> AppResult<User> {
        self.repo.get_by_id(ctx, id).await
    }

    async fn get_username(&self, ctx: &Context<'_>, id: i64) -> AppResult<String> {
        self.repo.get_username(ctx, id).await
    }

    async fn get_username_batch(
        &self,
        ctx: &Context<'_>,
        ids: Vec<i64>,
    ) -> AppResult<HashMap<i64, String>> {
        self.repo.get_username_batch(ctx, &ids).await
    }

    async fn save_user(&self, ctx: &Context<'_>, user: CreateUser) -> AppResult<i64> {
        let id = self.repo.save(ctx, user).await?;
        tracing::info!(user_id = id, "User saved");
        Ok(id)
    }

    async fn update_user(&self, ctx: &Context<'_>, user: UpdateUser) -> AppResult<()> {
        let UpdateUser {
            id,
            username,
            password,
        } = user;
        // Hash before a pooled connection is held
        let password = match password {
            Some(plain) => Some(hash_password(plain).await?),
            None => None,
        };
        let repo = Arc::clone(&self.repo);

        in_transaction!(self.tx, ctx, |tx_ctx| repo
            .update(&tx_ctx, id, username, password)
            .await)?;

        // A read between the in-transaction evict and commit may have
        // repopulated the entry with the old row
        self.repo.evict(id).await;
        Ok(())
    }

    async fn delete_user(&self, ctx: &Context<'_>, id: i64) -> AppResult<()> {
        self.repo.delete(ctx, id).await
    }
}
