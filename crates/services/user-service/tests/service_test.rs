//! User use-case tests.

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_test::{assert_err, assert_ok};

use common::{AppError, AppResult};
use domain::{user_cache_key, CreateUser, Password, UpdateUser};
use support::Fixture;
use user_service_lib::repository::{Context, Transaction, TransactionManager};
use user_service_lib::service::{UserManager, UserService};

/// Transaction boundary that refuses to start.
struct UnavailableTransaction;

#[async_trait]
impl Transaction for UnavailableTransaction {
    async fn execute_in_transaction<F, T>(&self, _ctx: &Context<'_>, _f: F) -> AppResult<T>
    where
        F: for<'c> FnOnce(Context<'c>) -> BoxFuture<'c, AppResult<T>> + Send,
        T: Send,
    {
        Err(AppError::internal("transactions unavailable"))
    }
}

fn manager(fx: &Fixture) -> UserManager<TransactionManager> {
    UserManager::new(fx.repo.clone(), TransactionManager::new(fx.db.clone()))
}

#[tokio::test]
async fn test_save_and_get_user() {
    let fx = Fixture::new().await;
    let service = manager(&fx);
    let ctx = Context::background();

    let id = assert_ok!(service.save_user(&ctx, CreateUser::new("alice", "p1")).await);
    assert_eq!(id, 1);

    let user = assert_ok!(service.get_user_by_id(&ctx, id).await);
    assert_eq!(user.username.as_deref(), Some("alice"));
    assert_eq!(assert_ok!(service.get_username(&ctx, id).await), "alice");
}

#[tokio::test]
async fn test_update_user_commits_and_evicts() {
    let fx = Fixture::new().await;
    let service = manager(&fx);
    let ctx = Context::background();
    let id = fx.insert_raw(Some("alice")).await;

    service.get_user_by_id(&ctx, id).await.unwrap();
    assert!(fx.cache.contains(&user_cache_key(id)));

    assert_ok!(
        service
            .update_user(&ctx, UpdateUser::new(id).username("alicia"))
            .await
    );

    assert!(!fx.cache.contains(&user_cache_key(id)));
    let user = service.get_user_by_id(&ctx, id).await.unwrap();
    assert_eq!(user.username.as_deref(), Some("alicia"));
}

#[tokio::test]
async fn test_update_user_stores_hashed_password() {
    let fx = Fixture::new().await;
    let service = manager(&fx);
    let id = fx.insert_raw(Some("alice")).await;

    assert_ok!(
        service
            .update_user(&Context::background(), UpdateUser::new(id).password("p2"))
            .await
    );

    let row = fx.find_raw(id).await.unwrap();
    let stored = row.password.unwrap();
    assert_ne!(stored, "p2");
    assert!(Password::from_hash(stored).verify("p2"));
    assert_eq!(row.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_update_missing_user_is_not_found() {
    let fx = Fixture::new().await;
    let service = manager(&fx);

    let result = service
        .update_user(&Context::background(), UpdateUser::new(9).username("x"))
        .await;

    assert!(matches!(result, Err(AppError::UserNotFound)));
}

#[tokio::test]
async fn test_update_propagates_transaction_failure() {
    let fx = Fixture::new().await;
    let service = UserManager::new(fx.repo.clone(), UnavailableTransaction);
    let id = fx.insert_raw(Some("alice")).await;

    let err = assert_err!(
        service
            .update_user(&Context::background(), UpdateUser::new(id).username("x"))
            .await
    );

    assert!(matches!(err, AppError::Internal(_)));
    assert_eq!(
        fx.find_raw(id).await.unwrap().username.as_deref(),
        Some("alice")
    );
}

#[tokio::test]
async fn test_list_and_batch_through_service() {
    let fx = Fixture::new().await;
    let service = manager(&fx);
    let ctx = Context::background();
    let a = fx.insert_raw(Some("alice")).await;
    let b = fx.insert_raw(Some("bob")).await;

    let (users, total) = service
        .list_user(&ctx, 1, 10, Some("bo".to_string()))
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(users[0].id, b);

    let names = service
        .get_username_batch(&ctx, vec![a, b, 404])
        .await
        .unwrap();
    assert_eq!(names.len(), 2);
}

#[tokio::test]
async fn test_delete_user() {
    let fx = Fixture::new().await;
    let service: Arc<dyn UserService> = Arc::new(manager(&fx));
    let ctx = Context::background();
    let id = fx.insert_raw(Some("alice")).await;

    assert_ok!(service.delete_user(&ctx, id).await);
    assert!(matches!(
        service.delete_user(&ctx, id).await,
        Err(AppError::UserNotFound)
    ));
}
