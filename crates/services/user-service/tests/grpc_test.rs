//! gRPC adapter tests, calling the service handlers in-process.

mod support;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tonic::{Code, Request};

use common::{AppResult, ERROR_REASON_METADATA_KEY};
use domain::{CreateUser, UpdateUser, User};
use proto::user::{
    ListUserRequest, SaveUserRequest, UpdateUserRequest, UserIdRequest, UserIdsRequest,
};
use proto::UserService as _;
use support::setup_db;
use user_service_lib::config::UserServiceConfig;
use user_service_lib::grpc::UserGrpcService;
use user_service_lib::infra::MemoryCache;
use user_service_lib::repository::Context;
use user_service_lib::service::UserService;

/// Use cases that never complete.
struct StalledService;

async fn stall<T>() -> AppResult<T> {
    std::future::pending().await
}

#[async_trait]
impl UserService for StalledService {
    async fn list_user(
        &self,
        _ctx: &Context<'_>,
        _page: i64,
        _page_size: i64,
        _username: Option<String>,
    ) -> AppResult<(Vec<User>, u64)> {
        stall().await
    }

    async fn get_user_by_id(&self, _ctx: &Context<'_>, _id: i64) -> AppResult<User> {
        stall().await
    }

    async fn get_username(&self, _ctx: &Context<'_>, _id: i64) -> AppResult<String> {
        stall().await
    }

    async fn get_username_batch(
        &self,
        _ctx: &Context<'_>,
        _ids: Vec<i64>,
    ) -> AppResult<HashMap<i64, String>> {
        stall().await
    }

    async fn save_user(&self, _ctx: &Context<'_>, _user: CreateUser) -> AppResult<i64> {
        stall().await
    }

    async fn update_user(&self, _ctx: &Context<'_>, _user: UpdateUser) -> AppResult<()> {
        stall().await
    }

    async fn delete_user(&self, _ctx: &Context<'_>, _id: i64) -> AppResult<()> {
        stall().await
    }
}

async fn grpc_service(frozen: &[i64]) -> UserGrpcService {
    let mut config = UserServiceConfig::default();
    config.frozen_user_ids = frozen.iter().copied().collect();

    let service =
        user_service_lib::build_user_service(setup_db().await, Arc::new(MemoryCache::new()), &config);
    UserGrpcService::new(service, Duration::from_secs(5))
}

fn reason(status: &tonic::Status) -> &str {
    status
        .metadata()
        .get(ERROR_REASON_METADATA_KEY)
        .unwrap()
        .to_str()
        .unwrap()
}

async fn save(svc: &UserGrpcService, username: &str) -> i64 {
    svc.save_user(Request::new(SaveUserRequest {
        username: username.to_string(),
        password: String::new(),
    }))
    .await
    .unwrap()
    .into_inner()
    .id
}

#[tokio::test]
async fn test_save_then_get_user() {
    let svc = grpc_service(&[]).await;

    let reply = svc
        .save_user(Request::new(SaveUserRequest {
            username: "alice".to_string(),
            password: "p1".to_string(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(reply.id, 1);

    let user = svc
        .get_user(Request::new(UserIdRequest { id: 1 }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(user.username, "alice");
    assert!(user.created_at.is_some());
    assert!(user.updated_at.is_none());
}

#[tokio::test]
async fn test_get_missing_user_is_not_found() {
    let svc = grpc_service(&[]).await;

    let status = svc
        .get_user(Request::new(UserIdRequest { id: 12 }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(reason(&status), "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_frozen_user_name_is_failed_precondition() {
    let svc = grpc_service(&[1]).await;
    let frozen = save(&svc, "alice").await;
    let active = save(&svc, "bob").await;

    let status = svc
        .get_user_name(Request::new(UserIdRequest { id: frozen }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::FailedPrecondition);
    assert_eq!(reason(&status), "USER_IS_FROZEN");

    let name = svc
        .get_user_name(Request::new(UserIdRequest { id: active }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(name.username, "bob");
}

#[tokio::test]
async fn test_list_and_name_map() {
    let svc = grpc_service(&[]).await;
    let a = save(&svc, "alice").await;
    let b = save(&svc, "bob").await;
    save(&svc, "carol").await;

    let reply = svc
        .list_user(Request::new(ListUserRequest {
            page: 1,
            page_size: 2,
            username: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(reply.total, 3);
    assert_eq!(reply.list.len(), 2);

    let names = svc
        .get_user_name_map(Request::new(UserIdsRequest { ids: vec![a, b, 99] }))
        .await
        .unwrap()
        .into_inner()
        .name_map;
    assert_eq!(names.len(), 2);
    assert_eq!(names[&a], "alice");
}

#[tokio::test]
async fn test_update_and_delete() {
    let svc = grpc_service(&[]).await;
    let id = save(&svc, "alice").await;

    let updated = svc
        .update_user(Request::new(UpdateUserRequest {
            id,
            username: Some("alicia".to_string()),
            password: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(updated.success);

    let user = svc
        .get_user(Request::new(UserIdRequest { id }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(user.username, "alicia");
    assert!(user.updated_at.is_some());

    let deleted = svc
        .delete_user(Request::new(UserIdRequest { id }))
        .await
        .unwrap()
        .into_inner();
    assert!(deleted.success);

    let status = svc
        .delete_user(Request::new(UserIdRequest { id }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);
}

#[tokio::test]
async fn test_update_rejects_empty_password() {
    let svc = grpc_service(&[]).await;
    let id = save(&svc, "alice").await;

    let status = svc
        .update_user(Request::new(UpdateUserRequest {
            id,
            username: None,
            password: Some(String::new()),
        }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(reason(&status), "VALIDATION_ERROR");
}

#[tokio::test(start_paused = true)]
async fn test_request_deadline_is_deadline_exceeded() {
    let svc = UserGrpcService::new(Arc::new(StalledService), Duration::from_millis(50));

    let status = svc
        .get_user(Request::new(UserIdRequest { id: 1 }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::DeadlineExceeded);
    assert_eq!(reason(&status), "DEADLINE_EXCEEDED");
}
