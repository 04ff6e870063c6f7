//! gRPC implementation for UserService.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tonic::{Request, Response, Status};

use common::AppError;
use domain::{CreateUser, UpdateUser, User};

use crate::repository::Context;
use crate::service::UserService;
use proto::user::{
    user_service_server::UserService as UserServiceProto, DeleteUserReply, ListUserReply,
    ListUserRequest, SaveUserReply, SaveUserRequest, UpdateUserReply, UpdateUserRequest,
    UserIdRequest, UserIdsRequest, UserNameMapReply, UserNameReply, UserReply,
};

/// gRPC service wrapper for UserService.
pub struct UserGrpcService {
    service: Arc<dyn UserService>,
    request_timeout: Duration,
}

impl UserGrpcService {
    pub fn new(service: Arc<dyn UserService>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }

    /// Fresh per-request context carrying the request deadline.
    fn context(&self) -> Context<'static> {
        Context::background().with_timeout(self.request_timeout)
    }
}

#[tonic::async_trait]
impl UserServiceProto for UserGrpcService {
    async fn list_user(
        &self,
        request: Request<ListUserRequest>,
    ) -> Result<Response<ListUserReply>, Status> {
        let req = request.into_inner();
        let ctx = self.context();

        let (users, total) = ctx
            .run(self.service.list_user(
                &ctx,
                i64::from(req.page),
                i64::from(req.page_size),
                req.username.filter(|name| !name.is_empty()),
            ))
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ListUserReply {
            list: users.iter().map(user_to_proto).collect(),
            total: i32::try_from(total).unwrap_or(i32::MAX),
        }))
    }

    async fn get_user(
        &self,
        request: Request<UserIdRequest>,
    ) -> Result<Response<UserReply>, Status> {
        let req = request.into_inner();
        let ctx = self.context();

        let user = ctx
            .run(self.service.get_user_by_id(&ctx, req.id))
            .await
            .map_err(Status::from)?;
        Ok(Response::new(user_to_proto(&user)))
    }

    async fn get_user_name(
        &self,
        request: Request<UserIdRequest>,
    ) -> Result<Response<UserNameReply>, Status> {
        let req = request.into_inner();
        let ctx = self.context();

        let username = ctx
            .run(self.service.get_username(&ctx, req.id))
            .await
            .map_err(Status::from)?;
        Ok(Response::new(UserNameReply { username }))
    }

    async fn get_user_name_map(
        &self,
        request: Request<UserIdsRequest>,
    ) -> Result<Response<UserNameMapReply>, Status> {
        let req = request.into_inner();
        let ctx = self.context();

        let name_map = ctx
            .run(self.service.get_username_batch(&ctx, req.ids))
            .await
            .map_err(Status::from)?;
        Ok(Response::new(UserNameMapReply { name_map }))
    }

    async fn save_user(
        &self,
        request: Request<SaveUserRequest>,
    ) -> Result<Response<SaveUserReply>, Status> {
        let req = request.into_inner();
        let ctx = self.context();

        let user = CreateUser {
            username: non_empty(req.username),
            password: non_empty(req.password),
        };

        let id = ctx
            .run(self.service.save_user(&ctx, user))
            .await
            .map_err(Status::from)?;
        Ok(Response::new(SaveUserReply { id }))
    }

    async fn update_user(
        &self,
        request: Request<UpdateUserRequest>,
    ) -> Result<Response<UpdateUserReply>, Status> {
        let req = request.into_inner();
        let ctx = self.context();

        if req.password.as_deref() == Some("") {
            return Err(AppError::validation("password must not be empty").into());
        }
        let user = UpdateUser {
            id: req.id,
            username: req.username,
            password: req.password,
        };

        ctx.run(self.service.update_user(&ctx, user))
            .await
            .map_err(Status::from)?;
        Ok(Response::new(UpdateUserReply { success: true }))
    }

    async fn delete_user(
        &self,
        request: Request<UserIdRequest>,
    ) -> Result<Response<DeleteUserReply>, Status> {
        let req = request.into_inner();
        let ctx = self.context();

        ctx.run(self.service.delete_user(&ctx, req.id))
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteUserReply { success: true }))
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn timestamp(dt: &DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

/// Convert domain User to proto UserReply (no password hash).
fn user_to_proto(user: &User) -> UserReply {
    UserReply {
        id: user.id,
        username: user.username_or_default().to_string(),
        created_at: Some(timestamp(&user.created_at)),
        updated_at: user.updated_at.as_ref().map(timestamp),
    }
}
