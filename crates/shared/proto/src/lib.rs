//! gRPC protocol buffer definitions.
//!
//! This crate contains the generated gRPC service definitions for the
//! user service (list, lookup, name resolution, save, update, delete).

/// User service definitions.
pub mod user {
    tonic::include_proto!("user");
}

pub use user::user_service_server::{UserService, UserServiceServer};
