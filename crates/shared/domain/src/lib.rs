//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! the user entity and its DTOs, password hashing, and pagination arithmetic.

pub mod constants;
pub mod error;
pub mod pagination;
pub mod password;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use pagination::{compute_offset, Pagination};
pub use password::Password;
pub use user::{CreateUser, UpdateUser, User};
