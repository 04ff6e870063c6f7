//! Repository layer for data access.
//!
//! Every operation takes a [`Context`]. When the context carries a
//! transaction the operation runs on it, otherwise on the connection pool.

mod context;
pub mod entities;
mod filter;
mod freeze;
mod user_repository;

pub use context::{Context, Transaction, TransactionManager};
pub use filter::{UserFilter, UserPredicate};
pub use freeze::{FreezePolicy, FrozenUserIds, NeverFrozen};
pub use user_repository::{hash_password, UserRepository, UserStore};
