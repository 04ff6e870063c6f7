//! Infrastructure layer - database and cache clients.

pub mod cache;
mod db;
pub mod migrations;

pub use cache::{CacheStore, MemoryCache, RedisCache};
pub use db::Database;
pub use migrations::Migrator;

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockCacheStore;
