//! Domain-level constants.
//!
//! These constants define business rules shared by every layer.

// =============================================================================
// Pagination
// =============================================================================

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

/// Page size used when the caller sends a non-positive value
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Maximum allowed items per page to prevent excessive queries
pub const MAX_PAGE_SIZE: u64 = 100;

// =============================================================================
// Cache
// =============================================================================

/// Cache key prefix for user entities
pub const CACHE_PREFIX_USER_INFO: &str = "user:info:";

/// Lifetime of a cached user entry in seconds
pub const USER_CACHE_TTL_SECONDS: u64 = 600;

/// Build the cache key for a user id.
pub fn user_cache_key(id: i64) -> String {
    format!("{}{}", CACHE_PREFIX_USER_INFO, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_cache_key() {
        assert_eq!(user_cache_key(42), "user:info:42");
        assert_eq!(user_cache_key(-1), "user:info:-1");
    }
}
