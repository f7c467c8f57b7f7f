//! Feed cache key schema
//!
//! Key format: v{VERSION}:feed:user:{user_id}

use crate::UserId;

/// Cache schema version - increment when changing key or entry formats
pub const CACHE_VERSION: u32 = 1;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Feed bucket of a user
    /// Format: v1:feed:user:{user_id}
    pub fn feed(user_id: UserId) -> String {
        format!("v{}:feed:user:{}", CACHE_VERSION, user_id)
    }

    /// SCAN pattern matching every feed bucket
    pub fn feed_pattern() -> String {
        format!("v{}:feed:user:*", CACHE_VERSION)
    }

    /// Owner of a feed bucket key
    pub fn feed_owner(key: &str) -> Option<UserId> {
        let prefix = format!("v{}:feed:user:", CACHE_VERSION);
        key.strip_prefix(&prefix)?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_key() {
        assert_eq!(CacheKey::feed(42), "v1:feed:user:42");
    }

    #[test]
    fn test_feed_pattern_matches_key_prefix() {
        let pattern = CacheKey::feed_pattern();
        let prefix = pattern.trim_end_matches('*');
        assert!(CacheKey::feed(7).starts_with(prefix));
    }

    #[test]
    fn test_feed_owner() {
        assert_eq!(CacheKey::feed_owner(&CacheKey::feed(1234)), Some(1234));
        assert_eq!(CacheKey::feed_owner("v1:post:1234"), None);
        assert_eq!(CacheKey::feed_owner("v1:feed:user:abc"), None);
    }
}
