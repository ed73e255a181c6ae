// In-process TTL cache for external API lookups (FDC nutrient data)
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

lazy_static::lazy_static! {
    static ref CACHE: RwLock<HashMap<String, CacheEntry>> = RwLock::new(HashMap::new());
}

pub fn get_cached(key: &str) -> Option<String> {
    let cache = CACHE.read().ok()?;
    let entry = cache.get(key)?;
    if Instant::now() < entry.expires_at {
        Some(entry.value.clone())
    } else {
        None
    }
}

pub fn set_cache(key: String, value: String, ttl: Duration) {
    if let Ok(mut cache) = CACHE.write() {
        let now = Instant::now();
        cache.retain(|_, entry| entry.expires_at > now);
        cache.insert(key, CacheEntry { value, expires_at: now + ttl });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_roundtrip() {
        set_cache("cache-test:garlic".to_string(), "{\"kcal\":149}".to_string(), Duration::from_secs(60));
        assert_eq!(get_cached("cache-test:garlic").as_deref(), Some("{\"kcal\":149}"));
    }

    #[test]
    fn test_expired_entry_is_ignored() {
        set_cache("cache-test:expired".to_string(), "x".to_string(), Duration::from_secs(0));
        assert!(get_cached("cache-test:expired").is_none());
    }

    #[test]
    fn test_missing_key() {
        assert!(get_cached("cache-test:never-set").is_none());
    }
}
