use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use synthdb_core::ParsedSchema;

use crate::model::CacheSettings;
use crate::request::{DatabaseRequest, truncate_chars};

/// A cached schema. Sample data is never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSchema {
    pub schema_sql: String,
    pub parsed: ParsedSchema,
}

/// Schema cache seam for the orchestrator.
pub trait SchemaCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedSchema>;
    fn insert(&self, key: String, schema: CachedSchema);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key for a request: 16 hex chars of SHA-256 over business type,
/// complexity and the first 50 characters of the description.
///
/// The digest is SHA-256, not MD5. Keys never leave the process.
pub fn cache_key(request: &DatabaseRequest) -> String {
    let material = format!(
        "{}_{}_{}",
        request.business_type,
        request.complexity,
        truncate_chars(&request.description, 50)
    );
    let digest = Sha256::digest(material.as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(16);
    key
}

struct Entry {
    schema: CachedSchema,
    inserted_at: Instant,
    last_used: u64,
}

struct LruState {
    entries: HashMap<String, Entry>,
    tick: u64,
}

/// Bounded least-recently-used cache with optional expiry.
pub struct LruSchemaCache {
    capacity: usize,
    ttl: Option<Duration>,
    state: Mutex<LruState>,
}

impl LruSchemaCache {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                tick: 0,
            }),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.capacity, settings.ttl_secs.map(Duration::from_secs))
    }

    fn expired(&self, entry: &Entry) -> bool {
        self.ttl
            .map(|ttl| entry.inserted_at.elapsed() >= ttl)
            .unwrap_or(false)
    }
}

impl Default for LruSchemaCache {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}

impl SchemaCache for LruSchemaCache {
    fn get(&self, key: &str) -> Option<CachedSchema> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let expired = state.entries.get(key).map(|entry| self.expired(entry))?;
        if expired {
            state.entries.remove(key);
            return None;
        }

        state.tick += 1;
        let tick = state.tick;
        let entry = state.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.schema.clone())
    }

    fn insert(&self, key: String, schema: CachedSchema) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.tick += 1;
        let tick = state.tick;

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            key,
            Entry {
                schema,
                inserted_at: Instant::now(),
                last_used: tick,
            },
        );
    }

    fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{BusinessType, Complexity};

    fn cached(sql: &str) -> CachedSchema {
        CachedSchema {
            schema_sql: sql.to_string(),
            parsed: ParsedSchema::default(),
        }
    }

    #[test]
    fn key_ignores_description_past_fifty_chars() {
        let base = "x".repeat(50);
        let a = DatabaseRequest::new(BusinessType::Retail, Complexity::Simple, format!("{base}aaa"));
        let b = DatabaseRequest::new(BusinessType::Retail, Complexity::Simple, format!("{base}bbb"));
        let c = DatabaseRequest::new(BusinessType::Retail, Complexity::Medium, format!("{base}aaa"));

        assert_eq!(cache_key(&a), cache_key(&b));
        assert_ne!(cache_key(&a), cache_key(&c));
        assert_eq!(cache_key(&a).len(), 16);
        assert!(cache_key(&a).chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_is_truncated_sha256_of_request_material() {
        let request = DatabaseRequest::new(BusinessType::Retail, Complexity::Simple, "shop");
        assert_eq!(cache_key(&request), "c0b0d6f3bf789e9c");
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = LruSchemaCache::new(2, None);
        cache.insert("a".into(), cached("A"));
        cache.insert("b".into(), cached("B"));
        assert!(cache.get("a").is_some());
        cache.insert("c".into(), cached("C"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").map(|s| s.schema_sql), Some("A".to_string()));
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = LruSchemaCache::new(4, Some(Duration::ZERO));
        cache.insert("a".into(), cached("A"));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }
}
