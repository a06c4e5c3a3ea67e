use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::feed::variant::FeedVariant;

/// A serialized `<item>` element.
pub type Fragment = Arc<str>;

/// Identifies a fragment by feed namespace and article slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Constructor, derive_more::Display)]
#[display("{namespace}/{name}.xml")]
pub struct FragmentKey {
    pub namespace: String,
    pub name: String,
}

/// Fragments embed absolute links, so they are keyed by link scheme as well
/// as by variant.
pub fn fragment_namespace(variant: FeedVariant, secure: bool) -> String {
    let scheme = if secure { "https" } else { "http" };
    format!("{}/{}", variant.name(), scheme)
}

#[async_trait]
pub trait FragmentCache: Send + Sync {
    async fn get(&self, key: &FragmentKey) -> Option<Fragment>;
    async fn put(&self, key: FragmentKey, fragment: Fragment);
}

/// Stores nothing; every lookup misses.
#[derive(Debug, Clone, Default)]
pub struct NoopFragmentCache;

#[async_trait]
impl FragmentCache for NoopFragmentCache {
    async fn get(&self, _key: &FragmentKey) -> Option<Fragment> {
        None
    }

    async fn put(&self, key: FragmentKey, fragment: Fragment) {
        trace!("discarding fragment {} ({} bytes)", key, fragment.len());
    }
}

/// In-memory fragment cache with bounded capacity.
#[derive(Clone)]
pub struct MokaFragmentCache {
    cache: Cache<FragmentKey, Fragment>,
}

impl MokaFragmentCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }
}

#[async_trait]
impl FragmentCache for MokaFragmentCache {
    async fn get(&self, key: &FragmentKey) -> Option<Fragment> {
        let hit = self.cache.get(key).await;
        if hit.is_some() {
            trace!("fragment cache hit: {}", key);
        }
        hit
    }

    async fn put(&self, key: FragmentKey, fragment: Fragment) {
        debug!("caching fragment {} ({} bytes)", key, fragment.len());
        self.cache.insert(key, fragment).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> FragmentKey {
        FragmentKey::new("yandexturbo".to_string(), name.to_string())
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key("dacha").to_string(), "yandexturbo/dacha.xml");
    }

    #[test]
    fn test_namespace_includes_scheme() {
        assert_eq!(fragment_namespace(FeedVariant::YandexTurbo, true), "yandexturbo/https");
        assert_eq!(fragment_namespace(FeedVariant::YandexTurbo, false), "yandexturbo/http");
        assert_eq!(fragment_namespace(FeedVariant::Generic, true), "default/https");
    }

    #[tokio::test]
    async fn test_noop_always_misses() {
        let cache = NoopFragmentCache;
        cache.put(key("a"), Arc::from("<item></item>")).await;
        assert!(cache.get(&key("a")).await.is_none());
    }

    #[tokio::test]
    async fn test_moka_round_trip() {
        let cache = MokaFragmentCache::new(16);
        assert!(cache.get(&key("a")).await.is_none());

        cache.put(key("a"), Arc::from("<item>a</item>")).await;
        assert_eq!(cache.get(&key("a")).await.as_deref(), Some("<item>a</item>"));

        let other_namespace = FragmentKey::new("default".to_string(), "a".to_string());
        assert!(cache.get(&other_namespace).await.is_none());
    }
}
