//! LRU memo of encoded page images, shared by the render workers

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::request::{RenderKind, RenderParams};
use super::types::EncodedImage;

/// Cache key for encoded pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Page index (0-based)
    pub page: usize,
    pub kind: RenderKind,
    pub target_width: u32,
    pub target_height: u32,
    /// Quality stored as permille for stable hashing
    pub quality_permille: u16,
}

impl CacheKey {
    /// Create a cache key from render parameters
    #[must_use]
    pub fn from_params(page: usize, kind: RenderKind, params: &RenderParams) -> Self {
        Self {
            page,
            kind,
            target_width: params.target_width,
            target_height: params.target_height,
            quality_permille: (params.quality.clamp(0.0, 1.0) * 1000.0).round() as u16,
        }
    }
}

/// LRU cache for encoded page images
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<EncodedImage>>,
}

impl PageCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached image, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<EncodedImage>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert an image into the cache, returning an Arc to the data
    pub fn insert(&mut self, key: CacheKey, image: EncodedImage) -> Arc<EncodedImage> {
        let arc = Arc::new(image);
        self.cache.put(key, arc.clone());
        arc
    }

    /// Number of cached images
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> EncodedImage {
        EncodedImage {
            width: 10,
            height: 10,
            mime: "image/jpeg",
            bytes: vec![0; 16],
        }
    }

    fn params() -> RenderParams {
        RenderParams::new(450, 600, 0.88)
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = PageCache::new(4);
        let key = CacheKey::from_params(0, RenderKind::Page, &params());

        cache.insert(key.clone(), image());

        assert!(cache.contains(&key));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_lru_eviction() {
        let mut cache = PageCache::new(2);

        for i in 0..3 {
            cache.insert(CacheKey::from_params(i, RenderKind::Page, &params()), image());
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::from_params(0, RenderKind::Page, &params())));
        assert!(cache.contains(&CacheKey::from_params(2, RenderKind::Page, &params())));
    }

    #[test]
    fn thumbnail_and_page_keys_differ() {
        let page = CacheKey::from_params(3, RenderKind::Page, &params());
        let thumb = CacheKey::from_params(3, RenderKind::Thumbnail, &params());
        assert_ne!(page, thumb);
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let mut cache = PageCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(CacheKey::from_params(0, RenderKind::Page, &params()), image());
        assert_eq!(cache.len(), 1);
        cache.insert(CacheKey::from_params(1, RenderKind::Page, &params()), image());
        assert_eq!(cache.len(), 1);
    }
}
