//! Render cache: decoded page images keyed by [`PageKey`].
//!
//! Bounded LRU. The capacity comes from `[preview] cache_capacity` and is
//! raised to twice the displayed page count when a document outgrows it,
//! so a full re-render never evicts its own pages.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::core::{Page, PageImage};
use crate::error::{PreviewError, Result};
use crate::fingerprint::PageKey;

/// Hit/miss counters since the last [`RenderCache::clear`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

pub struct RenderCache {
    entries: LruCache<PageKey, Arc<PageImage>>,
    stats: CacheStats,
}

impl RenderCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(non_zero(capacity)),
            stats: CacheStats::default(),
        }
    }

    pub fn get(&mut self, key: &PageKey) -> Option<Arc<PageImage>> {
        self.entries.get(key).cloned()
    }

    pub fn set(&mut self, key: PageKey, image: Arc<PageImage>) {
        self.entries.put(key, image);
    }

    /// Drop every entry. Called when the main document changes.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Grow the bound to at least twice `displayed` pages. Never shrinks.
    pub fn ensure_capacity(&mut self, displayed: usize) {
        let wanted = displayed.saturating_mul(2);
        if wanted > self.capacity() {
            crate::debug!("cache"; "capacity {} -> {}", self.capacity(), wanted);
            self.entries.resize(non_zero(wanted));
        }
    }

    /// Look the page up, decoding and inserting it on a miss.
    ///
    /// Returns the key with the image so callers can track slot identity.
    pub fn get_or_decode(&mut self, page: &Page) -> Result<(PageKey, Arc<PageImage>)> {
        let key = PageKey::new(&page.data, page.index);
        if let Some(image) = self.get(&key) {
            self.stats.hits += 1;
            return Ok((key, image));
        }

        let image = PageImage::decode(&page.data).map_err(|e| PreviewError::Decode {
            index: page.index,
            message: e.to_string(),
        })?;
        let image = Arc::new(image);
        self.stats.misses += 1;
        self.set(key, Arc::clone(&image));
        Ok((key, image))
    }
}

fn non_zero(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}
