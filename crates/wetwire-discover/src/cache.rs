//! Content-addressed module cache using moka
//!
//! Fix cycles re-discover files whose text often did not change; keying parsed
//! modules by a hash of path and text lets those passes skip the parser.

use crate::syntax::ParsedModule;
use moka::sync::Cache;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Blake3 hash of a module path and its source text
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceHash([u8; 32]);

impl SourceHash {
    /// Hash path and source together
    #[must_use]
    pub fn compute(path: &Path, source: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(source.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Raw bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex
    #[must_use]
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Debug for SourceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceHash({})", &self.to_hex()[..12])
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Concurrent cache of parsed modules
#[derive(Clone)]
pub struct DiscoveryCache {
    inner: Cache<SourceHash, Arc<ParsedModule>>,
}

impl DiscoveryCache {
    /// Create cache with max capacity (in modules)
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Get parsed module
    #[inline]
    #[must_use]
    pub fn get(&self, hash: &SourceHash) -> Option<Arc<ParsedModule>> {
        self.inner.get(hash)
    }

    /// Insert parsed module under its own hash
    #[inline]
    pub fn insert(&self, module: Arc<ParsedModule>) {
        self.inner.insert(module.hash, module);
    }

    /// Get, or parse and insert
    ///
    /// # Errors
    /// Propagates the error from `parse`; failures are not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        hash: SourceHash,
        parse: impl FnOnce() -> Result<ParsedModule, E>,
    ) -> Result<Arc<ParsedModule>, E> {
        if let Some(cached) = self.get(&hash) {
            return Ok(cached);
        }
        let module = Arc::new(parse()?);
        self.inner.insert(hash, Arc::clone(&module));
        Ok(module)
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl fmt::Debug for DiscoveryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    #[test]
    fn hash_depends_on_path_and_text() {
        let a = SourceHash::compute(Path::new("a.py"), "x = 1");
        assert_eq!(a, SourceHash::compute(Path::new("a.py"), "x = 1"));
        assert_ne!(a, SourceHash::compute(Path::new("b.py"), "x = 1"));
        assert_ne!(a, SourceHash::compute(Path::new("a.py"), "x = 2"));
        assert_eq!(a.to_hex().len(), 64);
    }

    #[test]
    fn parses_once_per_hash() {
        let cache = DiscoveryCache::new(16);
        let path = Path::new("ci.py");
        let source = "build = Job()\n";
        let hash = SourceHash::compute(path, source);
        let mut calls = 0;
        for _ in 0..3 {
            let module = cache
                .get_or_try_insert_with(hash, || {
                    calls += 1;
                    parse_module(path, source, "wetwire_github")
                })
                .unwrap();
            assert_eq!(module.bindings.len(), 1);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = DiscoveryCache::new(16);
        let path = Path::new("bad.py");
        let hash = SourceHash::compute(path, "job = (");
        assert!(cache
            .get_or_try_insert_with(hash, || parse_module(path, "job = (", "wetwire_github"))
            .is_err());
        assert!(cache.get(&hash).is_none());
    }
}
