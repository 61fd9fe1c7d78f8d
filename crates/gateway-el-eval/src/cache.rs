//! Compiled expression cache
//!
//! Keyed by template text. Entries are evicted least recently used first once
//! the cache is full, and dropped when they have not been read for the
//! configured idle time. An entry keeps one compiled form per deferred
//! holder set it has been requested with.

use gateway_el_compiler::{CompiledExpression, Compiler};
use gateway_el_diagnostics::Result;
use indexmap::IndexMap;
use log::{debug, trace};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cache sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached templates (at least one is always kept)
    pub max_size: usize,
    /// Idle time after which an unread entry is dropped; 0 disables expiry
    pub idle_time_ms: u64,
}

impl CacheConfig {
    pub const DEFAULT_MAX_SIZE: usize = 20_000;
    pub const DEFAULT_IDLE_TIME_MS: u64 = 60 * 60 * 1000;

    pub fn idle_time(&self) -> Option<Duration> {
        (self.idle_time_ms > 0).then(|| Duration::from_millis(self.idle_time_ms))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: Self::DEFAULT_MAX_SIZE,
            idle_time_ms: Self::DEFAULT_IDLE_TIME_MS,
        }
    }
}

/// Cache counters since creation or the last [`clear`](ExpressionCache::clear)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped for capacity or idleness
    pub evictions: u64,
}

impl CacheStats {
    /// Hit ratio as a percentage
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct Entry {
    /// Compiled forms by holder set, first compiled first
    forms: IndexMap<BTreeSet<String>, Arc<CompiledExpression>>,
    last_access: Instant,
}

enum Lookup {
    Hit(Arc<CompiledExpression>),
    /// Cached under another holder set only
    Rewrite(Arc<CompiledExpression>),
    Miss,
}

/// Thread-safe cache of compiled templates, shared across engines
pub struct ExpressionCache {
    entries: Mutex<LruCache<String, Entry>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ExpressionCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Compiled form of `text` for the given deferred holder names.
    ///
    /// A cached entry known only under other holder sets gets the deferred
    /// rewrite for this one computed from the parsed template and added.
    /// The same text and holder set always yield the same artifact while
    /// the entry lives.
    pub fn get_or_compile(
        &self,
        text: &str,
        compiler: &Compiler,
        holders: &BTreeSet<String>,
    ) -> Result<Arc<CompiledExpression>> {
        // Compile and rewrite outside the lock; when two threads race on the
        // same text and holder set, the first insert wins
        let compiled = match self.lookup(text, holders) {
            Lookup::Hit(compiled) => return Ok(compiled),
            Lookup::Rewrite(base) => {
                trace!("expression cache rewriting '{}' for holders {:?}", text, holders);
                base.with_holders(holders)
            }
            Lookup::Miss => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("expression cache miss, compiling '{}'", text);
                compiler.compile_with_holders(text, holders)?
            }
        };
        Ok(self.insert(text, Arc::new(compiled)))
    }

    fn lookup(&self, text: &str, holders: &BTreeSet<String>) -> Lookup {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(text) else {
            return Lookup::Miss;
        };

        if self
            .config
            .idle_time()
            .is_some_and(|idle| now.duration_since(entry.last_access) > idle)
        {
            entries.pop(text);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("expression cache entry expired: '{}'", text);
            return Lookup::Miss;
        }

        entry.last_access = now;
        self.hits.fetch_add(1, Ordering::Relaxed);
        trace!("expression cache hit: '{}'", text);

        match entry.forms.get(holders) {
            Some(compiled) => Lookup::Hit(Arc::clone(compiled)),
            None => entry
                .forms
                .first()
                .map_or(Lookup::Miss, |(_, base)| Lookup::Rewrite(Arc::clone(base))),
        }
    }

    /// Add `compiled` under its holder set, keeping a form already there
    fn insert(&self, text: &str, compiled: Arc<CompiledExpression>) -> Arc<CompiledExpression> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(text) {
            entry.last_access = now;
            return Arc::clone(
                entry
                    .forms
                    .entry(compiled.holders().clone())
                    .or_insert(compiled),
            );
        }

        let mut forms = IndexMap::new();
        forms.insert(compiled.holders().clone(), Arc::clone(&compiled));
        let entry = Entry {
            forms,
            last_access: now,
        };
        if let Some((evicted, _)) = entries.push(text.to_string(), entry) {
            if evicted != text {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("expression cache full, evicted '{}'", evicted);
            }
        }
        compiled
    }

    /// First cached compiled form of `text`, without compiling or touching recency
    pub fn peek(&self, text: &str) -> Option<Arc<CompiledExpression>> {
        self.entries
            .lock()
            .peek(text)
            .and_then(|entry| entry.forms.first())
            .map(|(_, compiled)| Arc::clone(compiled))
    }

    /// Cached compiled form of `text` for exactly these holders
    pub fn peek_with(
        &self,
        text: &str,
        holders: &BTreeSet<String>,
    ) -> Option<Arc<CompiledExpression>> {
        self.entries
            .lock()
            .peek(text)
            .and_then(|entry| entry.forms.get(holders))
            .map(Arc::clone)
    }

    /// Drop every entry idle for longer than the configured idle time
    pub fn purge_expired(&self) -> usize {
        let Some(idle) = self.config.idle_time() else {
            return 0;
        };
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.last_access) > idle)
            .map(|(text, _)| text.clone())
            .collect();
        for text in &expired {
            entries.pop(text);
        }
        self.evictions
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    pub fn invalidate(&self, text: &str) -> bool {
        self.entries.lock().pop(text).is_some()
    }

    /// Remove all entries and reset the counters
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("config", &self.config)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn holders(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_hits_and_misses() {
        let cache = ExpressionCache::default();
        let compiler = Compiler::new();

        let first = cache.get_or_compile("{#a}", &compiler, &holders(&[])).unwrap();
        let second = cache.get_or_compile("{#a}", &compiler, &holders(&[])).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0
            }
        );
        assert_eq!(cache.stats().hit_ratio(), 50.0);
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let cache = ExpressionCache::default();
        assert!(cache.get_or_compile("{#a", &Compiler::new(), &holders(&[])).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = ExpressionCache::new(CacheConfig {
            max_size: 2,
            ..CacheConfig::default()
        });
        let compiler = Compiler::new();
        let none = holders(&[]);

        cache.get_or_compile("{#a}", &compiler, &none).unwrap();
        cache.get_or_compile("{#b}", &compiler, &none).unwrap();
        cache.get_or_compile("{#a}", &compiler, &none).unwrap();
        cache.get_or_compile("{#c}", &compiler, &none).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.peek("{#b}").is_none());
        assert!(cache.peek("{#a}").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_idle_entries_expire() {
        let cache = ExpressionCache::new(CacheConfig {
            max_size: 10,
            idle_time_ms: 5,
        });
        let compiler = Compiler::new();
        let none = holders(&[]);

        cache.get_or_compile("{#a}", &compiler, &none).unwrap();
        thread::sleep(Duration::from_millis(30));
        cache.get_or_compile("{#a}", &compiler, &none).unwrap();
        assert_eq!(cache.stats().misses, 2);
        assert_eq!(cache.stats().evictions, 1);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hit_with_other_holders_adds_rewrite() {
        let cache = ExpressionCache::default();
        let compiler = Compiler::new();
        let text = "{#custom.get('a')} {#custom.get('b')}";

        let plain = cache.get_or_compile(text, &compiler, &holders(&[])).unwrap();
        assert!(plain.rewrite().is_none());

        let deferred = cache
            .get_or_compile(text, &compiler, &holders(&["custom"]))
            .unwrap();
        assert_eq!(deferred.deferred_expressions().count(), 2);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.peek(text).unwrap(), &plain));
        assert!(Arc::ptr_eq(
            &cache.peek_with(text, &holders(&["custom"])).unwrap(),
            &deferred
        ));
    }

    #[test]
    fn test_alternating_holder_sets_reuse_artifacts() {
        let cache = ExpressionCache::default();
        let compiler = Compiler::new();
        let text = "{#custom.get('a')} x";
        let custom = holders(&["custom"]);

        let first = cache.get_or_compile(text, &compiler, &holders(&[])).unwrap();
        let rewritten = cache.get_or_compile(text, &compiler, &custom).unwrap();
        let third = cache.get_or_compile(text, &compiler, &holders(&[])).unwrap();
        let fourth = cache.get_or_compile(text, &compiler, &custom).unwrap();

        assert!(Arc::ptr_eq(&first, &third));
        assert!(Arc::ptr_eq(&rewritten, &fourth));
        assert!(!Arc::ptr_eq(&first, &rewritten));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 3,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn test_config_from_json() {
        let config: CacheConfig = serde_json::from_str(r#"{"max_size": 10}"#).unwrap();
        assert_eq!(config.max_size, 10);
        assert_eq!(config.idle_time(), Some(Duration::from_secs(3600)));

        let disabled: CacheConfig = serde_json::from_str(r#"{"idle_time_ms": 0}"#).unwrap();
        assert_eq!(disabled.idle_time(), None);
    }

    #[test]
    fn test_clear_resets_stats() {
        let cache = ExpressionCache::default();
        cache.get_or_compile("{#a}", &Compiler::new(), &holders(&[])).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
