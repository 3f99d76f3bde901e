//! Memoized get-or-compute cache for analysis results.
//!
//! Downstream consumers frequently request the same analysis for the same
//! function several times within one compilation pass. The cache deduplicates
//! that work behind an explicit key: the owning symbol plus the graph version
//! supplied at graph construction. Keying is explicit rather than weak-table
//! based; eviction is tied to whatever session owns the cache, via
//! [`evict_symbol`](AnalysisResultCache::evict_symbol) and
//! [`clear`](AnalysisResultCache::clear).
//!
//! The cache is concurrency-safe: independent analyses over different
//! functions may populate it from separate threads.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{dataflow::result::DataFlowAnalysisResult, ir::SymbolId, Result};

/// Cache key identifying one analysis request.
///
/// Two requests alias the same cached result exactly when they target the
/// same symbol and the same graph version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalysisCacheKey {
    /// The symbol whose graph was analyzed.
    symbol: SymbolId,
    /// The graph version at analysis time.
    cfg_version: u64,
}

impl AnalysisCacheKey {
    /// Creates a cache key.
    #[must_use]
    pub const fn new(symbol: SymbolId, cfg_version: u64) -> Self {
        Self {
            symbol,
            cfg_version,
        }
    }

    /// Returns the symbol component of this key.
    #[must_use]
    pub const fn symbol(&self) -> SymbolId {
        self.symbol
    }

    /// Returns the graph version component of this key.
    #[must_use]
    pub const fn cfg_version(&self) -> u64 {
        self.cfg_version
    }
}

/// Concurrent memoization cache for converged analysis results.
///
/// Results are stored behind [`Arc`], so repeated requests share one
/// allocation. Failed or cancelled computations are never cached.
///
/// # Examples
///
/// ```rust,ignore
/// let cache = AnalysisResultCache::new();
/// let result = ValueContentAnalysis::analyze_cached(&cache, &mut context)?;
/// ```
#[derive(Debug, Default)]
pub struct AnalysisResultCache<V> {
    /// The memoized results.
    entries: DashMap<AnalysisCacheKey, Arc<DataFlowAnalysisResult<V>>>,
}

impl<V> AnalysisResultCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the cached result for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &AnalysisCacheKey) -> Option<Arc<DataFlowAnalysisResult<V>>> {
        self.entries.get(key).map(|entry| Arc::clone(&entry))
    }

    /// Returns the cached result for `key`, computing and caching it on miss.
    ///
    /// # Errors
    ///
    /// Propagates the computation's error without caching anything, so a
    /// cancelled run can be retried later.
    pub fn get_or_compute(
        &self,
        key: AnalysisCacheKey,
        compute: impl FnOnce() -> Result<DataFlowAnalysisResult<V>>,
    ) -> Result<Arc<DataFlowAnalysisResult<V>>> {
        if let Some(hit) = self.get(&key) {
            log::trace!(target: "analysis-cache", "hit for {key:?}");
            return Ok(hit);
        }
        let computed = Arc::new(compute()?);
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::clone(&computed));
        Ok(Arc::clone(&entry))
    }

    /// Evicts every cached result belonging to `symbol`.
    pub fn evict_symbol(&self, symbol: SymbolId) {
        self.entries.retain(|key, _| key.symbol() != symbol);
    }

    /// Evicts everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns the number of cached results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
