//! Explicit memoization of optimizer runs.

use refine_core::{MarketPriceTable, OptimizerConfig, RefiningStage};
use refine_econ::{optimize_with, OptimizationResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Identity of an optimizer run: which stage, which price snapshot, which limits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub stage_id: String,
    pub price_version: u64,
    pub config: OptimizerConfig,
}

/// Map from [`CacheKey`] to a shared optimizer result.
///
/// The caller owns stage identity: the same `stage_id` must always describe
/// the same stage parameters, and price tables must bump their version when
/// any price changes.
#[derive(Debug, Default)]
pub struct OptimizationCache {
    entries: HashMap<CacheKey, Arc<OptimizationResult>>,
    hits: u64,
    misses: u64,
}

impl OptimizationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result or run the optimizer and store it.
    pub fn get_or_optimize(
        &mut self,
        stage_id: &str,
        stage: &RefiningStage,
        prices: &MarketPriceTable,
        cfg: &OptimizerConfig,
    ) -> Arc<OptimizationResult> {
        let key = CacheKey {
            stage_id: stage_id.to_string(),
            price_version: prices.version,
            config: *cfg,
        };
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            trace!(stage_id, version = prices.version, "cache hit");
            return Arc::clone(hit);
        }
        self.misses += 1;
        let result = Arc::new(optimize_with(stage, prices, cfg));
        self.entries.insert(key, Arc::clone(&result));
        result
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<OptimizationResult>> {
        self.entries.get(key).cloned()
    }

    /// Drop entries computed against price versions older than `version`.
    /// Returns the number of entries removed.
    pub fn invalidate_before(&mut self, version: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.price_version >= version);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, version, "invalidated stale optimizer results");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
