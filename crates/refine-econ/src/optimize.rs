//! Exhaustive grid search over front-loaded booster usage counts.

use crate::simulate::{simulate, StrategyResult};
use refine_core::{BoosterKind, MarketPriceTable, OptimizerConfig, RefiningStage};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Winner of the grid search plus the reference strategies it is compared to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Cheapest strategy found; equals `baseline` when no booster helps.
    pub optimal: StrategyResult,
    /// No boosters at all.
    pub baseline: StrategyResult,
    /// Breath on every attempt, if the stage offers breath.
    pub full_breath: Option<StrategyResult>,
    /// Metallurgy on every attempt, if the stage offers metallurgy.
    pub full_metallurgy: Option<StrategyResult>,
    /// Both boosters on every attempt, if the stage offers both.
    pub full_both: Option<StrategyResult>,
}

impl OptimizationResult {
    /// The "always use this booster" reference strategy.
    pub fn full(&self, kind: BoosterKind) -> Option<&StrategyResult> {
        match kind {
            BoosterKind::Breath => self.full_breath.as_ref(),
            BoosterKind::Metallurgy => self.full_metallurgy.as_ref(),
        }
    }

    /// Expected gold saved by the optimal strategy over the baseline.
    pub fn savings(&self) -> f64 {
        self.baseline.expected_total_cost - self.optimal.expected_total_cost
    }
}

/// Search breath counts `0..=max_breath_uses` and metallurgy counts
/// `0..=max_metallurgy_uses` with the default attempt horizon.
pub fn optimize(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    max_breath_uses: u32,
    max_metallurgy_uses: u32,
) -> OptimizationResult {
    optimize_with(
        stage,
        prices,
        &OptimizerConfig {
            max_breath_uses,
            max_metallurgy_uses,
            ..OptimizerConfig::default()
        },
    )
}

/// Grid search with explicit limits.
///
/// The baseline is the initial incumbent and a candidate replaces it only on
/// a strictly lower expected cost, so ties resolve to fewer boosters. Among
/// equal-cost candidates the first in `(breath, metallurgy)` scan order wins,
/// which keeps the parallel reduction deterministic.
pub fn optimize_with(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    cfg: &OptimizerConfig,
) -> OptimizationResult {
    let horizon = cfg.max_attempts;
    let baseline = simulate(stage, prices, 0, 0, horizon);

    let has_breath = stage.has_booster(BoosterKind::Breath);
    let has_metallurgy = stage.has_booster(BoosterKind::Metallurgy);
    let b_max = if has_breath { cfg.max_breath_uses } else { 0 };
    let m_max = if has_metallurgy {
        cfg.max_metallurgy_uses
    } else {
        0
    };
    let candidates = grid_candidates(b_max, m_max);

    let optimal = match search_grid(stage, prices, &candidates, horizon) {
        Some(best) if best.expected_total_cost < baseline.expected_total_cost => best,
        _ => baseline.clone(),
    };

    let full_breath = has_breath.then(|| simulate(stage, prices, horizon, 0, horizon));
    let full_metallurgy = has_metallurgy.then(|| simulate(stage, prices, 0, horizon, horizon));
    let full_both =
        (has_breath && has_metallurgy).then(|| simulate(stage, prices, horizon, horizon, horizon));

    debug!(
        level = stage.level,
        candidates = candidates.len(),
        breath = optimal.breath_uses_requested,
        metallurgy = optimal.metallurgy_uses_requested,
        optimal_cost = optimal.expected_total_cost,
        baseline_cost = baseline.expected_total_cost,
        "optimized stage"
    );

    OptimizationResult {
        optimal,
        baseline,
        full_breath,
        full_metallurgy,
        full_both,
    }
}

/// Every `(breath, metallurgy)` pair in scan order, baseline excluded.
fn grid_candidates(b_max: u32, m_max: u32) -> Vec<(u32, u32)> {
    (0..=b_max)
        .flat_map(|b| (0..=m_max).map(move |m| (b, m)))
        .filter(|&pair| pair != (0, 0))
        .collect()
}

fn evaluate(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    (b, m): (u32, u32),
    horizon: u32,
) -> StrategyResult {
    let r = simulate(stage, prices, b, m, horizon);
    trace!(breath = b, metallurgy = m, cost = r.expected_total_cost, "candidate");
    r
}

/// Lower cost wins; equal costs keep the earlier candidate in scan order.
fn cheaper(a: StrategyResult, b: StrategyResult) -> StrategyResult {
    let key = |r: &StrategyResult| (r.breath_uses_requested, r.metallurgy_uses_requested);
    if b.expected_total_cost < a.expected_total_cost
        || (b.expected_total_cost == a.expected_total_cost && key(&b) < key(&a))
    {
        b
    } else {
        a
    }
}

fn search_grid(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    candidates: &[(u32, u32)],
    horizon: u32,
) -> Option<StrategyResult> {
    #[cfg(feature = "parallel")]
    {
        search_grid_parallel(stage, prices, candidates, horizon)
    }
    #[cfg(not(feature = "parallel"))]
    {
        search_grid_sequential(stage, prices, candidates, horizon)
    }
}

#[cfg(feature = "parallel")]
fn search_grid_parallel(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    candidates: &[(u32, u32)],
    horizon: u32,
) -> Option<StrategyResult> {
    use rayon::prelude::*;
    candidates
        .par_iter()
        .map(|&pair| evaluate(stage, prices, pair, horizon))
        .reduce_with(cheaper)
}

// Compiled in every build so tests cover it under unified features too.
#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
fn search_grid_sequential(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    candidates: &[(u32, u32)],
    horizon: u32,
) -> Option<StrategyResult> {
    candidates
        .iter()
        .map(|&pair| evaluate(stage, prices, pair, horizon))
        .reduce(cheaper)
}
