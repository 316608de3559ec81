//! Multi-level upgrade plans: optimize every stage of a refining range.

use crate::cache::OptimizationCache;
use refine_advisor::{analyze_stage, MaterialValueInsight};
use refine_core::{MarketPriceTable, OptimizerConfig, RefiningStage};
use refine_econ::{optimize_with, OptimizationResult};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Optimized outcome for one target level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub level: u32,
    pub result: OptimizationResult,
    pub insights: Vec<MaterialValueInsight>,
}

/// Optimized outcome for a sequence of levels, ordered by level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradePlan {
    pub steps: Vec<PlanStep>,
    /// Sum of the optimal expected costs.
    pub total_expected_cost: f64,
    /// Sum of the no-booster expected costs.
    pub total_baseline_cost: f64,
}

impl UpgradePlan {
    fn from_steps(mut steps: Vec<PlanStep>) -> Self {
        steps.sort_by_key(|s| s.level);
        let total_expected_cost = steps
            .iter()
            .map(|s| s.result.optimal.expected_total_cost)
            .sum();
        let total_baseline_cost = steps
            .iter()
            .map(|s| s.result.baseline.expected_total_cost)
            .sum();
        let plan = Self {
            steps,
            total_expected_cost,
            total_baseline_cost,
        };
        info!(
            levels = plan.steps.len(),
            total = plan.total_expected_cost,
            savings = plan.savings(),
            "upgrade plan ready"
        );
        plan
    }

    /// Expected gold saved across the plan by using optimal strategies.
    pub fn savings(&self) -> f64 {
        self.total_baseline_cost - self.total_expected_cost
    }

    pub fn step(&self, level: u32) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.level == level)
    }
}

fn plan_step(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    result: OptimizationResult,
) -> PlanStep {
    let insights = analyze_stage(stage, prices, &result);
    PlanStep {
        level: stage.level,
        result,
        insights,
    }
}

/// Optimize and analyze every stage.
pub fn plan_levels(
    stages: &[RefiningStage],
    prices: &MarketPriceTable,
    cfg: &OptimizerConfig,
) -> UpgradePlan {
    #[cfg(feature = "parallel")]
    let steps: Vec<PlanStep> = {
        use rayon::prelude::*;
        stages
            .par_iter()
            .map(|s| plan_step(s, prices, optimize_with(s, prices, cfg)))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let steps: Vec<PlanStep> = stages
        .iter()
        .map(|s| plan_step(s, prices, optimize_with(s, prices, cfg)))
        .collect();
    UpgradePlan::from_steps(steps)
}

/// Like [`plan_levels`], reusing optimizer results from `cache`.
///
/// Stages are keyed as `"{set_id}/{level}"`.
pub fn plan_levels_cached(
    cache: &mut OptimizationCache,
    set_id: &str,
    stages: &[RefiningStage],
    prices: &MarketPriceTable,
    cfg: &OptimizerConfig,
) -> UpgradePlan {
    let steps = stages
        .iter()
        .map(|s| {
            let id = format!("{set_id}/{}", s.level);
            let result = cache.get_or_optimize(&id, s, prices, cfg);
            plan_step(s, prices, (*result).clone())
        })
        .collect();
    UpgradePlan::from_steps(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use refine_core::MaterialQuantity;

    fn stages() -> Vec<RefiningStage> {
        let stage = |level: u32, rate: f64| RefiningStage {
            level,
            base_success_rate: rate,
            base_materials: vec![MaterialQuantity::new("ore", f64::from(level))],
            exp_material: Some(MaterialQuantity::new("shard", 10.0)),
            breath_material: Some(MaterialQuantity::new("breath", 1.0)),
            metallurgy_material: (level > 11).then(|| MaterialQuantity::new("book", 1.0)),
            gold_cost: 100.0,
            silver_cost: 1000.0,
        };
        vec![stage(13, 5.0), stage(11, 15.0), stage(12, 10.0)]
    }

    fn prices() -> MarketPriceTable {
        MarketPriceTable::new(3)
            .with_price("ore", 50.0)
            .with_price("shard", 1.0)
            .with_price("breath", 25.0)
            .with_price("book", 400.0)
    }

    fn cfg() -> OptimizerConfig {
        OptimizerConfig {
            max_breath_uses: 8,
            max_metallurgy_uses: 8,
            ..OptimizerConfig::default()
        }
    }

    #[test]
    fn plan_is_sorted_and_summed() {
        let plan = plan_levels(&stages(), &prices(), &cfg());
        let levels: Vec<u32> = plan.steps.iter().map(|s| s.level).collect();
        assert_eq!(levels, [11, 12, 13]);
        let sum: f64 = plan
            .steps
            .iter()
            .map(|s| s.result.optimal.expected_total_cost)
            .sum();
        assert!((plan.total_expected_cost - sum).abs() < 1e-9);
        assert!(plan.savings() >= 0.0);
        assert_eq!(plan.step(12).unwrap().insights.len(), 2);
        assert!(!plan.step(11).unwrap().insights[1].available);
        assert!(plan.step(13).unwrap().insights[1].available);
    }

    #[test]
    fn cached_plan_matches_uncached() {
        let mut cache = OptimizationCache::new();
        let direct = plan_levels(&stages(), &prices(), &cfg());
        let cached = plan_levels_cached(&mut cache, "weapon", &stages(), &prices(), &cfg());
        assert_eq!(direct, cached);
        let again = plan_levels_cached(&mut cache, "weapon", &stages(), &prices(), &cfg());
        assert_eq!(cached, again);
        assert_eq!((cache.hits(), cache.misses()), (3, 3));
    }

    #[test]
    fn empty_plan_is_zero() {
        let plan = plan_levels(&[], &prices(), &cfg());
        assert!(plan.steps.is_empty());
        assert_eq!(plan.total_expected_cost, 0.0);
        assert_eq!(plan.savings(), 0.0);
    }

    #[test]
    fn plan_serializes() {
        let plan = plan_levels(&stages()[..1], &prices(), &cfg());
        let json = serde_json::to_string(&plan).unwrap();
        let back: UpgradePlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.steps.len(), 1);
        assert_eq!(back.steps[0].level, 13);
    }
}
