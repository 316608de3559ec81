#![deny(warnings)]

//! Material value attribution: what a booster is worth to a refining run.
//!
//! The implied unit value of a booster is the per-unit price at which its
//! spend exactly offsets the expected-cost reduction it buys. Comparing it to
//! the quoted market price tells whether buying the booster pays off.

use refine_core::{BoosterKind, MarketPriceTable, RefiningStage};
use refine_econ::{OptimizationResult, StrategyResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which strategy an implied value was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueBasis {
    /// The optimizer's winning strategy.
    Optimal,
    /// The "always use this booster" reference strategy.
    Full,
}

/// Implied value of one booster versus its market price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialValueInsight {
    pub material_name: String,
    pub kind: BoosterKind,
    /// Whether the stage offers this booster at all.
    pub available: bool,
    /// Attempts that applied the booster in the reference strategy.
    pub used_count: u32,
    pub quantity_per_use: f64,
    pub market_unit_price: f64,
    /// Break-even unit price; `None` when no strategy used the booster.
    pub implied_unit_value: Option<f64>,
    /// `implied_unit_value - market_unit_price`.
    pub delta_vs_market: Option<f64>,
    pub basis: Option<ValueBasis>,
}

impl MaterialValueInsight {
    /// `Some(true)` when the booster is worth more than it costs.
    pub fn is_worth_buying(&self) -> Option<bool> {
        self.delta_vs_market.map(|d| d > 0.0)
    }
}

/// Derive the implied unit value of a booster.
///
/// The optimal strategy is the reference when it used the booster, else the
/// full-usage strategy when it did. The gain credits back all booster spend of
/// the reference, so it isolates the rate-increase benefit:
/// `gain = baseline - (reference - booster spend)`, and the implied value is
/// `gain / (used_count * quantity_per_use)`.
pub fn analyze_material_value(
    kind: BoosterKind,
    optimal: &StrategyResult,
    full: Option<&StrategyResult>,
    baseline: &StrategyResult,
    market_unit_price: f64,
    quantity_per_use: f64,
    material_name: &str,
) -> MaterialValueInsight {
    let reference = if optimal.attempts_used(kind) > 0 {
        Some((optimal, ValueBasis::Optimal))
    } else {
        full.filter(|f| f.attempts_used(kind) > 0)
            .map(|f| (f, ValueBasis::Full))
    };

    let mut insight = MaterialValueInsight {
        material_name: material_name.to_string(),
        kind,
        available: full.is_some(),
        used_count: 0,
        quantity_per_use,
        market_unit_price,
        implied_unit_value: None,
        delta_vs_market: None,
        basis: None,
    };
    let Some((r, basis)) = reference else {
        return insight;
    };

    insight.used_count = r.attempts_used(kind);
    insight.basis = Some(basis);
    let aux_cost = r.breath_total_cost + r.metallurgy_total_cost;
    let gain = baseline.expected_total_cost - (r.expected_total_cost - aux_cost);
    let units = f64::from(insight.used_count) * quantity_per_use;
    insight.implied_unit_value = (units > 0.0)
        .then(|| gain / units)
        .filter(|v| v.is_finite());
    insight.delta_vs_market = insight
        .implied_unit_value
        .filter(|_| market_unit_price.is_finite())
        .map(|v| v - market_unit_price);
    debug!(
        material = material_name,
        used = insight.used_count,
        implied = ?insight.implied_unit_value,
        market = market_unit_price,
        "material value"
    );
    insight
}

/// Insights for both boosters of a stage, breath first.
pub fn analyze_stage(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    result: &OptimizationResult,
) -> Vec<MaterialValueInsight> {
    [BoosterKind::Breath, BoosterKind::Metallurgy]
        .into_iter()
        .map(|kind| match stage.booster(kind) {
            Some(m) => analyze_material_value(
                kind,
                &result.optimal,
                result.full(kind),
                &result.baseline,
                prices.unit_price(&m.name),
                m.quantity,
                &m.name,
            ),
            None => MaterialValueInsight {
                material_name: kind.label().to_string(),
                kind,
                available: false,
                used_count: 0,
                quantity_per_use: 0.0,
                market_unit_price: 0.0,
                implied_unit_value: None,
                delta_vs_market: None,
                basis: None,
            },
        })
        .collect()
}
