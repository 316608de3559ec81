//! Expected consumption per material line for a simulated strategy.

use crate::simulate::StrategyResult;
use refine_core::{MarketPriceTable, MaterialQuantity, RefiningStage, GOLD, SILVER};
use serde::{Deserialize, Serialize};

/// Expected usage of one material line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub name: String,
    pub quantity_per_use: f64,
    /// Probability-weighted number of uses.
    pub expected_uses: f64,
    pub expected_quantity: f64,
    /// Expected gold spend; zero for silver.
    pub expected_cost: f64,
}

/// Break a strategy's expected cost down by material.
///
/// Lines are ordered: one-time material, base materials, gold, silver,
/// breath, metallurgy. The costs sum to `result.expected_total_cost`.
pub fn material_breakdown(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    result: &StrategyResult,
) -> Vec<MaterialLine> {
    let mut reach = 1.0_f64;
    let mut attempt_uses = 0.0_f64;
    let mut breath_uses = 0.0_f64;
    let mut metallurgy_uses = 0.0_f64;
    for t in &result.trace {
        attempt_uses += reach;
        if t.boosters.breath {
            breath_uses += reach;
        }
        if t.boosters.metallurgy {
            metallurgy_uses += reach;
        }
        reach = 1.0 - t.cumulative_success_probability;
    }

    let line = |m: &MaterialQuantity, uses: f64, unit_price: f64| MaterialLine {
        name: m.name.clone(),
        quantity_per_use: m.quantity,
        expected_uses: uses,
        expected_quantity: m.quantity * uses,
        expected_cost: m.quantity * uses * unit_price,
    };

    let mut lines = Vec::new();
    if let Some(exp) = &stage.exp_material {
        lines.push(line(exp, 1.0, prices.unit_price(&exp.name)));
    }
    for m in &stage.base_materials {
        lines.push(line(m, attempt_uses, prices.unit_price(&m.name)));
    }
    if stage.gold_cost > 0.0 {
        let gold = MaterialQuantity::new(GOLD, stage.gold_cost);
        lines.push(line(&gold, attempt_uses, prices.gold_unit_price()));
    }
    if stage.silver_cost > 0.0 {
        let silver = MaterialQuantity::new(SILVER, stage.silver_cost);
        lines.push(line(&silver, attempt_uses, 0.0));
    }
    if let Some(b) = &stage.breath_material {
        lines.push(line(b, breath_uses, prices.unit_price(&b.name)));
    }
    if let Some(m) = &stage.metallurgy_material {
        lines.push(line(m, metallurgy_uses, prices.unit_price(&m.name)));
    }
    lines
}
