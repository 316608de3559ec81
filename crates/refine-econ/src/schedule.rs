//! Deterministic per-attempt schedule of a refining run.
//!
//! Rates, artisan energy and per-attempt cost depend only on the attempt
//! number and the booster usage counts, never on roll outcomes, so the same
//! schedule drives both the expected-cost fold and the Monte Carlo sampler.

use refine_core::{MarketPriceTable, RefiningStage, SILVER};
use serde::{Deserialize, Serialize};

/// Fractional increase of the base rate per failed attempt.
pub const RATE_STEP: f64 = 0.1;
/// Artisan energy gained per percentage point of success rate.
pub const ENERGY_PER_RATE: f64 = 0.4651162791;
/// Energy level that guarantees the next attempt succeeds.
pub const ENERGY_CAP: f64 = 100.0;
/// Base rate at which boosters grant a flat bonus instead of a proportional one.
pub const FLAT_BONUS_RATE: f64 = 0.5;
/// Bonus granted per booster when the base rate equals [`FLAT_BONUS_RATE`].
pub const FLAT_BONUS: f64 = 1.0;

/// Which boosters were applied on an attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostersUsed {
    pub breath: bool,
    pub metallurgy: bool,
}

impl BoostersUsed {
    pub fn count(self) -> u32 {
        u32::from(self.breath) + u32::from(self.metallurgy)
    }
}

/// Base rate at `attempt` (1-indexed): +10% of the starting rate per prior
/// attempt, saturating at double the starting rate and at 100.
pub fn escalated_base_rate(base_success_rate: f64, attempt: u32) -> f64 {
    let cap = (base_success_rate * 2.0).min(100.0);
    let steps = f64::from(attempt.saturating_sub(1));
    (base_success_rate * (1.0 + steps * RATE_STEP)).min(cap)
}

/// Rate bonus granted by each active booster.
///
/// Stages with a 0.5% base rate get a flat +1 per booster; every other stage
/// gets its own base rate added. This is a content balancing constant tied to
/// that exact rate, not a general formula.
pub fn booster_bonus(base_success_rate: f64) -> f64 {
    if base_success_rate == FLAT_BONUS_RATE {
        FLAT_BONUS
    } else {
        base_success_rate
    }
}

/// Stage costs resolved against a price table once per run.
#[derive(Clone, Debug, PartialEq)]
pub struct StageCosts {
    /// Experience material, paid once upfront.
    pub one_time: f64,
    /// Base materials plus gold, paid on every attempt.
    pub per_attempt: f64,
    /// Gold per breath use, if the stage offers breath.
    pub breath: Option<f64>,
    /// Gold per metallurgy use, if the stage offers metallurgy.
    pub metallurgy: Option<f64>,
}

impl StageCosts {
    pub fn resolve(stage: &RefiningStage, prices: &MarketPriceTable) -> Self {
        let materials: f64 = stage
            .base_materials
            .iter()
            .filter(|m| m.name != SILVER)
            .map(|m| prices.line_cost(m))
            .sum();
        Self {
            one_time: stage
                .exp_material
                .as_ref()
                .map_or(0.0, |m| prices.line_cost(m)),
            per_attempt: materials + stage.gold_cost * prices.gold_unit_price(),
            breath: stage.breath_material.as_ref().map(|m| prices.line_cost(m)),
            metallurgy: stage
                .metallurgy_material
                .as_ref()
                .map(|m| prices.line_cost(m)),
        }
    }
}

/// One scheduled attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct Attempt {
    /// 1-indexed attempt number.
    pub number: u32,
    /// Escalated base rate in percent.
    pub base_rate: f64,
    /// Rate after boosters and the energy override, in percent.
    pub actual_rate: f64,
    /// Artisan energy after this attempt.
    pub energy: f64,
    /// Gold spent if this attempt is made, boosters included.
    pub cost: f64,
    pub boosters: BoostersUsed,
}

/// Iterator over attempts `1..=max_attempts` of a front-loaded strategy:
/// breath is applied on attempts `1..=breath_uses`, metallurgy on
/// `1..=metallurgy_uses`.
#[derive(Clone, Debug)]
pub struct AttemptSchedule<'a> {
    stage: &'a RefiningStage,
    costs: StageCosts,
    breath_uses: u32,
    metallurgy_uses: u32,
    max_attempts: u32,
    next: u32,
    energy: f64,
}

impl<'a> AttemptSchedule<'a> {
    pub fn new(
        stage: &'a RefiningStage,
        prices: &MarketPriceTable,
        breath_uses: u32,
        metallurgy_uses: u32,
        max_attempts: u32,
    ) -> Self {
        Self {
            stage,
            costs: StageCosts::resolve(stage, prices),
            breath_uses,
            metallurgy_uses,
            max_attempts,
            next: 1,
            energy: 0.0,
        }
    }

    pub fn costs(&self) -> &StageCosts {
        &self.costs
    }
}

impl Iterator for AttemptSchedule<'_> {
    type Item = Attempt;

    fn next(&mut self) -> Option<Attempt> {
        if self.next > self.max_attempts {
            return None;
        }
        let n = self.next;
        self.next += 1;

        let base = self.stage.base_success_rate;
        let boosters = BoostersUsed {
            breath: self.costs.breath.is_some() && n <= self.breath_uses,
            metallurgy: self.costs.metallurgy.is_some() && n <= self.metallurgy_uses,
        };
        let base_rate = escalated_base_rate(base, n);
        let mut actual_rate =
            (base_rate + booster_bonus(base) * f64::from(boosters.count())).min(100.0);
        if self.energy >= ENERGY_CAP {
            actual_rate = 100.0;
        }

        let mut cost = self.costs.per_attempt;
        if boosters.breath {
            cost += self.costs.breath.unwrap_or(0.0);
        }
        if boosters.metallurgy {
            cost += self.costs.metallurgy.unwrap_or(0.0);
        }

        self.energy = (self.energy + actual_rate * ENERGY_PER_RATE).min(ENERGY_CAP);
        Some(Attempt {
            number: n,
            base_rate,
            actual_rate,
            energy: self.energy,
            cost,
            boosters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refine_core::MaterialQuantity;

    fn stage(rate: f64) -> RefiningStage {
        RefiningStage {
            level: 1,
            base_success_rate: rate,
            base_materials: vec![
                MaterialQuantity::new("ore", 5.0),
                MaterialQuantity::new(SILVER, 1000.0),
            ],
            exp_material: Some(MaterialQuantity::new("shard", 10.0)),
            breath_material: Some(MaterialQuantity::new("breath", 2.0)),
            metallurgy_material: None,
            gold_cost: 50.0,
            silver_cost: 500.0,
        }
    }

    fn prices() -> MarketPriceTable {
        MarketPriceTable::new(1)
            .with_price("ore", 100.0)
            .with_price("shard", 3.0)
            .with_price("breath", 10.0)
            .with_price(SILVER, 5.0)
    }

    #[test]
    fn base_rate_escalates_and_saturates() {
        assert_eq!(escalated_base_rate(10.0, 1), 10.0);
        assert!((escalated_base_rate(10.0, 2) - 11.0).abs() < 1e-12);
        assert_eq!(escalated_base_rate(10.0, 11), 20.0);
        assert_eq!(escalated_base_rate(10.0, 40), 20.0);
        assert_eq!(escalated_base_rate(60.0, 20), 100.0);
    }

    #[test]
    fn flat_bonus_only_at_half_percent() {
        assert_eq!(booster_bonus(0.5), 1.0);
        assert_eq!(booster_bonus(1.0), 1.0);
        assert_eq!(booster_bonus(4.0), 4.0);
    }

    #[test]
    fn costs_skip_silver_and_price_gold() {
        let costs = StageCosts::resolve(&stage(10.0), &prices());
        assert_eq!(costs.per_attempt, 550.0);
        assert_eq!(costs.one_time, 30.0);
        assert_eq!(costs.breath, Some(20.0));
        assert_eq!(costs.metallurgy, None);
    }

    #[test]
    fn silver_named_lines_cost_nothing() {
        let s = RefiningStage {
            exp_material: Some(MaterialQuantity::new(SILVER, 300.0)),
            breath_material: Some(MaterialQuantity::new(SILVER, 10.0)),
            ..stage(10.0)
        };
        let costs = StageCosts::resolve(&s, &prices());
        assert_eq!(costs.one_time, 0.0);
        assert_eq!(costs.breath, Some(0.0));
        assert_eq!(costs.per_attempt, 550.0);
    }

    #[test]
    fn boosters_are_front_loaded() {
        let s = stage(10.0);
        let attempts: Vec<Attempt> = AttemptSchedule::new(&s, &prices(), 2, 5, 4).collect();
        assert_eq!(attempts.len(), 4);
        assert!(attempts[0].boosters.breath && attempts[1].boosters.breath);
        assert!(!attempts[2].boosters.breath);
        // No metallurgy material on the stage, so the request is ignored.
        assert!(attempts.iter().all(|a| !a.boosters.metallurgy));
        assert_eq!(attempts[0].actual_rate, 20.0);
        assert_eq!(attempts[0].cost, 570.0);
        assert_eq!(attempts[2].cost, 550.0);
    }

    #[test]
    fn full_energy_forces_success() {
        let s = stage(10.0);
        let attempts: Vec<Attempt> = AttemptSchedule::new(&s, &prices(), 0, 0, 40).collect();
        let first_full = attempts
            .iter()
            .position(|a| a.energy >= ENERGY_CAP)
            .unwrap();
        assert_eq!(attempts[first_full + 1].actual_rate, 100.0);
        assert!(attempts.iter().all(|a| a.energy <= ENERGY_CAP));
        assert!(attempts[..=first_full].iter().all(|a| a.actual_rate < 100.0));
    }

    #[test]
    fn zero_horizon_is_empty() {
        let s = stage(10.0);
        assert_eq!(AttemptSchedule::new(&s, &prices(), 0, 0, 0).count(), 0);
    }
}
