//! Expected-cost fold over the attempt schedule.

use crate::schedule::{AttemptSchedule, BoostersUsed};
use refine_core::{BoosterKind, MarketPriceTable, RefiningStage};
use serde::{Deserialize, Serialize};

/// Cumulative success probability at which the simulation stops early.
pub const SUCCESS_CUTOFF: f64 = 0.999999;

/// One simulated attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// 1-indexed attempt number.
    pub attempt: u32,
    /// Escalated base rate before boosters, in percent.
    pub base_rate: f64,
    /// Rate after boosters and the energy override, in percent.
    pub actual_rate: f64,
    /// Artisan energy after this attempt.
    pub artisan_energy: f64,
    /// Gold spent if this attempt is made.
    pub cost: f64,
    /// Probability the run has succeeded by the end of this attempt.
    pub cumulative_success_probability: f64,
    pub boosters: BoostersUsed,
}

/// Expected outcome of one booster usage strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub breath_uses_requested: u32,
    pub metallurgy_uses_requested: u32,
    /// Expected gold spend, one-time material included.
    pub expected_total_cost: f64,
    /// Sum over attempts of the attempt number weighted by the probability
    /// that the attempt is reached. Display figure, not `E[attempts]`.
    pub expected_attempt_count: f64,
    /// Trace entries that applied breath.
    pub breath_attempts_used: u32,
    /// Trace entries that applied metallurgy.
    pub metallurgy_attempts_used: u32,
    /// `breath_attempts_used` times the per-use breath cost.
    pub breath_total_cost: f64,
    /// `metallurgy_attempts_used` times the per-use metallurgy cost.
    pub metallurgy_total_cost: f64,
    pub trace: Vec<TraceEntry>,
}

impl StrategyResult {
    pub fn attempts_used(&self, kind: BoosterKind) -> u32 {
        match kind {
            BoosterKind::Breath => self.breath_attempts_used,
            BoosterKind::Metallurgy => self.metallurgy_attempts_used,
        }
    }

    pub fn booster_cost(&self, kind: BoosterKind) -> f64 {
        match kind {
            BoosterKind::Breath => self.breath_total_cost,
            BoosterKind::Metallurgy => self.metallurgy_total_cost,
        }
    }

    /// Probability of success within the simulated horizon.
    pub fn success_probability(&self) -> f64 {
        self.trace
            .last()
            .map_or(0.0, |t| t.cumulative_success_probability)
    }

    /// `expected_total_cost / expected_attempt_count`; `None` when no attempt
    /// was simulated.
    pub fn average_cost_per_attempt(&self) -> Option<f64> {
        if self.expected_attempt_count > 0.0 {
            Some(self.expected_total_cost / self.expected_attempt_count)
        } else {
            None
        }
    }
}

/// Expected cost of refining `stage` with breath on attempts
/// `1..=breath_uses` and metallurgy on attempts `1..=metallurgy_uses`.
///
/// Each attempt's cost is weighted by the probability that it is reached.
/// The loop stops once the cumulative success probability reaches
/// [`SUCCESS_CUTOFF`] or after `max_attempts` attempts.
pub fn simulate(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
    breath_uses: u32,
    metallurgy_uses: u32,
    max_attempts: u32,
) -> StrategyResult {
    debug_assert!(
        stage.base_success_rate > 0.0 && stage.base_success_rate <= 100.0,
        "base success rate {} outside (0, 100]",
        stage.base_success_rate
    );
    let schedule = AttemptSchedule::new(stage, prices, breath_uses, metallurgy_uses, max_attempts);
    let costs = schedule.costs().clone();

    let mut cumulative = 0.0_f64;
    let mut expected_cost = costs.one_time;
    let mut expected_attempts = 0.0_f64;
    let mut breath_used = 0u32;
    let mut metallurgy_used = 0u32;
    let mut trace = Vec::new();

    for attempt in schedule {
        let reach = 1.0 - cumulative;
        expected_cost += attempt.cost * reach;
        expected_attempts += f64::from(attempt.number) * reach;
        cumulative = (cumulative + attempt.actual_rate / 100.0 * reach).min(1.0);

        breath_used += u32::from(attempt.boosters.breath);
        metallurgy_used += u32::from(attempt.boosters.metallurgy);
        trace.push(TraceEntry {
            attempt: attempt.number,
            base_rate: attempt.base_rate,
            actual_rate: attempt.actual_rate,
            artisan_energy: attempt.energy,
            cost: attempt.cost,
            cumulative_success_probability: cumulative,
            boosters: attempt.boosters,
        });
        if cumulative >= SUCCESS_CUTOFF {
            break;
        }
    }

    StrategyResult {
        breath_uses_requested: breath_uses,
        metallurgy_uses_requested: metallurgy_uses,
        expected_total_cost: expected_cost,
        expected_attempt_count: expected_attempts,
        breath_attempts_used: breath_used,
        metallurgy_attempts_used: metallurgy_used,
        breath_total_cost: f64::from(breath_used) * costs.breath.unwrap_or(0.0),
        metallurgy_total_cost: f64::from(metallurgy_used) * costs.metallurgy.unwrap_or(0.0),
        trace,
    }
}
