#![deny(warnings)]

//! Refinement cost models: expected-cost simulation and strategy search.
//!
//! This crate provides pure, deterministic utilities for:
//! - Walking the attempt sequence of a stage with escalating success rates
//!   and an artisan energy meter that guarantees success once full
//! - Folding that sequence into an expected gold cost for a booster strategy
//! - Exhaustive grid search over front-loaded booster usage counts
//! - Seeded Monte Carlo rollouts and per-material cost breakdowns
//!
//! Enable the `parallel` feature to run the grid search on rayon.

pub mod breakdown;
pub mod optimize;
pub mod sampling;
pub mod schedule;
pub mod simulate;

pub use breakdown::{material_breakdown, MaterialLine};
pub use optimize::{optimize, optimize_with, OptimizationResult};
pub use sampling::{sample_strategy, SampleSummary};
pub use schedule::{
    booster_bonus, escalated_base_rate, Attempt, AttemptSchedule, BoostersUsed, StageCosts,
};
pub use simulate::{simulate, StrategyResult, TraceEntry, SUCCESS_CUTOFF};
