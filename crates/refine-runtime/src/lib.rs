#![deny(warnings)]

//! Host-facing runtime for the refinement engine: an explicit result cache
//! keyed by stage and price snapshot, and multi-level upgrade plans.

pub mod cache;
pub mod plan;

pub use cache::{CacheKey, OptimizationCache};
pub use plan::{plan_levels, plan_levels_cached, PlanStep, UpgradePlan};
