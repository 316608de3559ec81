#![deny(warnings)]

//! Core domain models and invariants for the refinement cost engine.
//!
//! This crate defines the serializable stage and price types consumed by the
//! simulator and optimizer, with validation helpers that callers run at the
//! API boundary before handing inputs to the (infallible) engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Price table key for the flat gold cost of an attempt.
pub const GOLD: &str = "gold";
/// Price table key for silver. Silver is tracked but never monetized.
pub const SILVER: &str = "silver";

/// A named material with a per-attempt (or one-time) quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialQuantity {
    /// Material name, used as the price table key.
    pub name: String,
    /// Units consumed per use (>= 0).
    pub quantity: f64,
}

impl MaterialQuantity {
    pub fn new(name: impl Into<String>, quantity: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Optional per-attempt boosters that raise the success rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoosterKind {
    /// Breath booster.
    Breath,
    /// Metallurgy booster.
    Metallurgy,
}

impl BoosterKind {
    pub fn label(self) -> &'static str {
        match self {
            BoosterKind::Breath => "breath",
            BoosterKind::Metallurgy => "metallurgy",
        }
    }
}

/// Parameters for refining one gear piece up to a target level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefiningStage {
    /// Target upgrade step.
    pub level: u32,
    /// Success rate in percent (0, 100] at attempt 1.
    pub base_success_rate: f64,
    /// Consumed on every attempt regardless of strategy.
    #[serde(default)]
    pub base_materials: Vec<MaterialQuantity>,
    /// Consumed once, on the first attempt only.
    #[serde(default)]
    pub exp_material: Option<MaterialQuantity>,
    /// Optional per-attempt booster A.
    #[serde(default)]
    pub breath_material: Option<MaterialQuantity>,
    /// Optional per-attempt booster B.
    #[serde(default)]
    pub metallurgy_material: Option<MaterialQuantity>,
    /// Flat gold cost per attempt.
    #[serde(default)]
    pub gold_cost: f64,
    /// Flat silver cost per attempt.
    #[serde(default)]
    pub silver_cost: f64,
}

impl RefiningStage {
    /// The booster material of the given kind, if the stage offers it.
    pub fn booster(&self, kind: BoosterKind) -> Option<&MaterialQuantity> {
        match kind {
            BoosterKind::Breath => self.breath_material.as_ref(),
            BoosterKind::Metallurgy => self.metallurgy_material.as_ref(),
        }
    }

    pub fn has_booster(&self, kind: BoosterKind) -> bool {
        self.booster(kind).is_some()
    }

    /// All material lines of the stage, for price coverage checks.
    pub fn materials(&self) -> impl Iterator<Item = &MaterialQuantity> {
        self.base_materials
            .iter()
            .chain(self.exp_material.iter())
            .chain(self.breath_material.iter())
            .chain(self.metallurgy_material.iter())
    }
}

/// Quoted market price for one material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    /// Gold per unit (>= 0).
    pub unit_price: f64,
    /// Display icon reference, carried through for the presentation layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl PriceEntry {
    pub fn new(unit_price: f64) -> Self {
        Self {
            unit_price,
            icon: None,
        }
    }
}

/// Read-only snapshot of market prices keyed by material name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPriceTable {
    /// Version stamp of the snapshot; bump when any price changes.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub entries: BTreeMap<String, PriceEntry>,
}

impl MarketPriceTable {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            entries: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_price(mut self, name: impl Into<String>, unit_price: f64) -> Self {
        self.insert(name, PriceEntry::new(unit_price));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: PriceEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&PriceEntry> {
        self.entries.get(name)
    }

    /// Unit price of a material.
    ///
    /// `silver` always prices at 0, even when quoted. `gold` defaults to 1
    /// when absent. Any other missing material prices at 0; use
    /// [`validate_prices_cover`] to reject those.
    pub fn unit_price(&self, name: &str) -> f64 {
        if name == SILVER {
            return 0.0;
        }
        match self.entries.get(name) {
            Some(e) => e.unit_price,
            None if name == GOLD => 1.0,
            None => 0.0,
        }
    }

    pub fn gold_unit_price(&self) -> f64 {
        self.unit_price(GOLD)
    }

    /// Gold cost of a material line: quantity times unit price.
    pub fn line_cost(&self, material: &MaterialQuantity) -> f64 {
        material.quantity * self.unit_price(&material.name)
    }
}

/// Limits for the strategy grid search and simulation horizon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Largest breath usage count searched (inclusive).
    #[serde(default = "default_grid_limit")]
    pub max_breath_uses: u32,
    /// Largest metallurgy usage count searched (inclusive).
    #[serde(default = "default_grid_limit")]
    pub max_metallurgy_uses: u32,
    /// Hard cap on simulated attempts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Default attempt horizon for a single simulation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 500;
/// Default grid limit per booster.
pub const DEFAULT_GRID_LIMIT: u32 = 25;
/// Upper bound accepted for grid limits at the boundary.
pub const MAX_GRID_LIMIT: u32 = 1_000;

fn default_grid_limit() -> u32 {
    DEFAULT_GRID_LIMIT
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_breath_uses: DEFAULT_GRID_LIMIT,
            max_metallurgy_uses: DEFAULT_GRID_LIMIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Success rate must be within (0, 100].
    #[error("base success rate {0} is outside (0, 100]")]
    RateOutOfRange(f64),
    /// Numeric field must be finite.
    #[error("non-finite value in {0}")]
    NonFinite(String),
    /// Quantities must be non-negative.
    #[error("negative quantity for material {0}")]
    NegativeQuantity(String),
    /// Price or cost must be non-negative.
    #[error("negative monetary value in {0}")]
    NegativeMoney(String),
    /// Material names must not be blank.
    #[error("material name is empty")]
    EmptyName,
    /// A material used by the stage has no quoted price.
    #[error("no market price for material {0}")]
    MissingPrice(String),
    /// Optimizer limits are out of range.
    #[error("invalid optimizer config: {0}")]
    InvalidConfig(String),
}

fn validate_material(m: &MaterialQuantity) -> Result<(), ValidationError> {
    if m.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if !m.quantity.is_finite() {
        return Err(ValidationError::NonFinite(m.name.clone()));
    }
    if m.quantity < 0.0 {
        return Err(ValidationError::NegativeQuantity(m.name.clone()));
    }
    Ok(())
}

/// Validate a refining stage.
pub fn validate_stage(stage: &RefiningStage) -> Result<(), ValidationError> {
    let rate = stage.base_success_rate;
    if !rate.is_finite() {
        return Err(ValidationError::NonFinite("base_success_rate".into()));
    }
    if rate <= 0.0 || rate > 100.0 {
        return Err(ValidationError::RateOutOfRange(rate));
    }
    for m in stage.materials() {
        validate_material(m)?;
    }
    if !(stage.gold_cost.is_finite() && stage.silver_cost.is_finite()) {
        return Err(ValidationError::NonFinite("currency cost".into()));
    }
    if stage.gold_cost < 0.0 || stage.silver_cost < 0.0 {
        return Err(ValidationError::NegativeMoney(format!(
            "stage {} currency cost",
            stage.level
        )));
    }
    Ok(())
}

/// Validate every entry of a price table.
pub fn validate_price_table(prices: &MarketPriceTable) -> Result<(), ValidationError> {
    for (name, entry) in &prices.entries {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !entry.unit_price.is_finite() {
            return Err(ValidationError::NonFinite(name.clone()));
        }
        if entry.unit_price < 0.0 {
            return Err(ValidationError::NegativeMoney(name.clone()));
        }
    }
    if let Some(silver) = prices.get(SILVER) {
        if silver.unit_price != 0.0 {
            warn!(
                price = silver.unit_price,
                "silver is quoted but never monetized"
            );
        }
    }
    Ok(())
}

/// Require a quoted price for every material the stage consumes.
///
/// `gold` and `silver` never need an entry.
pub fn validate_prices_cover(
    stage: &RefiningStage,
    prices: &MarketPriceTable,
) -> Result<(), ValidationError> {
    for m in stage.materials() {
        if m.name == GOLD || m.name == SILVER {
            continue;
        }
        if prices.get(&m.name).is_none() {
            return Err(ValidationError::MissingPrice(m.name.clone()));
        }
    }
    Ok(())
}

/// Validate optimizer limits.
pub fn validate_config(cfg: &OptimizerConfig) -> Result<(), ValidationError> {
    if cfg.max_attempts == 0 {
        return Err(ValidationError::InvalidConfig(
            "max_attempts must be >= 1".into(),
        ));
    }
    if cfg.max_breath_uses > MAX_GRID_LIMIT || cfg.max_metallurgy_uses > MAX_GRID_LIMIT {
        return Err(ValidationError::InvalidConfig(format!(
            "grid limits must be <= {MAX_GRID_LIMIT}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stage() -> RefiningStage {
        RefiningStage {
            level: 12,
            base_success_rate: 10.0,
            base_materials: vec![
                MaterialQuantity::new("ore", 5.0),
                MaterialQuantity::new(SILVER, 900.0),
            ],
            exp_material: Some(MaterialQuantity::new("shard", 40.0)),
            breath_material: Some(MaterialQuantity::new("breath", 1.0)),
            metallurgy_material: None,
            gold_cost: 50.0,
            silver_cost: 12_000.0,
        }
    }

    #[test]
    fn serde_roundtrip_stage() {
        let s = stage();
        let json = serde_json::to_string(&s).unwrap();
        let back: RefiningStage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn stage_defaults_optional_fields() {
        let back: RefiningStage =
            serde_json::from_str(r#"{"level": 3, "base_success_rate": 100.0}"#).unwrap();
        assert!(back.base_materials.is_empty());
        assert!(back.breath_material.is_none());
        assert_eq!(back.gold_cost, 0.0);
        validate_stage(&back).unwrap();
    }

    #[test]
    fn price_defaults_for_currencies() {
        let prices = MarketPriceTable::new(1).with_price("ore", 100.0);
        assert_eq!(prices.unit_price(GOLD), 1.0);
        assert_eq!(prices.unit_price(SILVER), 0.0);
        assert_eq!(prices.unit_price("unknown"), 0.0);
        assert_eq!(prices.line_cost(&MaterialQuantity::new("ore", 5.0)), 500.0);
    }

    #[test]
    fn quoted_silver_is_never_charged() {
        let prices = MarketPriceTable::new(1)
            .with_price(SILVER, 5.0)
            .with_price(GOLD, 2.0);
        validate_price_table(&prices).unwrap();
        assert_eq!(prices.unit_price(SILVER), 0.0);
        assert_eq!(prices.line_cost(&MaterialQuantity::new(SILVER, 1000.0)), 0.0);
        assert_eq!(prices.gold_unit_price(), 2.0);
    }

    #[test]
    fn price_table_json_shape() {
        let prices: MarketPriceTable = serde_json::from_str(
            r#"{"version": 7, "entries": {"ore": {"unit_price": 12.5, "icon": "ore.png"}}}"#,
        )
        .unwrap();
        assert_eq!(prices.version, 7);
        assert_eq!(prices.get("ore").unwrap().icon.as_deref(), Some("ore.png"));
        validate_price_table(&prices).unwrap();
    }

    #[test]
    fn rejects_bad_rates() {
        let mut s = stage();
        s.base_success_rate = 0.0;
        assert_eq!(
            validate_stage(&s),
            Err(ValidationError::RateOutOfRange(0.0))
        );
        s.base_success_rate = 100.5;
        assert!(validate_stage(&s).is_err());
        s.base_success_rate = f64::NAN;
        assert!(matches!(
            validate_stage(&s),
            Err(ValidationError::NonFinite(_))
        ));
    }

    #[test]
    fn rejects_negative_quantity_and_price() {
        let mut s = stage();
        s.base_materials[0].quantity = -1.0;
        assert_eq!(
            validate_stage(&s),
            Err(ValidationError::NegativeQuantity("ore".into()))
        );
        let prices = MarketPriceTable::new(0).with_price("ore", -3.0);
        assert!(validate_price_table(&prices).is_err());
    }

    #[test]
    fn missing_price_is_reported() {
        let prices = MarketPriceTable::new(0)
            .with_price("ore", 100.0)
            .with_price("shard", 2.0);
        assert_eq!(
            validate_prices_cover(&stage(), &prices),
            Err(ValidationError::MissingPrice("breath".into()))
        );
        let prices = prices.with_price("breath", 10.0);
        validate_prices_cover(&stage(), &prices).unwrap();
    }

    #[test]
    fn config_defaults_and_limits() {
        let cfg: OptimizerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, OptimizerConfig::default());
        validate_config(&cfg).unwrap();
        let bad = OptimizerConfig {
            max_attempts: 0,
            ..cfg
        };
        assert!(validate_config(&bad).is_err());
    }

    proptest! {
        #[test]
        fn valid_rates_accepted(rate in 0.001f64..=100.0, gold in 0.0f64..1e7) {
            let mut s = stage();
            s.base_success_rate = rate;
            s.gold_cost = gold;
            prop_assert!(validate_stage(&s).is_ok());
        }

        #[test]
        fn booster_lookup_matches_fields(has_breath: bool, has_met: bool) {
            let mut s = stage();
            s.breath_material = has_breath.then(|| MaterialQuantity::new("breath", 1.0));
            s.metallurgy_material = has_met.then(|| MaterialQuantity::new("book", 1.0));
            prop_assert_eq!(s.has_booster(BoosterKind::Breath), has_breath);
            prop_assert_eq!(s.has_booster(BoosterKind::Metallurgy), has_met);
        }
    }
}
