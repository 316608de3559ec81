#![deny(warnings)]

//! Headless CLI for running the refinement optimizer over a scenario file.

use anyhow::{bail, Context, Result};
use refine_advisor::MaterialValueInsight;
use refine_core::*;
use refine_runtime::{plan_levels, PlanStep, UpgradePlan};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Prices, stages and optimizer limits loaded from YAML or JSON.
#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    name: Option<String>,
    prices: MarketPriceTable,
    stages: Vec<RefiningStage>,
    #[serde(default)]
    optimizer: OptimizerConfig,
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    scenario: Option<String>,
    level: Option<u32>,
    max_breath: Option<u32>,
    max_metallurgy: Option<u32>,
    max_attempts: Option<u32>,
    samples: Option<u32>,
    json: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut out = Args::default();
    let mut it = args.into_iter();
    let number = |flag: &str, v: Option<String>| -> Result<u32> {
        let v = v.with_context(|| format!("{flag} needs a value"))?;
        v.parse()
            .with_context(|| format!("{flag} expects a non-negative integer, got {v:?}"))
    };
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => out.scenario = it.next(),
            "--level" => out.level = Some(number("--level", it.next())?),
            "--max-breath" => out.max_breath = Some(number("--max-breath", it.next())?),
            "--max-metallurgy" => {
                out.max_metallurgy = Some(number("--max-metallurgy", it.next())?)
            }
            "--max-attempts" => out.max_attempts = Some(number("--max-attempts", it.next())?),
            "--samples" => out.samples = Some(number("--samples", it.next())?),
            "--json" => out.json = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(out)
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let scenario = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
    };
    Ok(scenario)
}

fn demo_scenario() -> Scenario {
    let prices = MarketPriceTable::new(1)
        .with_price("ore", 100.0)
        .with_price("breath", 10.0);
    Scenario {
        name: Some("demo".to_string()),
        prices,
        stages: vec![RefiningStage {
            level: 10,
            base_success_rate: 10.0,
            base_materials: vec![MaterialQuantity::new("ore", 5.0)],
            exp_material: None,
            breath_material: Some(MaterialQuantity::new("breath", 1.0)),
            metallurgy_material: None,
            gold_cost: 50.0,
            silver_cost: 0.0,
        }],
        optimizer: OptimizerConfig::default(),
    }
}

/// Apply flag overrides and reject invalid input before it reaches the engine.
fn prepare(mut scenario: Scenario, args: &Args) -> Result<Scenario> {
    let cfg = &mut scenario.optimizer;
    if let Some(v) = args.max_breath {
        cfg.max_breath_uses = v;
    }
    if let Some(v) = args.max_metallurgy {
        cfg.max_metallurgy_uses = v;
    }
    if let Some(v) = args.max_attempts {
        cfg.max_attempts = v;
    }
    validate_config(&scenario.optimizer)?;
    validate_price_table(&scenario.prices)?;
    if let Some(level) = args.level {
        scenario.stages.retain(|s| s.level == level);
        if scenario.stages.is_empty() {
            bail!("no stage with level {level} in scenario");
        }
    }
    for stage in &scenario.stages {
        validate_stage(stage).with_context(|| format!("stage {}", stage.level))?;
        validate_prices_cover(stage, &scenario.prices)
            .with_context(|| format!("stage {}", stage.level))?;
    }
    Ok(scenario)
}

fn describe_insight(i: &MaterialValueInsight) -> String {
    if !i.available {
        return format!("{}: not offered", i.material_name);
    }
    match (i.implied_unit_value, i.delta_vs_market) {
        (Some(implied), Some(delta)) => format!(
            "{}: market {:.2} | implied {:.2} | {:+.2} {}",
            i.material_name,
            i.market_unit_price,
            implied,
            delta,
            if delta > 0.0 { "worth it" } else { "not worth it" }
        ),
        _ => format!(
            "{}: market {:.2} | implied n/a",
            i.material_name, i.market_unit_price
        ),
    }
}

fn print_step(step: &PlanStep, base_rate: f64) {
    let opt = &step.result.optimal;
    println!(
        "Level {} | base rate {:.2}% | baseline {:.1} | optimal {:.1} (breath x{}, metallurgy x{}) | attempts {:.2} | success {:.2}%",
        step.level,
        base_rate,
        step.result.baseline.expected_total_cost,
        opt.expected_total_cost,
        opt.breath_uses_requested,
        opt.metallurgy_uses_requested,
        opt.expected_attempt_count,
        opt.success_probability() * 100.0
    );
    for insight in &step.insights {
        println!("  {}", describe_insight(insight));
    }
}

fn print_plan(scenario: &Scenario, plan: &UpgradePlan) {
    for step in &plan.steps {
        let rate = scenario
            .stages
            .iter()
            .find(|s| s.level == step.level)
            .map_or(0.0, |s| s.base_success_rate);
        print_step(step, rate);
    }
    println!(
        "Total | optimal {:.1} | baseline {:.1} | savings {:.1}",
        plan.total_expected_cost,
        plan.total_baseline_cost,
        plan.savings()
    );
}

/// Log filter from `RUST_LOG`-style directives, `info` when unset or invalid.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    // Logging setup
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    info!(scenario = ?args.scenario, level = ?args.level, "starting CLI");

    let scenario = match &args.scenario {
        Some(path) => load_scenario(Path::new(path))?,
        None => demo_scenario(),
    };
    let scenario = prepare(scenario, &args)?;
    info!(
        name = scenario.name.as_deref().unwrap_or("unnamed"),
        stages = scenario.stages.len(),
        price_version = scenario.prices.version,
        "scenario loaded"
    );

    let plan = plan_levels(&scenario.stages, &scenario.prices, &scenario.optimizer);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&scenario, &plan);
    }

    if let Some(runs) = args.samples {
        for step in &plan.steps {
            let Some(stage) = scenario.stages.iter().find(|s| s.level == step.level) else {
                continue;
            };
            let opt = &step.result.optimal;
            if let Some(s) = refine_econ::sample_strategy(
                stage,
                &scenario.prices,
                opt.breath_uses_requested,
                opt.metallurgy_uses_requested,
                scenario.optimizer.max_attempts,
                runs,
                u64::from(stage.level),
            ) {
                info!(
                    level = stage.level,
                    expected = opt.expected_total_cost,
                    sampled = s.mean_cost,
                    sampled_attempts = s.mean_attempts,
                    "monte carlo cross-check"
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags() {
        let a = args(&["--scenario", "x.yaml", "--level", "12", "--json"]).unwrap();
        assert_eq!(a.scenario.as_deref(), Some("x.yaml"));
        assert_eq!(a.level, Some(12));
        assert!(a.json);
        assert!(args(&["--level", "twelve"]).is_err());
        assert!(args(&["--bogus"]).is_err());
    }

    #[test]
    fn demo_runs_end_to_end() {
        let scenario = prepare(demo_scenario(), &Args::default()).unwrap();
        let plan = plan_levels(&scenario.stages, &scenario.prices, &scenario.optimizer);
        assert_eq!(plan.steps.len(), 1);
        assert!(plan.total_expected_cost <= plan.total_baseline_cost);
    }

    #[test]
    fn sample_scenario_loads_and_validates() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets/scenarios/armor.yaml");
        let scenario = load_scenario(&path).unwrap();
        let a = Args {
            level: Some(17),
            max_breath: Some(10),
            ..Args::default()
        };
        let scenario = prepare(scenario, &a).unwrap();
        assert_eq!(scenario.stages.len(), 1);
        assert_eq!(scenario.optimizer.max_breath_uses, 10);
    }

    #[test]
    fn log_directives_control_debug_output() {
        let quiet = tracing_subscriber::fmt()
            .with_env_filter(log_filter(Some("warn")))
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(quiet, || {
            assert!(!tracing::enabled!(tracing::Level::DEBUG));
            assert!(!tracing::enabled!(tracing::Level::INFO));
            assert!(tracing::enabled!(tracing::Level::WARN));
        });

        let fallback = tracing_subscriber::fmt()
            .with_env_filter(log_filter(None))
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(fallback, || {
            assert!(!tracing::enabled!(tracing::Level::DEBUG));
            assert!(tracing::enabled!(tracing::Level::INFO));
        });
    }

    #[test]
    fn missing_level_is_rejected() {
        let a = Args {
            level: Some(99),
            ..Args::default()
        };
        assert!(prepare(demo_scenario(), &a).is_err());
    }
}
