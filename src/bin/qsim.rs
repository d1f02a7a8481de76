// qsim - run one service-floor day and print its financial report
//
// Usage: cargo run --bin qsim -- [scenario.json] [--json] [--seed N]
//
// The scenario file is optional; every field falls back to its default.

use log::info;
use qsim::core::config::EngineConfig;
use qsim::core::driver::{SimulationDriver, SPEED_LEVELS};
use qsim::core::replication::{run_replications, ReplicationConfig, ReplicationSummary};
use qsim::core::report::{CostParams, FinancialReport};
use qsim::core::simulation_engine::SimulationEngine;
use qsim::core::timeline::format_clock;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Everything needed to reproduce a run from the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ScenarioConfig {
    engine: EngineConfig,
    costs: CostParams,
    speed_index: usize,
    /// Clock time at which demand triples; never when unset
    peak_demand_at_hours: Option<f64>,
    /// Replayable run when set, entropy otherwise
    seed: Option<u64>,
    max_ticks: u64,
    /// Batch of seeded runs summarised after the main run
    replications: Option<ReplicationConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            costs: CostParams::default(),
            speed_index: 2,
            peak_demand_at_hours: None,
            seed: None,
            max_ticks: 10_000_000,
            replications: None,
        }
    }
}

struct Args {
    scenario: Option<PathBuf>,
    json: bool,
    seed: Option<u64>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        scenario: None,
        json: false,
        seed: None,
    };
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => args.json = true,
            "--seed" => {
                let value = iter.next().ok_or("--seed needs a value")?;
                let seed = value
                    .parse()
                    .map_err(|_| format!("Invalid seed: {}", value))?;
                args.seed = Some(seed);
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {}", flag)),
            path => {
                if args.scenario.is_some() {
                    return Err("Only one scenario file can be given".to_string());
                }
                args.scenario = Some(PathBuf::from(path));
            }
        }
    }
    Ok(args)
}

fn load_scenario(path: Option<&PathBuf>) -> Result<ScenarioConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(ScenarioConfig::default());
    };
    let file = File::open(path)
        .map_err(|e| format!("Cannot open scenario {}: {}", path.display(), e))?;
    let scenario = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("Cannot parse scenario {}: {}", path.display(), e))?;
    Ok(scenario)
}

/// Everything `--json` prints, as one document
#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a FinancialReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    replications: Option<&'a ReplicationSummary>,
}

fn render_json(
    report: &FinancialReport,
    replications: Option<&ReplicationSummary>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonOutput {
        report,
        replications,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let args = parse_args()?;
    let mut scenario = load_scenario(args.scenario.as_ref())?;
    if args.seed.is_some() {
        scenario.seed = args.seed;
    }
    let config = scenario.engine.clone().sanitized();

    info!(
        "λ={}/h μ={}/h s={} m={} H={}h, {} VIP stations, {:?} mode",
        config.arrival_rate,
        config.service_rate,
        config.server_count,
        config.general_queue_count,
        config.operating_hours,
        config.vip_server_count(),
        config.mode
    );

    let engine = match scenario.seed {
        Some(seed) => SimulationEngine::seeded(config.clone(), seed),
        None => SimulationEngine::new(config.clone()),
    };
    let mut driver = SimulationDriver::new(engine).with_speed_index(scenario.speed_index);
    info!(
        "Speed {} ({}h per tick)",
        driver.speed_label(),
        SPEED_LEVELS[driver.speed_index()]
    );

    let mut ticks = 0u64;
    while driver.tick() {
        ticks += 1;
        if let Some(at) = scenario.peak_demand_at_hours {
            if !driver.is_peak_active() && driver.engine().clock_hours() >= at {
                driver.activate_peak_demand();
            }
        }
        if ticks >= scenario.max_ticks {
            return Err(format!(
                "Run still active after {} ticks at {}",
                ticks,
                format_clock(driver.engine().elapsed_hours())
            )
            .into());
        }
    }

    let report = FinancialReport::from_engine(driver.engine(), &scenario.costs);
    let summary = match &scenario.replications {
        Some(replications) => Some(run_replications(&config, replications)?),
        None => None,
    };

    if args.json {
        println!("{}", render_json(&report, summary.as_ref())?);
        return Ok(());
    }

    println!("{}", report);
    println!("Queue history:");
    for sample in driver.timeline().samples() {
        println!(
            "  {}  VIP {:>3}  general {:>3}",
            sample.label, sample.preferential, sample.general
        );
    }
    if let Some(summary) = &summary {
        println!(
            "{} replications: served {:.1} on average ({}..{}), utilization {:.1}%, wait {:.2} min",
            summary.runs.len(),
            summary.mean_served,
            summary.min_served,
            summary.max_served,
            summary.mean_utilization * 100.0,
            summary.mean_wait_minutes
        );
    }
    Ok(())
}
