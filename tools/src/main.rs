//! aghi-runner: headless runner for the governance health engine.
//!
//! Usage:
//!   aghi-runner --input records.json
//!   aghi-runner --input records.json --derive --import records.db
//!   aghi-runner --db records.db --config engine.json --ipc-mode

use aghi_core::{
    config::EngineConfig,
    engine::GovernanceEngine,
    record::{derive_metrics, Record},
    scorer::NationalSummary,
    simulation_engine::parse_adjustments,
    store::RecordStore,
    types::{Target, NATIONAL},
};
use anyhow::Result;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Summary,
    Anomalies {
        #[serde(default = "default_top_n")]
        top_n: usize,
    },
    Diagnose {
        #[serde(default = "default_target")]
        target: String,
    },
    Simulate {
        #[serde(default = "default_target")]
        target:      String,
        adjustments: BTreeMap<String, f64>,
    },
    Rankings {
        #[serde(default)]
        level: RankingLevel,
        state: Option<String>,
        #[serde(default = "default_top_n")]
        limit: usize,
    },
    Benchmark {
        entities: Vec<String>,
    },
    Briefing {
        #[serde(default = "default_target")]
        target: String,
    },
    Trends {
        #[serde(default = "default_target")]
        target:   String,
        district: Option<String>,
    },
    Operations {
        #[serde(default = "default_target")]
        target: String,
    },
    Quit,
}

#[derive(serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
enum RankingLevel {
    #[default]
    State,
    District,
}

fn default_top_n() -> usize {
    5
}

fn default_target() -> String {
    NATIONAL.to_string()
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let derive = args.iter().any(|a| a == "--derive");
    let db = flag_value(&args, "--db");
    let input = flag_value(&args, "--input");
    let import = flag_value(&args, "--import");
    let top_n = parse_arg(&args, "--top", 5usize);

    let config = match flag_value(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let mut records = match (input, db) {
        (Some(path), _) => load_json(path)?,
        (None, Some(path)) => {
            let store = RecordStore::open(path)?;
            store.migrate()?;
            store.all_records()?
        }
        (None, None) => anyhow::bail!("Either --input <records.json> or --db <records.db> is required"),
    };

    if derive {
        records.iter_mut().for_each(derive_metrics);
    }

    if let Some(path) = import {
        let mut store = RecordStore::open(path)?;
        store.migrate()?;
        store.insert_records(&records)?;
    }

    let engine = GovernanceEngine::with_records(config, records)?;

    if ipc_mode {
        run_ipc_loop(&engine)?;
    } else {
        print_summary(&engine.summary()?);
        for p in engine.priority_interventions(top_n) {
            println!(
                "  [{}] {} ({}) conf {:.3}: {}",
                p.anomaly_type.label(),
                p.district,
                p.state,
                p.anomaly_confidence,
                p.recommended_action
            );
        }
    }

    Ok(())
}

fn run_ipc_loop(engine: &GovernanceEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        match handle_command(engine, cmd) {
            Ok(response) => writeln!(stdout, "{response}")?,
            Err(e) => write_error(&mut stdout, &e.to_string())?,
        }
        stdout.flush()?;
    }
    Ok(())
}

/// One command in, one JSON document out. Engine errors are reported to
/// the caller instead of ending the session.
fn handle_command(engine: &GovernanceEngine, cmd: IpcCommand) -> Result<serde_json::Value> {
    let response = match cmd {
        IpcCommand::Summary => serde_json::to_value(engine.summary()?)?,
        IpcCommand::Anomalies { top_n } => serde_json::to_value(engine.anomaly_report(top_n))?,
        IpcCommand::Diagnose { target } => {
            serde_json::to_value(engine.diagnose(&Target::parse(&target))?)?
        }
        IpcCommand::Simulate { target, adjustments } => {
            let adjustments = parse_adjustments(adjustments.iter().map(|(k, v)| (k.as_str(), *v)))?;
            serde_json::to_value(engine.simulate(&Target::parse(&target), &adjustments)?)?
        }
        IpcCommand::Rankings { level, state, limit } => match level {
            RankingLevel::State => serde_json::to_value(engine.state_rankings(limit))?,
            RankingLevel::District => {
                let filter = state.as_deref().map_or(Target::National, Target::parse);
                serde_json::to_value(engine.district_rankings(&filter, limit))?
            }
        },
        IpcCommand::Benchmark { entities } => {
            let targets: Vec<Target> = entities.iter().map(|e| Target::parse(e)).collect();
            serde_json::to_value(engine.benchmark(&targets))?
        }
        IpcCommand::Briefing { target } => {
            serde_json::to_value(engine.briefing(&Target::parse(&target))?)?
        }
        IpcCommand::Trends { target, district } => {
            serde_json::to_value(engine.trends(&Target::parse(&target), district.as_deref()))?
        }
        IpcCommand::Operations { target } => {
            serde_json::to_value(engine.operations(&Target::parse(&target))?)?
        }
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(response)
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn load_json(path: &str) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let records: Vec<Record> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
    log::info!("Loaded {} records from {path}", records.len());
    Ok(records)
}

fn print_summary(summary: &NationalSummary) {
    println!("Governance Health Index");
    println!("  national AGHI:   {:.1}", summary.national_aghi);
    println!("  monthly change:  {:+.2}", summary.monthly_change);
    println!("  districts:       {}", summary.total_districts);
    println!(
        "  top:             {} ({}) {:.1}, strongest in {}",
        summary.top_district, summary.top_state, summary.top_score, summary.top_pillar
    );
    println!(
        "  bottom:          {} ({}) {:.1}",
        summary.bottom_district, summary.bottom_state, summary.bottom_score
    );
    println!(
        "  excellent / critical: {} / {}",
        summary.excellent_performers, summary.critical_performers
    );
    println!("  enrollment rate: {:.1}%", summary.avg_enrollment_rate);
    println!("  update rate:     {:.1}%", summary.avg_update_rate);
    println!("  inclusion rate:  {:.1}%", summary.inclusion_rate);
    println!("  resilience:      {:.1}", summary.resilience_index);
    println!();
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
