//! spread-runner: headless projection runner for the spread map.
//!
//! Usage:
//!   spread-runner --rate 1.05 --days 20
//!   spread-runner --config projection.json --db runs.db
//!   spread-runner --registry population.csv --ipc-mode

use anyhow::Result;
use spread_core::{
    band::{display_percent, SeverityBand},
    config::ProjectionConfig,
    engine::{Projection, ProjectionEngine},
    error::ProjectionError,
    snapshot::{InfectionSnapshot, PercentageSnapshot},
    store::{ProjectionStore, RunRecord},
    types::Day,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Query { day: i64 },
    SetRate { rate: f64 },
    Trajectory { region: String },
    GetSummary,
    Quit,
}

/// One region as a renderer sees it.
///
/// Long horizons at high rates can push a count past `f64::MAX`. The raw
/// percentage is then infinite and serialises as JSON `null`, the same as
/// the zero-population sentinel. `overflow` tells the two apart: it is set
/// when the percentage exists but is not finite, and `display` is pinned
/// to the 100% ceiling with the `severe` band.
#[derive(serde::Serialize)]
struct RegionView {
    region:     String,
    percentage: Option<f64>,
    display:    Option<f64>,
    overflow:   bool,
    band:       SeverityBand,
    colour:     &'static str,
}

#[derive(serde::Serialize)]
struct DayView {
    day:     Day,
    regions: Vec<RegionView>,
}

#[derive(serde::Serialize)]
struct Summary {
    growth_rate: f64,
    horizon:     Day,
    days:        usize,
    regions:     usize,
}

/// The engine plus the projection currently being scrubbed.
struct Session {
    engine:     ProjectionEngine,
    initial:    InfectionSnapshot,
    horizon:    Day,
    projection: Projection,
}

impl Session {
    /// A new rate builds a new projection; the old one is dropped whole.
    fn set_rate(&mut self, rate: f64) -> Result<()> {
        self.projection = self.engine.run(&self.initial, rate, self.horizon)?;
        log::info!("Recomputed projection at rate {rate}");
        Ok(())
    }

    fn summary(&self) -> Summary {
        Summary {
            growth_rate: self.projection.growth_rate(),
            horizon:     self.projection.horizon(),
            days:        self.projection.percentages.len(),
            regions:     self.engine.registry().len(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db");

    let mut config = match string_arg(&args, "--config") {
        Some(path) => ProjectionConfig::load(path)?,
        None => ProjectionConfig::default(),
    };
    if let Some(rate) = parse_arg::<f64>(&args, "--rate")? {
        config.growth_rate = rate;
    }
    if let Some(days) = parse_arg::<i64>(&args, "--days")? {
        config.horizon_days = days;
    }
    if let Some(registry) = string_arg(&args, "--registry") {
        config.registry_csv = Some(registry.into());
    }

    let horizon = config.validate()?;
    let engine = config.build_engine()?;
    let initial = config.initial_snapshot(engine.registry())?;
    let projection = engine.run(&initial, config.growth_rate, horizon)?;

    if !ipc_mode {
        println!("Spread projection: spread-runner");
        println!("  rate:      {}", config.growth_rate);
        println!("  days:      {horizon}");
        println!("  regions:   {}", engine.registry().len());
        println!("  db:        {}", db.unwrap_or("(none)"));
        println!();
    }

    if let Some(db) = db {
        let store = ProjectionStore::open(db)?;
        store.migrate()?;
        let run = RunRecord::new(config.growth_rate, horizon, env!("CARGO_PKG_VERSION"));
        store.save_run(&run, &projection)?;
        log::info!("Stored run {}", run.run_id);
        if !ipc_mode {
            println!("  run_id:    {}", run.run_id);
            println!();
        }
    }

    let mut session = Session { engine, initial, horizon, projection };
    if ipc_mode {
        run_ipc_loop(&mut session)?;
    } else {
        print_summary(&session);
    }
    Ok(())
}

fn run_ipc_loop(session: &mut Session) -> Result<()> {
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

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Query { day } => session
                .projection
                .percentages
                .query_signed(day)
                .map_err(anyhow::Error::from)
                .and_then(|snap| Ok(serde_json::to_value(day_view(snap))?)),
            IpcCommand::SetRate { rate } => session
                .set_rate(rate)
                .and_then(|_| Ok(serde_json::to_value(session.summary())?)),
            IpcCommand::Trajectory { region } => session
                .projection
                .percentages
                .trajectory(&region)
                .map_err(anyhow::Error::from)
                .and_then(|t| Ok(serde_json::json!({ "region": region, "percentages": t }))),
            IpcCommand::GetSummary => Ok(serde_json::to_value(session.summary())?),
        };

        match reply {
            Ok(value) => writeln!(stdout, "{value}")?,
            Err(e) => write_error(&mut stdout, &e.to_string())?,
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(out: &mut impl Write, message: &str) -> Result<()> {
    log::warn!("IPC error: {message}");
    writeln!(out, "{}", serde_json::json!({ "error": message }))?;
    out.flush()?;
    Ok(())
}

fn day_view(snapshot: &PercentageSnapshot) -> DayView {
    DayView {
        day:     snapshot.day,
        regions: snapshot
            .iter()
            .map(|(region, percentage)| {
                let band = SeverityBand::classify(percentage);
                RegionView {
                    region: region.to_string(),
                    percentage,
                    display: percentage.map(display_percent),
                    overflow: percentage.is_some_and(|p| !p.is_finite()),
                    band,
                    colour: band.colour(),
                }
            })
            .collect(),
    }
}

fn print_summary(session: &Session) {
    let percentages = &session.projection.percentages;
    let regions: Vec<&str> = session.engine.registry().names().collect();

    println!("=== INFECTED (% of population) ===");
    print!("  {:>4}", "day");
    for region in &regions {
        print!(" {:>17}", region);
    }
    println!();
    for snapshot in percentages.iter() {
        print!("  {:>4}", snapshot.day);
        for (_, percentage) in snapshot.iter() {
            match percentage {
                Some(p) => print!(" {:>17.5}", p),
                None => print!(" {:>17}", "n/a"),
            }
        }
        println!();
    }

    println!();
    println!("=== FINAL DAY ===");
    if let Some(last) = percentages.iter().last() {
        for (region, percentage) in last.iter() {
            let band = SeverityBand::classify(percentage);
            let shown = percentage
                .map(|p| format!("{:.2}%", display_percent(p)))
                .unwrap_or_else(|| "n/a".to_string());
            println!("  {region:<18} {shown:>9}  {}", band.label());
        }
    }
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Parse `flag`'s value; a present but malformed value is an error.
fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    match string_arg(args, flag) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            ProjectionError::InvalidParameter {
                name:   "argument",
                reason: format!("{flag} expects a number, got '{raw}'"),
            }
            .into()
        }),
    }
}
