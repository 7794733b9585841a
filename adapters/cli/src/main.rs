#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line driver that replays a scripted Tankfield match.

mod scenario;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use crate::{scenario::Scenario, session::Session};

/// Replays a scripted match against the client world and reports what happened.
#[derive(Debug, Parser)]
#[command(name = "tankfield", version)]
struct Args {
    /// Scenario file describing the match.
    scenario: PathBuf,
    /// Number of frames to advance. Defaults to the last scripted tick.
    #[arg(long)]
    ticks: Option<u64>,
    /// Output format for diagnostic logs.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,
    /// Print the world after every frame.
    #[arg(long)]
    dump: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

/// Entry point for the Tankfield command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format, &args.log_level);

    let scenario = Scenario::load(&args.scenario)?;
    let ticks = args.ticks.unwrap_or_else(|| scenario.last_tick());
    if ticks < scenario.last_tick() {
        warn!(
            ticks,
            last_tick = scenario.last_tick(),
            "scripted traffic after the final frame is skipped"
        );
    }

    let mut session = Session::new(&scenario);
    session.setup(&scenario)?;
    info!(scenario = %args.scenario.display(), ticks, "session started");

    for tick in 1..=ticks {
        session.step(&scenario, tick)?;
        if args.dump {
            println!("Tick {tick}");
            println!("{}", session.world());
        }
    }

    if !args.dump {
        println!("{}", session.world());
    }
    println!("Events:");
    for (kind, count) in session.tally() {
        println!("  {kind}: {count}");
    }
    Ok(())
}

fn init_tracing(format: LogFormat, log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}
