use anyhow::{Context, Result};
use clap::Parser;
use sports_edge::config::Config;
use sports_edge::feed::{MarketFeed, ReplayFeed, SimulatedSeason};
use sports_edge::report;
use sports_edge::SignalPipeline;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SIM_TEAMS: usize = 16;
const SIM_WEEKS: usize = 12;

/// Sports ratings and market signals from a replayed or simulated feed.
#[derive(Parser, Debug)]
#[command(name = "sports-edge", version)]
struct Args {
    /// TOML config file [default: ./config.toml when present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay a JSON-lines feed file
    #[arg(long, conflicts_with = "simulate", required_unless_present = "simulate")]
    replay: Option<PathBuf>,

    /// Run a synthetic season instead of a replay
    #[arg(long)]
    simulate: bool,

    /// Seed for the simulated season
    #[arg(long, requires = "simulate")]
    seed: Option<u64>,

    /// Show only the top N teams
    #[arg(long)]
    top: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env first so RUST_LOG set there reaches the filter (real env vars win)
    Config::load_env_file()?;
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Path::new("config.toml"))?,
    };

    let log_file = std::fs::File::create(&config.logging.file)
        .with_context(|| format!("failed to create log file {}", config.logging.file))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let mut feed: Box<dyn MarketFeed> = match &args.replay {
        Some(path) => Box::new(ReplayFeed::open(path).await?),
        None => Box::new(SimulatedSeason::new(SIM_TEAMS, SIM_WEEKS, args.seed)),
    };

    let mut pipeline = SignalPipeline::replay(config);
    let summary = pipeline.run(feed.as_mut()).await?;
    pipeline.shutdown().await;

    println!();
    println!("  sports-edge v{}", env!("CARGO_PKG_VERSION"));
    println!("  source: {}", feed.name());
    println!(
        "  {} games ({} rejected), {} snapshots, {} lines, {} splits",
        summary.games, summary.rejected_games, summary.snapshots, summary.lines, summary.splits
    );
    println!();
    print!("{}", report::render_table(&pipeline.rankings(args.top)));

    println!();
    println!("  Arbitrage ({})", pipeline.opportunities().len());
    for opp in pipeline.opportunities() {
        let legs: Vec<String> = opp
            .required_bets
            .iter()
            .map(|b| format!("{} {} @ {:.2} x {:.2}", b.book, b.outcome, b.odds, b.stake))
            .collect();
        println!(
            "    {} {} margin {:.2}% profit {:.2} conf {:.2}  [{}]",
            opp.event,
            opp.market,
            opp.profit_margin * 100.0,
            opp.expected_profit,
            opp.confidence,
            legs.join(", ")
        );
    }

    println!();
    println!("  Alerts ({})", pipeline.alerts().len());
    for alert in pipeline.alerts() {
        println!(
            "    {:<5} {} {} {:+.1} -> {:+.1} conf {:.2}",
            alert.kind, alert.event, alert.market, alert.old_line, alert.new_line, alert.confidence
        );
    }
    Ok(())
}
