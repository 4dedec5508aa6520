//! Satoshi Flipper CLI

use clap::{Parser, Subcommand};
use satoshi_flipper::{
    build_engine,
    config::{generate_sample_config, ConfigLoader, ResolverMode},
    export,
    simulation::{SimulationConfig, SimulationRunner},
    Amount, FlipperResult, LeaderboardEntry, Side,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "satoshi-flipper")]
#[command(about = "Coin flip wagering engine with streak bonuses and leaderboards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured resolver (random or hash)
    #[arg(long)]
    resolver: Option<ResolverMode>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Flip once and print the round as JSON
    Flip {
        #[arg(short, long, default_value = "player-1")]
        player: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, default_value = "0.1")]
        wager: Amount,

        #[arg(short, long, default_value = "heads")]
        side: Side,

        /// Second side; turns the wager into a double flip (needs double flip enabled)
        #[arg(long)]
        double: Option<Side>,
    },

    /// Run many concurrent flips and print totals and leaderboards
    Simulate {
        #[arg(short, long, default_value = "10000")]
        flips: usize,

        #[arg(short, long, default_value = "16")]
        players: usize,

        #[arg(long, default_value = "4")]
        workers: usize,

        #[arg(short, long, default_value = "0.1")]
        wager: Amount,

        /// Every n-th wager per worker is a double flip (needs double flip enabled)
        #[arg(long, default_value = "0")]
        double_every: usize,

        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Write a configuration file with every default
    GenConfig {
        #[arg(short, long, default_value = "flipper.toml")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(ref path) = cli.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(mode) = cli.resolver {
        config.engine.resolver = mode;
    }

    let level = if cli.verbose { "debug".to_string() } else { config.monitoring.log_level.clone() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("satoshi_flipper={}", level).into()),
        )
        .init();

    match cli.command {
        Commands::Flip { player, name, wager, side, double } => {
            let extension = build_engine(&config);
            if let Some(second) = double {
                let round = extension.execute_double_flip(&player, name.as_deref(), wager, side, second)?;
                println!("{}", export::double_flips_to_json(&[round])?);
            } else {
                let round = extension.engine().execute_flip(&player, name.as_deref(), wager, side)?;
                println!("{}", export::rounds_to_json(&[round])?);
            }
        }
        Commands::Simulate { flips, players, workers, wager, double_every, top } => {
            let extension = build_engine(&config);
            let sim_config = SimulationConfig {
                total_flips: flips,
                players,
                workers,
                wager,
                double_flip_every: double_every,
                leaderboard_size: top,
            };
            run_simulation(SimulationRunner::new(extension, sim_config)).await?;
        }
        Commands::GenConfig { output } => {
            generate_sample_config(&output)?;
            info!("Wrote default configuration to {}", output);
        }
    }

    Ok(())
}

async fn run_simulation(runner: SimulationRunner) -> FlipperResult<()> {
    let report = runner.run().await?;

    println!("🪙 Simulation finished in {:?}", report.duration);
    println!("  • Flips settled: {} / {}", report.flips_settled, report.flips_submitted);
    println!("  • Rejected: {}", report.flips_rejected);
    println!("  • Throughput: {:.0} flips/s", report.flips_per_second);
    println!("💰 Treasury");
    println!("  • Total wagered: {}", report.stats.total_wagered);
    println!("  • Total paid out: {}", report.stats.total_paid_out);
    println!("  • House collected: {}", report.stats.house_collected);
    println!("  • Unique players: {}", report.stats.unique_players);

    print_board("🏆 Top by wins", &report.top_by_wins);
    print_board("📈 Top by net profit", &report.top_by_net_profit);
    Ok(())
}

fn print_board(title: &str, entries: &[LeaderboardEntry]) {
    println!("{}", title);
    for entry in entries {
        println!(
            "  {:>2}. {:<16} wins {:>6}  wagered {:>12}  net {:>12}",
            entry.rank, entry.display_name, entry.total_wins, entry.total_wagered, entry.net_profit
        );
    }
}
