//! Gacha Sim - Entry Point
//!
//! Command-line front end over `GachaService` backed by the file store:
//! ten-pulls, hundred-pulls, pity resets and pity analysis.

use clap::{Parser, Subcommand};
use gacha_sim::assets::{AssetRef, ResolvedDraw};
use gacha_sim::core::{BannerType, EngineConfig, GachaError, Result, UserId};
use gacha_sim::pity::{expected_draws_to_featured, expected_draws_to_hit, monte_carlo, Guarantee, PityState};
use gacha_sim::service::{GachaService, PullReport};
use gacha_sim::store::FileStore;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Offline gacha pity simulator
#[derive(Parser, Debug)]
#[command(name = "gacha-sim")]
#[command(about = "Simulate gacha draws with soft/hard pity and 50/50 guarantees")]
struct Args {
    /// Config file (defaults to $GACHA_CONFIG, then gacha.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Random seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw one batch (default: a ten-pull)
    Pull {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "role")]
        banner: BannerType,
        /// Draws in the batch (defaults to batch_size from config)
        #[arg(long)]
        count: Option<usize>,
    },
    /// Draw ten ten-pulls under one lock
    Hundred {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "role")]
        banner: BannerType,
    },
    /// Reset pity for a banner
    Reset {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "role")]
        banner: BannerType,
    },
    /// Show persisted pity
    Show {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "role")]
        banner: BannerType,
    },
    /// Expected draws per tier, exact and simulated
    Analyze {
        #[arg(long, default_value = "role")]
        banner: BannerType,
        #[arg(long, default_value_t = 10_000)]
        trials: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gacha_sim=info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let json = args.json;
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            if let GachaError::PartialCommit { draws, final_state, .. } = &e {
                print_saved_draws(draws, final_state, json);
            }
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env()?,
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let store = FileStore::new(config.namespace.clone(), config.state_dir.clone());
    let service = GachaService::from_config(config, store)?;

    match &args.command {
        Command::Pull { user, banner, count } => {
            let user = UserId::new(user.as_str());
            let report = match count {
                Some(n) => service.pull_n(&user, *banner, *n).await?,
                None => service.pull(&user, *banner).await?,
            };
            print_report(&report, args.json)?;
        }
        Command::Hundred { user, banner } => {
            let user = UserId::new(user.as_str());
            let json = args.json;
            let report = service
                .pull_large(&user, *banner, |progress| {
                    if !json {
                        let best = progress.outcomes.iter().map(|o| o.rarity).max().unwrap_or(0);
                        println!(
                            "round {}/{}: best {}-star, pity {}",
                            progress.round + 1,
                            progress.rounds,
                            best,
                            progress.state.draws_since_hit(0)
                        );
                    }
                })
                .await?;
            print_report(&report, json)?;
        }
        Command::Reset { user, banner } => {
            service.reset(&UserId::new(user.as_str()), *banner).await?;
            println!("Pity reset for {} on {} banner", user, banner);
        }
        Command::Show { user, banner } => {
            let state = service.state(&UserId::new(user.as_str()), *banner).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                let pool = service.pool(*banner)?;
                println!("{} ({} lifetime draws)", pool.name(), state.total_draws);
                for (index, tier) in pool.tiers()[..pool.filler_index()].iter().enumerate() {
                    let counter = state.counter(index);
                    println!(
                        "  {}: {} since last hit, {}",
                        tier.name,
                        counter.draws_since_hit,
                        match counter.guarantee {
                            Guarantee::Open => "50/50 open",
                            Guarantee::Featured => "next hit guaranteed featured",
                        }
                    );
                }
            }
        }
        Command::Analyze { banner, trials } => {
            let pool = service.pool(*banner)?;
            let seed = service.config().seed.unwrap_or(0);
            let mut rows = Vec::new();
            for (index, tier) in pool.tiers()[..pool.filler_index()].iter().enumerate() {
                let simulated = monte_carlo(&pool, index, *trials, seed);
                rows.push(serde_json::json!({
                    "tier": tier.name,
                    "expected_draws_to_hit": expected_draws_to_hit(tier),
                    "expected_draws_to_featured": expected_draws_to_featured(tier, Guarantee::Open),
                    "simulated": simulated,
                }));
                if args.json {
                    continue;
                }
                match &simulated {
                    Some(sim) => println!(
                        "{}: exact {:.2} to hit / {:.2} to featured; simulated {:.2} / {:.2} (worst {}) over {} trials",
                        tier.name,
                        expected_draws_to_hit(tier),
                        expected_draws_to_featured(tier, Guarantee::Open),
                        sim.mean_draws_to_hit,
                        sim.mean_draws_to_featured,
                        sim.worst_draws_to_featured,
                        sim.trials
                    ),
                    None => println!("{}: never hit, not simulated", tier.name),
                }
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
        }
    }
    Ok(())
}

fn print_report(report: &PullReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("=== {} | {} ===", report.pool_name, report.user);
    print_draws(&report.draws);
    println!("{}", report.stats.summary());
    println!("Draws since last top-tier hit: {}", report.top_tier_pity);
    Ok(())
}

/// Draws that were persisted before a batch stopped part way
fn print_saved_draws(draws: &[ResolvedDraw], final_state: &PityState, json: bool) {
    if json {
        let saved = serde_json::json!({ "draws": draws, "final_state": final_state });
        match serde_json::to_string_pretty(&saved) {
            Ok(out) => println!("{}", out),
            Err(e) => tracing::error!("Could not encode saved draws: {}", e),
        }
        return;
    }

    println!("=== saved before the failure ===");
    print_draws(draws);
    println!("Draws since last top-tier hit: {}", final_state.draws_since_hit(0));
}

fn print_draws(draws: &[ResolvedDraw]) {
    for (i, draw) in draws.iter().enumerate() {
        let shown = match &draw.asset {
            AssetRef::Image(url) => format!("{} <{}>", draw.outcome.item_id, url),
            AssetRef::Name(name) => name.clone(),
        };
        let marker = match (draw.outcome.pity_count, draw.outcome.resolved_from_featured) {
            (Some(pity), true) => format!(" (featured, pity {})", pity),
            (Some(pity), false) => format!(" (standard, pity {})", pity),
            (None, _) => String::new(),
        };
        println!("{:>3}. {}* {}{}", i + 1, draw.outcome.rarity, shown, marker);
    }
}
