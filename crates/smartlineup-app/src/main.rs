// smartlineup entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Load config, copying defaults on first run
// 3. Initialize tracing (log to file; stdout carries the JSON output)
// 4. Open the database
// 5. Run the requested command and print its report

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use smartlineup_app::logging;
use smartlineup_app::pipeline::{self, OptimizeRequest};
use smartlineup_core::config::{self, Config};
use smartlineup_core::db::{self, Database};
use smartlineup_core::WeightProfileStore;
use tracing::{info, warn};

/// smartlineup - weighted Smart Scores and DFS lineup generation.
#[derive(Parser, Debug)]
#[command(name = "smartlineup")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Project root containing config/, defaults/ and the data files
    #[arg(long, default_value = ".", global = true)]
    base_dir: PathBuf,

    /// Log filter such as `debug` or `smartlineup=trace`; overrides RUST_LOG
    /// and the [logging] level in contest.toml
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score every player for a week
    Score {
        #[arg(short, long)]
        week: u32,
        /// Profile name (defaults to the configured profile)
        #[arg(short, long)]
        profile: Option<String>,
        /// Only print the best N players
        #[arg(long)]
        top: Option<usize>,
    },

    /// Score a week under several profiles and diff them against the first
    Compare {
        #[arg(short, long)]
        week: u32,
        /// Comma-separated profile names; the first is the baseline
        #[arg(short, long, value_delimiter = ',', required = true)]
        profiles: Vec<String>,
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Generate lineups for a week
    Optimize(OptimizeArgs),

    /// Lineup sets saved for a week
    History {
        #[arg(short, long)]
        week: u32,
    },

    /// Manage saved weight profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Parser, Debug)]
struct OptimizeArgs {
    #[arg(short, long)]
    week: u32,
    #[arg(short, long)]
    profile: Option<String>,
    /// Roster template (defaults to the configured one)
    #[arg(short, long)]
    template: Option<String>,
    /// Number of lineups to generate
    #[arg(short = 'n', long)]
    count: Option<usize>,
    /// Player key to force into every lineup (repeatable)
    #[arg(long = "lock")]
    locked: Vec<String>,
    /// Player key to leave out (repeatable)
    #[arg(long = "exclude")]
    excluded: Vec<String>,
    /// Player key to lock into the showdown captain slot
    #[arg(long)]
    captain: Option<String>,
    /// Seed for objective jitter
    #[arg(long)]
    seed: Option<u64>,
    /// Max exposure for one player such as kc-wr1=0.3 (repeatable)
    #[arg(long = "max-exposure", value_parser = pipeline::parse_exposure_override)]
    max_exposure: Vec<(String, f64)>,
    /// Min exposure for one player such as kc-qb=0.5 (repeatable)
    #[arg(long = "min-exposure", value_parser = pipeline::parse_exposure_override)]
    min_exposure: Vec<(String, f64)>,
    /// Only use players from these teams, e.g. KC,BUF for a showdown game
    #[arg(long, value_delimiter = ',')]
    teams: Vec<String>,
    /// Store the generated set in the database
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Save a profile, starting from an existing one
    Save {
        name: String,
        /// Profile to copy weights and options from
        #[arg(long)]
        from: Option<String>,
        /// Weight override such as W1=0.4 (repeatable)
        #[arg(long = "weight", value_parser = pipeline::parse_weight_override)]
        weights: Vec<(smartlineup_core::Factor, f64)>,
    },
    /// List saved profiles
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.base_dir).context("failed to load configuration")?;

    let env_filter = std::env::var("RUST_LOG").ok();
    let directives =
        logging::filter_directives(cli.log_level.as_deref(), env_filter.as_deref(), &config.logging);
    logging::init_tracing(&logging::log_dir(&cli.base_dir, &config.logging), &directives)?;
    info!("smartlineup starting: {:?}", cli.command);
    info!(
        "Config loaded: {} templates, default '{}', profile '{}'",
        config.templates.len(),
        config.default_template,
        config.profile.name
    );

    let db_path = db::resolve_db_path(&config.db_path)?;
    let db_path = if db_path.is_relative() {
        cli.base_dir.join(db_path)
    } else {
        db_path
    };
    let db = Database::open(&db_path.display().to_string()).context("failed to open database")?;
    info!("Database opened at {}", db_path.display());

    match cli.command {
        Commands::Score { week, profile, top } => {
            let profile = pipeline::resolve_profile(&config, &db, profile.as_deref())?;
            let provider = pipeline::load_pool(&cli.base_dir, &config.data_paths)?;
            let report =
                pipeline::score_report(&provider, week, &profile, &config.resolver, top)?;
            print_json(&report)?;
        }
        Commands::Compare {
            week,
            profiles,
            top,
        } => {
            let profiles = profiles
                .iter()
                .map(|name| pipeline::resolve_profile(&config, &db, Some(name)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let provider = Arc::new(pipeline::load_pool(&cli.base_dir, &config.data_paths)?);
            let report = pipeline::compare_profiles(
                provider,
                week,
                profiles,
                config.resolver.clone(),
                top,
            )
            .await?;
            print_json(&report)?;
        }
        Commands::Optimize(args) => run_optimize(&config, &db, &cli.base_dir, args)?,
        Commands::History { week } => {
            let stored = db.load_lineup_sets(week)?;
            let sets: Vec<_> = stored
                .into_iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id,
                        "week": s.week,
                        "profile": s.profile,
                        "created_at": s.created_at,
                        "lineups": s.set,
                    })
                })
                .collect();
            print_json(&sets)?;
        }
        Commands::Profile(ProfileCommand::Save {
            name,
            from,
            weights,
        }) => {
            let base = pipeline::resolve_profile(&config, &db, from.as_deref())?;
            let saved = pipeline::save_profile(&db, &base, &name, &weights)?;
            print_json(&saved)?;
        }
        Commands::Profile(ProfileCommand::List) => {
            print_json(&db.list_profiles()?)?;
        }
    }

    Ok(())
}

fn run_optimize(
    config: &Config,
    db: &Database,
    base_dir: &std::path::Path,
    args: OptimizeArgs,
) -> anyhow::Result<()> {
    let profile = pipeline::resolve_profile(config, db, args.profile.as_deref())?;
    let provider = pipeline::load_pool(base_dir, &config.data_paths)?;
    let request = OptimizeRequest {
        template: args.template,
        lineup_count: args.count,
        locked: args.locked.into_iter().collect(),
        excluded: args.excluded.into_iter().collect(),
        locked_captain: args.captain,
        seed: args.seed,
        max_exposure: args.max_exposure.into_iter().collect(),
        min_exposure: args.min_exposure.into_iter().collect(),
        teams: args.teams.into_iter().collect(),
    };

    let report = pipeline::optimize_week(config, &provider, args.week, &profile, &request)?;
    if let Some(shortfall) = &report.lineups.shortfall {
        warn!(
            "only {} of {} lineups produced ({:?})",
            shortfall.produced, shortfall.requested, shortfall.reason
        );
    }
    if args.save {
        let id = db.save_lineup_set(args.week, &profile.name, &report.lineups)?;
        info!("Saved lineup set {} for week {}", id, args.week);
    }
    print_json(&report)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}
