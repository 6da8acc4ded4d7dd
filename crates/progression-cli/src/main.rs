use clap::{Parser, Subcommand};
use progression_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "progression-cli", version, about = "Learner progression engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Catalog validation and inspection
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Energy ledger simulation
    Energy {
        #[command(subcommand)]
        action: commands::energy::EnergyAction,
    },
    /// Run a scripted exercise session against an item bank
    Practice(commands::practice::PracticeArgs),
    /// Walk a learner through every engine command
    Demo {
        /// Print the final snapshot and events as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    let level = Config::current().logging.level;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Catalog { action } => commands::catalog::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Energy { action } => commands::energy::run(action),
        Commands::Practice(args) => commands::practice::run(args),
        Commands::Demo { json } => commands::demo::run(json),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
