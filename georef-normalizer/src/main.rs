//! Point d'entrée CLI pour georef-normalizer

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{BackendArgs, Commands};

/// Normaliser des requêtes georef contre Elasticsearch et PostGIS
#[derive(Parser)]
#[command(name = "georef-normalizer")]
#[command(author, version)]
#[command(about = "Normaliser des requêtes géographiques (entités, calles, adresses, ubicaciones)")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON (surcharge l'environnement)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = cli::load_settings(cli.config.as_deref(), &cli.backend)?;
    debug!(hosts = ?settings.search.hosts, db_host = %settings.database.host, "Settings loaded");

    match cli.command {
        Commands::Query { resource, params } => cli::cmd_query(&settings, resource, params).await,
        Commands::Bulk { resource, input } => cli::cmd_bulk(&settings, resource, &input).await,
        Commands::Check => cli::cmd_check(&settings).await,
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs sur stderr, stdout est réservé aux réponses JSON
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
