//! gtier-rank - Tier list ranking from the command line
//!
//! Each invocation is one request: it opens the database, resumes the owner's
//! session, applies the command and prints the resulting view as JSON on
//! stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gtier_common::config::{
    default_config_path, load_toml_config_or_default, LoggingConfig, RootFolderInitializer,
    RootFolderResolver,
};
use gtier_common::db::{init_database, GameRecord};
use gtier_common::events::EventBus;
use gtier_rank::models::PairView;
use gtier_rank::{
    build_sqlite_service, CatalogFilter, ItemId, OwnerId, RankError, RankResult, RankingService,
    SessionView, SqliteCatalog, EVENT_BUS_CAPACITY,
};
use sqlx::SqlitePool;

/// Command-line arguments for gtier-rank
#[derive(Parser, Debug)]
#[command(name = "gtier-rank")]
#[command(about = "Rank played games by pairwise preference and sort them into tiers")]
#[command(version)]
struct Args {
    /// Root folder holding gtier.db
    #[arg(short, long, env = "GTIER_ROOT_FOLDER", global = true)]
    root_folder: Option<PathBuf>,

    /// Bootstrap config file (defaults to ~/.config/gtier/config.toml)
    #[arg(long, env = "GTIER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Identity the ranking session belongs to
    #[arg(short, long, env = "GTIER_OWNER", global = true)]
    owner: Option<String>,

    /// Run the per-genre grouping stage (overrides the stored setting)
    #[arg(long, global = true, conflicts_with = "no_grouping")]
    grouping: bool,

    /// Skip the grouping stage (overrides the stored setting)
    #[arg(long, global = true)]
    no_grouping: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start (or restart) a ranking session
    Start {
        /// Only rank games whose genre contains this text
        #[arg(long)]
        genre: Option<String>,
        /// Only rank games whose platform contains this text
        #[arg(long)]
        platform: Option<String>,
    },
    /// Show the current session
    Status,
    /// Answer the pending comparison
    Answer {
        /// Preferred item id
        #[arg(long)]
        winner: i64,
        /// Other item id
        #[arg(long)]
        loser: i64,
    },
    /// Delete the owner's session
    Delete,
    /// Answer comparisons interactively until finished
    Play,
    /// Import catalog rows from a JSON array and mark them played
    Import {
        /// JSON file with an array of games
        file: PathBuf,
    },
}

impl Args {
    fn grouping_override(&self) -> Option<bool> {
        match (self.grouping, self.no_grouping) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = load_toml_config_or_default(config_path.as_deref());
    init_tracing(&toml_config.logging)?;

    info!(
        "Starting gtier-rank v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut resolver = RootFolderResolver::new("gtier-rank").with_cli_arg(args.root_folder.clone());
    if let Some(path) = &config_path {
        resolver = resolver.with_config_path(path.clone());
    }
    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let outcome = run(&args, db.clone()).await;
    db.close().await;

    match outcome {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            if !e.is_client_recoverable() {
                error!("{}", e);
            }
            println!("{}", serde_json::to_string_pretty(&e.to_json())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// stderr by default, or the file named in `[logging] file`
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn run(args: &Args, db: SqlitePool) -> RankResult<serde_json::Value> {
    let owner = OwnerId::parse(args.owner.as_deref().unwrap_or_default())?;

    let service = build_sqlite_service(db.clone(), EventBus::new(EVENT_BUS_CAPACITY)).await?;
    let mut options = service.settings().session_options();
    if let Some(grouping) = args.grouping_override() {
        options.grouping = grouping;
    }

    let view = match &args.command {
        Command::Start { genre, platform } => {
            let filter = CatalogFilter {
                genre: genre.clone(),
                platform: platform.clone(),
            };
            service.start_with(&owner, &filter, options).await?
        }
        Command::Status => service.status(&owner).await?,
        Command::Answer { winner, loser } => {
            service
                .answer(&owner, ItemId(*winner), ItemId(*loser))
                .await?
        }
        Command::Delete => {
            let deleted = service.delete(&owner).await?;
            return Ok(json!({ "owner": owner.as_str(), "deleted": deleted }));
        }
        Command::Play => play(&service, &owner, options).await?,
        Command::Import { file } => {
            let imported = import(&db, &owner, file).await?;
            return Ok(json!({ "owner": owner.as_str(), "imported": imported }));
        }
    };

    serde_json::to_value(&view)
        .map_err(|e| RankError::Store(gtier_common::Error::Internal(e.to_string())))
}

async fn import(db: &SqlitePool, owner: &OwnerId, file: &Path) -> RankResult<usize> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(gtier_common::Error::from)?;
    let games: Vec<GameRecord> = serde_json::from_str(&content).map_err(|e| {
        RankError::InvalidInput(format!("{} is not a JSON array of games: {}", file.display(), e))
    })?;

    Ok(SqliteCatalog::new(db.clone())
        .import_games(owner, &games)
        .await?)
}

/// Resume (or start) the session and prompt on stderr until finished or `q`
async fn play(
    service: &RankingService,
    owner: &OwnerId,
    options: gtier_rank::SessionOptions,
) -> RankResult<SessionView> {
    let mut view = match service.status(owner).await {
        Ok(view) => view,
        Err(RankError::NotFound(_)) => {
            service
                .start_with(owner, &CatalogFilter::default(), options)
                .await?
        }
        Err(e) => return Err(e),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(pair) = view.pending_pair.clone() {
        eprintln!(
            "[{}/{}] 1) {}   2) {}   (q to stop)",
            view.progress.comparisons_done,
            view.progress.comparisons_expected,
            display_name(&pair, true),
            display_name(&pair, false)
        );

        let Some(line) = lines
            .next_line()
            .await
            .map_err(gtier_common::Error::from)?
        else {
            break;
        };

        let (winner, loser) = match line.trim() {
            "1" => (pair.left.id, pair.right.id),
            "2" => (pair.right.id, pair.left.id),
            "q" | "Q" => break,
            _ => {
                eprintln!("Type 1, 2 or q");
                continue;
            }
        };
        view = service.answer(owner, winner, loser).await?;
    }

    Ok(view)
}

fn display_name(pair: &PairView, left: bool) -> String {
    let item = if left { &pair.left } else { &pair.right };
    item.payload
        .get("name")
        .and_then(|n| n.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", item.id))
}
