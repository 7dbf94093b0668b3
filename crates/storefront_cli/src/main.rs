//! Storefront command line entry point.
//!
//! # Responsibility
//! - Expose registration and category setup against a local SQLite file.
//! - Print results as JSON so scripts can consume them.
//!
//! # Invariants
//! - Password hashes never reach stdout (`Account` skips them on serialize).

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use storefront_core::{
    default_log_level, init_logging, init_logging_with, BcryptSecretHasher, CallContext,
    CatalogService, CreateFullRequest, LogTarget, SqliteCategoryRepository,
    SqliteProductRepository, SqliteStore, UserService,
};

#[derive(Parser)]
#[command(name = "storefront_cli")]
#[command(about = "Storefront backend tools", version)]
struct Cli {
    /// trace|debug|info|warn|error; defaults by build mode
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr when omitted
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check core linkage
    Ping,

    /// Register an account with address, contact and categories
    CreateUser {
        #[arg(long)]
        db: PathBuf,
        /// JSON request file, or `-` for stdin
        #[arg(long)]
        input: String,
    },

    /// Create a category
    AddCategory {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logging(&cli) {
        eprintln!("error: {err}");
        return ExitCode::from(2);
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(cli: &Cli) -> Result<(), String> {
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    match cli.log_dir.as_deref() {
        Some(dir) => init_logging(level, dir),
        None => init_logging_with(level, LogTarget::Stderr),
    }
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Ping => {
            println!("storefront_core ping={}", storefront_core::ping());
            println!("storefront_core version={}", storefront_core::core_version());
            Ok(())
        }
        Commands::CreateUser { db, input } => create_user(&db, &input),
        Commands::AddCategory {
            db,
            name,
            description,
        } => add_category(&db, &name, description.as_deref()),
    }
}

fn create_user(db: &Path, input: &str) -> Result<(), String> {
    let raw = read_input(input)?;
    let request: CreateFullRequest =
        serde_json::from_str(&raw).map_err(|err| format!("invalid request json: {err}"))?;

    let store = SqliteStore::open(db).map_err(|err| err.to_string())?;
    let service = UserService::sqlite(store, BcryptSecretHasher::new());
    let created = service
        .create_full(&CallContext::background(), request)
        .map_err(|err| err.to_string())?;

    print_json(&created)
}

fn add_category(db: &Path, name: &str, description: Option<&str>) -> Result<(), String> {
    let store = SqliteStore::open(db).map_err(|err| err.to_string())?;
    let conn = store.connect().map_err(|err| err.to_string())?;
    let catalog = CatalogService::new(
        SqliteProductRepository::new(&conn),
        SqliteCategoryRepository::new(&conn),
    );
    let category = catalog
        .create_category(name, description)
        .map_err(|err| err.to_string())?;

    print_json(&category)
}

fn read_input(input: &str) -> Result<String, String> {
    if input == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .map_err(|err| format!("failed to read stdin: {err}"))?;
        return Ok(raw);
    }
    std::fs::read_to_string(input).map_err(|err| format!("failed to read `{input}`: {err}"))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}
