use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use time::{Date, OffsetDateTime};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::model::parse_due_date;
use crate::storage::{self, StorageHandle};

pub mod commands;
pub mod grocery;
pub mod render;

use self::commands::{AgendaArgs, RemindersArgs, TaskArgs};
use self::grocery::GroceryArgs;

#[derive(Parser, Debug)]
#[command(
    name = "planner",
    version,
    about = "Personal task and grocery planner"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over PLANNER_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over PLANNER_DATA)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Profile whose tasks and lists are shown (defaults to the config value)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Treat this UTC date (YYYY-MM-DD) as today
    #[arg(long, global = true, value_parser = parse_reference_date)]
    pub today: Option<Date>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show overdue reminders and all tasks grouped by due date (default)
    Agenda(AgendaArgs),
    /// List open tasks that are overdue by at least the reminder threshold
    Reminders(RemindersArgs),
    /// Create, complete, edit, delete and list tasks
    Task(TaskArgs),
    /// Manage grocery lists and their items
    Grocery(GroceryArgs),
}

/// Everything a command needs: resolved config, profile-scoped storage and
/// the date that counts as "today".
#[derive(Clone)]
pub struct Session {
    pub config: Arc<AppConfig>,
    pub storage: StorageHandle,
    pub today: Date,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let paths = loader.paths().clone();
    let mut config = loader.load_or_init()?;
    if let Some(profile) = cli.profile.as_deref().map(str::trim) {
        if !profile.is_empty() {
            config.profile = profile.to_string();
        }
    }
    let storage = storage::init(&paths, &config.storage, &config.profile)?;
    let today = cli
        .today
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());
    tracing::debug!(profile = %config.profile, %today, "session ready");

    let session = Session {
        config: Arc::new(config),
        storage,
        today,
    };
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Agenda(AgendaArgs::default()));
    match command {
        Commands::Agenda(args) => commands::show_agenda(&session, args),
        Commands::Reminders(args) => commands::show_reminders(&session, args),
        Commands::Task(args) => commands::handle_task_command(&session, args),
        Commands::Grocery(args) => grocery::handle_grocery_command(&session, args),
    }
}

fn parse_reference_date(raw: &str) -> Result<Date, String> {
    parse_due_date(raw).ok_or_else(|| format!("'{raw}' is not a YYYY-MM-DD date"))
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
