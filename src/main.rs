use chrono::{Local, NaiveDateTime};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{LevelFilter, info};
use std::fs;
use std::path::{Path, PathBuf};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;
use prerollr::plex::{ListingStore, PlexClient};
use prerollr::schedule::{self, Buckets, Category, DateValue, ScheduleEntry};

fn setup_logging(log_dir: Option<&Path>) -> Result<()> {
    // Create log directory
    let log_dir = match log_dir {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prerollr")
            .join("logs"),
    };

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("prerollr.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Narrow logging to the configured level unless RUST_LOG decides
fn apply_log_level(config: &Config) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let level = config
        .log_level
        .as_deref()
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    log::set_max_level(level);
}

/// Evaluation instant: wall clock, or a `--now` token resolved against it
fn evaluation_instant(token: Option<&str>) -> Result<NaiveDateTime> {
    let wall = Local::now().naive_local();
    match token {
        Some(token) => schedule::parse_datetime(&DateValue::from(token), true, wall)
            .context(format!("Invalid --now value '{}'", token)),
        None => Ok(wall),
    }
}

struct RunContext {
    schedule_path: Option<PathBuf>,
    now: NaiveDateTime,
    play_all: bool,
}

impl RunContext {
    fn new(cli: &Cli, config: &Config) -> Result<Self> {
        Ok(Self {
            schedule_path: cli.schedule_path.clone().or_else(|| config.schedule.path.clone()),
            now: evaluation_instant(cli.now.as_deref())?,
            play_all: cli.play_all || config.schedule.play_all,
        })
    }

    fn load_rules(&self) -> Result<serde_yaml::Value> {
        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        let doc = schedule::load_rules(self.schedule_path.as_deref(), &cwd)?;
        Ok(doc)
    }

    fn listing(&self) -> Result<String> {
        let doc = self.load_rules()?;
        let listing = schedule::preroll_listing(&doc, self.now, self.play_all)
            .context("Failed to resolve pre-roll schedule")?;
        Ok(listing)
    }
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let ctx = RunContext::new(cli, config)?;
    if cli.is_verbose() {
        println!("{} {}", "Evaluating at:".cyan(), ctx.now);
    }

    match &cli.command {
        None => handle_apply_command(&ctx, false, config).await,
        Some(Commands::Apply { dry_run }) => handle_apply_command(&ctx, *dry_run, config).await,
        Some(Commands::Preview) => handle_preview_command(&ctx),
        Some(Commands::Show { json }) => handle_show_command(&ctx, *json),
    }
}

async fn handle_apply_command(ctx: &RunContext, dry_run: bool, config: &Config) -> Result<()> {
    let listing = ctx.listing()?;

    if dry_run {
        info!("Dry run, not saving pre-roll listing: \"{}\"", listing);
        println!("{} {}", "Dry run:".yellow(), listing);
        return Ok(());
    }

    let client = PlexClient::new(config.plex_config()?)?;
    client.connect().await.context("Error connecting to Plex")?;

    info!("Saving Preroll List: \"{}\"", listing);
    client.save_listing(&listing).await.context("Failed to save pre-roll listing")?;

    if listing.is_empty() {
        println!("{}", "Cleared pre-roll listing".green());
    } else {
        println!("{} {}", "Saved:".green(), listing);
    }
    Ok(())
}

fn handle_preview_command(ctx: &RunContext) -> Result<()> {
    let listing = ctx.listing()?;
    println!("{}", listing);
    Ok(())
}

/// How an entry fares at the evaluation instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Contributes to the listing
    Selected,
    /// Active, but evicted by a narrower entry or a higher priority category
    Overridden,
    Inactive,
}

fn entry_state(buckets: &Buckets, entry: &ScheduleEntry, now: NaiveDateTime) -> EntryState {
    if buckets.included(entry.category) && buckets.get(entry.category).contains(entry) {
        EntryState::Selected
    } else if entry.is_active(now) {
        EntryState::Overridden
    } else {
        EntryState::Inactive
    }
}

fn handle_show_command(ctx: &RunContext, json: bool) -> Result<()> {
    let doc = ctx.load_rules()?;
    let entries = schedule::build_schedule(&doc, ctx.now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let buckets = schedule::resolve_buckets(&entries, ctx.now);

    println!("{} {}", "Schedule entries at".cyan(), ctx.now);
    for entry in &entries {
        let marker = match entry_state(&buckets, entry, ctx.now) {
            EntryState::Selected => "*".green(),
            EntryState::Overridden => "~".yellow(),
            EntryState::Inactive => " ".normal(),
        };
        println!(
            "[{}] {:<10} {:<16} {} -> {}  {}{}{}",
            marker,
            entry.category,
            entry.name,
            entry.start,
            entry.end,
            entry.path,
            if entry.weight > 1 { format!(" x{}", entry.weight) } else { String::new() },
            if entry.force { " (force)" } else { "" }
        );
    }

    for category in Category::PRIORITY {
        if !buckets.is_empty(category) && !buckets.included(category) {
            println!("{} {} suppressed by a higher priority category", "note:".yellow(), category);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging first
    setup_logging(cli.log_dir.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_log_level(&config);

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
