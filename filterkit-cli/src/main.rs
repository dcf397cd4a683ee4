//! filterkit CLI
//!
//! Runs the dashboard helpers against a Chromium tab started with
//! `--remote-debugging-port`.
//!
//! Usage:
//!   filterkit filter --tab dashboard --value 19126142
//!   filterkit filter --tab dashboard --value 19126142 --value 55500011 --config filter.json
//!   filterkit clear --tab dashboard
//!   filterkit side-sheet --tab dashboard --fixtures testData.json --section DETAILS_CARD --item RRN_1
//!   filterkit date-range --tab dashboard --fixtures testData.json --preset standardRange

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use filterkit::pages::{apply_date_range, open_details_side_sheet};
use filterkit::{
    clear_filter_dropdown, filter_dropdown, filter_dropdown_multiple, get_side_sheet_value,
    FilterConfig, FixtureStore, Page, SideSheetCoordinate,
};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "filterkit")]
#[command(about = "Exact-match filter automation for the transactions dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Connection {
    /// Remote debugging port of the browser
    #[arg(long, env = "FILTERKIT_CDP_PORT", default_value_t = 9222)]
    port: u16,

    /// Attach to the first tab whose URL contains this text
    #[arg(long, env = "FILTERKIT_TAB")]
    tab: Option<String>,
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[command(flatten)]
    connection: Connection,

    /// Value to select; repeat to select several in one popup
    #[arg(long = "value", required = true)]
    values: Vec<String>,

    /// JSON file with filter options (camelCase keys, all optional)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ClearArgs {
    #[command(flatten)]
    connection: Connection,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SideSheetArgs {
    #[command(flatten)]
    connection: Connection,

    /// testData.json with the side sheet layout
    #[arg(long)]
    fixtures: PathBuf,

    /// Section name from the layout, or its 1-based position
    #[arg(long)]
    section: String,

    /// Item name from the layout, or its 0-based index
    #[arg(long)]
    item: String,

    /// Open the side sheet of this table row first
    #[arg(long)]
    row: Option<usize>,
}

#[derive(Args, Debug)]
struct DateRangeArgs {
    #[command(flatten)]
    connection: Connection,

    #[arg(long)]
    fixtures: PathBuf,

    /// Key under `creationDateFilters`
    #[arg(long, default_value = "standardRange")]
    preset: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Select values in the open filter popup and submit
    Filter(FilterArgs),
    /// Clear the search box of the open filter popup
    Clear(ClearArgs),
    /// Print a value from the transaction side sheet
    SideSheet(SideSheetArgs),
    /// Apply a creation-date preset
    DateRange(DateRangeArgs),
}

fn init_logging() {
    let log_level = env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string().to_lowercase()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Filter(args) => run_filter(args).await,
        Commands::Clear(args) => {
            let page = connect(&args.connection).await?;
            let config = load_config(args.config.as_deref())?;
            clear_filter_dropdown(&page, &config).await?;
            println!("✅ Search cleared");
            Ok(())
        }
        Commands::SideSheet(args) => run_side_sheet(args).await,
        Commands::DateRange(args) => {
            let page = connect(&args.connection).await?;
            let fixtures = load_fixtures(&args.fixtures)?;
            apply_date_range(&page, &fixtures, &args.preset).await?;
            println!("✅ Applied date range '{}'", args.preset);
            Ok(())
        }
    }
}

async fn connect(connection: &Connection) -> Result<Page> {
    info!(port = connection.port, tab = ?connection.tab, "Connecting to browser");
    Page::connect_cdp(connection.port, connection.tab.as_deref())
        .await
        .with_context(|| format!("Failed to attach to browser on port {}", connection.port))
}

fn load_config(path: Option<&Path>) -> Result<FilterConfig> {
    let Some(path) = path else {
        return Ok(FilterConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

fn load_fixtures(path: &Path) -> Result<FixtureStore> {
    Ok(FixtureStore::load(path)?)
}

async fn run_filter(args: FilterArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let page = connect(&args.connection).await?;

    let results = if let [value] = args.values.as_slice() {
        vec![filter_dropdown(&page, value, &config).await?]
    } else {
        filter_dropdown_multiple(&page, &args.values, &config).await?
    };

    for result in &results {
        println!("{}", serde_json::to_string(result)?);
    }
    Ok(())
}

async fn run_side_sheet(args: SideSheetArgs) -> Result<()> {
    let fixtures = load_fixtures(&args.fixtures)?;
    let page = connect(&args.connection).await?;

    let panel = match args.row {
        Some(row) => open_details_side_sheet(&page, row).await?,
        None => page.locator(".side-sheet__container"),
    };
    let value = get_side_sheet_value(
        &panel,
        coordinate(&args.section),
        coordinate(&args.item),
        &fixtures.side_sheet,
    )
    .await?;
    println!("{value}");
    Ok(())
}

/// Numbers are positions, anything else is a layout name.
fn coordinate(raw: &str) -> SideSheetCoordinate {
    match raw.trim().parse::<usize>() {
        Ok(index) => SideSheetCoordinate::Index(index),
        Err(_) => SideSheetCoordinate::Named(raw.trim().to_string()),
    }
}
