//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::crawler::{
    ConfigStore, CrawlConfig, Crawler, CrawlStrategy, DomainRateLimiter, RootCrawl,
};
use crate::fetch::HttpClient;
use crate::ledger::Ledger;
use crate::storage::FileWriter;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Configuration-driven web crawling with a persistent download ledger")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true, env = "WEBHARVEST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Crawl definitions directory
    #[arg(long, global = true, env = "WEBHARVEST_CONFIGS_DIR")]
    configs_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and ledger database
    Init,

    /// Run crawl definitions
    Crawl {
        /// Crawl definition names (or use --all)
        names: Vec<String>,
        /// Run every crawl definition in the configs directory
        #[arg(short, long)]
        all: bool,
        /// Override the per-domain request delay in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Show ledger counts
    Status,

    /// List the latest recorded download for every page
    Ls,

    /// Delete every page whose URL contains the given fragment
    Purge {
        /// URL substring to match
        fragment: String,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // clap's env feature already folds WEBHARVEST_DATA_DIR/WEBHARVEST_CONFIGS_DIR
    // into the flags; only the non-directory overrides come from the env here.
    let mut settings = match cli.data_dir {
        Some(data_dir) => Settings::with_data_dir(data_dir),
        None => Settings::default(),
    };
    settings.apply_env_overrides();
    if let Some(configs_dir) = cli.configs_dir {
        settings.configs_dir = configs_dir;
    }

    match cli.command {
        Commands::Init => init(&settings).await,
        Commands::Crawl {
            names,
            all,
            delay_ms,
        } => {
            if let Some(ms) = delay_ms {
                settings.request_delay_ms = ms;
            }
            crawl(&settings, &names, all).await
        }
        Commands::Status => status(&settings).await,
        Commands::Ls => ls(&settings).await,
        Commands::Purge { fragment } => purge(&settings, &fragment).await,
    }
}

/// Open the ledger, creating the data directory first so a fresh checkout
/// works without an explicit `init`.
async fn open_ledger(settings: &Settings) -> anyhow::Result<Ledger> {
    std::fs::create_dir_all(&settings.data_dir)?;
    Ok(Ledger::open(&settings.database_path()).await?)
}

async fn init(settings: &Settings) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)?;
    std::fs::create_dir_all(&settings.configs_dir)?;
    std::fs::create_dir_all(&settings.downloads_dir)?;

    // Opening the ledger creates the schema.
    Ledger::open(&settings.database_path()).await?;

    println!(
        "{} initialized {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!("  ledger:  {}", settings.database_path().display());
    println!("  configs: {}", settings.configs_dir.display());
    Ok(())
}

async fn crawl(settings: &Settings, names: &[String], all: bool) -> anyhow::Result<()> {
    let store = ConfigStore::load(&settings.configs_dir)?;

    let selected: Vec<&CrawlConfig> = if all {
        store.crawls().iter().collect()
    } else if names.is_empty() {
        anyhow::bail!("no crawl names given; pass one or more names or --all");
    } else {
        names
            .iter()
            .map(|name| store.crawl(name))
            .collect::<Result<_, _>>()?
    };

    let ledger = open_ledger(settings).await?;
    let fetcher = Arc::new(HttpClient::default());
    let writer = FileWriter::new(&settings.downloads_dir);

    for config in selected {
        let crawler = Crawler::new(&store, config);
        let bindings = crawler.bindings()?;

        println!(
            "{} {} ({} combinations)",
            style("crawling").cyan(),
            style(&config.name).bold(),
            bindings.len()
        );
        let bar = ProgressBar::new(bindings.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .expect("valid progress template"),
        );

        // One limiter per crawl run: independent crawls, independent clocks.
        let limiter = DomainRateLimiter::new(settings.request_delay());
        let mut strategy = CrawlStrategy::Root(RootCrawl::new(
            config,
            ledger.clone(),
            fetcher.clone(),
            writer.clone(),
            limiter,
        ));

        for binding in &bindings {
            strategy.process(binding).await?;
            bar.inc(1);
        }
        bar.finish_and_clear();
        println!(
            "{} {}",
            style("✓").green(),
            style(&config.name).bold()
        );
    }
    Ok(())
}

async fn status(settings: &Settings) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    let pages = ledger.page_count().await?;
    let versions = ledger.version_count().await?;

    println!("ledger:   {}", settings.database_path().display());
    println!("pages:    {}", pages);
    println!("versions: {}", versions);
    Ok(())
}

async fn ls(settings: &Settings) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    let listings = ledger.latest_download_listings().await?;

    if listings.is_empty() {
        println!("no downloads recorded");
        return Ok(());
    }

    for row in listings {
        let status = row
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<19}  {}  {}",
            status,
            row.version_date.chars().take(19).collect::<String>(),
            row.url,
            style(row.content_file_path.as_deref().unwrap_or("-")).dim()
        );
    }
    Ok(())
}

async fn purge(settings: &Settings, fragment: &str) -> anyhow::Result<()> {
    let ledger = open_ledger(settings).await?;
    let removed = ledger.delete_urls_like(fragment).await?;
    println!(
        "{} removed {} page(s) matching '{}'",
        style("✓").green(),
        removed,
        fragment
    );
    Ok(())
}
