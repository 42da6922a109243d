use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use disclosures_acquire::{discover, links, output, Session, Strategy};
use disclosures_model::{HarvestConfig, PageListing};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "disclosures")]
#[command(about = "Discover, collect, and download PDFs from age-gated disclosure listings")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    /// JSON config file; flags given on the command line take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// `name=value` cookie to present when the age gate is script-driven
    #[arg(long, global = true)]
    age_cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum StrategyArg {
    /// Follow the pager's Next link from each dataset root
    Follow,
    /// Request ?page=1.. directly until the first failure
    Probe,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Follow => Strategy::Follow,
            StrategyArg::Probe => Strategy::Probe,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Discover valid listing-page URLs and save them (downloads nothing)
    Discover {
        #[arg(short, long, value_enum, default_value = "follow")]
        strategy: StrategyArg,

        /// Dataset listing root URL (repeatable; defaults to data sets 9, 10, 11)
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,

        /// Where to write the listing file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print every unique PDF URL found on the saved listing pages
    Collect {
        /// Listing file of page URLs
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Full run: reuse or discover listing pages, collect PDF links, download
    Download {
        /// Listing file of page URLs (read if present, written after discovery)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory to save PDFs into
        #[arg(short = 'O', long)]
        out_dir: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "follow")]
        strategy: StrategyArg,

        /// Ignore an existing listing file and discover pages again
        #[arg(long)]
        rediscover: bool,

        /// Dataset listing root URL (repeatable)
        #[arg(short, long = "dataset")]
        datasets: Vec<String>,
    },

    /// Validate a download directory or a listing file
    Validate {
        /// Directory of downloaded PDFs, or a listing file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Map log level, suppressing noisy HTML-parsing and HTTP crates at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn  => "warn",
        LogLevel::Info  => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn,hyper_util=warn,reqwest=info",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn,hyper_util=warn,reqwest=info",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }

    let mut cfg = base_config(&cli)?;

    match cli.command {
        Commands::Discover {
            strategy,
            datasets,
            output: listing_path,
        } => {
            if !datasets.is_empty() {
                cfg.datasets = datasets;
            }
            if let Some(path) = listing_path {
                cfg.valid_urls_file = path;
            }
            tracing::info!(datasets = cfg.datasets.len(), "Discovering listing pages");
            let session = Session::new(&cfg)?;
            let listing = discover::discover(&session, &cfg, strategy.into()).await?;
            for url in &listing.urls {
                println!("{url}");
            }
            output::write_listing(&listing, &cfg.valid_urls_file)?;
        }
        Commands::Collect { input } => {
            if let Some(path) = input {
                cfg.valid_urls_file = path;
            }
            let listing = load_listing(&cfg.valid_urls_file)?;
            anyhow::ensure!(
                !listing.is_empty(),
                "No page URLs in {}; run `disclosures discover` first",
                cfg.valid_urls_file.display()
            );
            tracing::info!(pages = listing.len(), "Collecting PDF links");
            let session = Session::new(&cfg)?;
            let pdfs = links::collect_from_pages(&session, &listing.urls, &cfg).await?;
            for url in &pdfs {
                println!("{url}");
            }
        }
        Commands::Download {
            input,
            out_dir,
            strategy,
            rediscover,
            datasets,
        } => {
            if let Some(path) = input {
                cfg.valid_urls_file = path;
            }
            if let Some(dir) = out_dir {
                cfg.out_dir = dir;
            }
            if !datasets.is_empty() {
                cfg.datasets = datasets;
            }
            tracing::info!(
                listing = %cfg.valid_urls_file.display(),
                out_dir = %cfg.out_dir.display(),
                "Harvesting PDFs"
            );
            if let Some(report) = disclosures_acquire::run(&cfg, strategy.into(), rediscover).await? {
                let failed = report.total() - report.ok_count();
                if failed > 0 {
                    tracing::warn!(failed, "Some PDFs could not be downloaded; see manifest.json");
                }
            }
        }
        Commands::Validate { path } => {
            tracing::info!(path = %path.display(), "Validating");
            disclosures_validate::validate(&path, &cfg.datasets())?;
        }
    }

    Ok(())
}

/// Config file (or defaults) with the global flag overrides applied.
fn base_config(cli: &Cli) -> Result<HarvestConfig> {
    let mut cfg = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config");
            HarvestConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => HarvestConfig::default(),
    };
    if let Some(cookie) = &cli.age_cookie {
        cfg.age_cookie = Some(cookie.clone());
    }
    Ok(cfg)
}

fn load_listing(path: &Path) -> Result<PageListing> {
    PageListing::load(path).with_context(|| format!("Failed to read listing {}", path.display()))
}
