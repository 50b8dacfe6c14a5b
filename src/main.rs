mod fetch;
mod parser;
mod pipeline;
mod settings;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use crate::fetch::{HttpFetcher, Retry};
use crate::pipeline::{Mode, Stores};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "rada_votes", about = "Verkhovna Rada roll-call vote scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory for raw documents (env: RADA_DOC_DIR)
    #[arg(long, global = true)]
    doc_dir: Option<PathBuf>,
    /// Header table path (env: RADA_HEADERS_PATH)
    #[arg(long, global = true)]
    headers: Option<PathBuf>,
    /// Detail table path (env: RADA_DETAILS_PATH)
    #[arg(long, global = true)]
    details: Option<PathBuf>,
    /// Pause between fetches in milliseconds (env: RADA_DELAY_MS)
    #[arg(long, global = true)]
    delay_ms: Option<u64>,
}

#[derive(Args)]
struct Range {
    /// First document id
    #[arg(long, default_value_t = 25)]
    start: u32,
    /// Last document id (inclusive)
    #[arg(long, default_value_t = 7800)]
    end: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and store raw documents only
    Scrape(Range),
    /// Download, store, parse and append to the tables
    Parse(Range),
    /// Rebuild both tables from stored raw documents
    Reparse,
    /// Truncate both tables and write their column rows
    Init,
    /// Show stored document and row counts
    Stats,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut s = Settings::load()?;
        if let Some(p) = &self.doc_dir {
            s.doc_dir = p.clone();
        }
        if let Some(p) = &self.headers {
            s.headers_path = p.clone();
        }
        if let Some(p) = &self.details {
            s.details_path = p.clone();
        }
        if let Some(ms) = self.delay_ms {
            s.delay_ms = ms;
        }
        Ok(s)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = cli.settings()?;
    let stores = Stores::from_settings(&settings);

    let result = match cli.command {
        Commands::Scrape(range) => fetch_range(&settings, &stores, Mode::FetchOnly, range).await,
        Commands::Parse(range) => fetch_range(&settings, &stores, Mode::FetchAndParse, range).await,
        Commands::Reparse => {
            println!("Reparsing all stored documents in {:?}...", settings.doc_dir);
            let stats = pipeline::reparse(&stores)?;
            stats.print();
            Ok(())
        }
        Commands::Init => {
            stores.records.initialize()?;
            println!(
                "Initialized {:?} and {:?}",
                stores.records.headers_path(),
                stores.records.details_path()
            );
            Ok(())
        }
        Commands::Stats => {
            println!("Documents: {}", stores.documents.ids()?.len());
            println!("Headers:   {}", stores.records.count_headers()?);
            println!("Ballots:   {}", stores.records.count_ballots()?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn fetch_range(
    settings: &Settings,
    stores: &Stores,
    mode: Mode,
    range: Range,
) -> anyhow::Result<()> {
    let fetcher = Retry::new(HttpFetcher::new(settings.timeout())?, settings.retries);
    println!(
        "Fetching docs {}..={} ({} ms between requests)...",
        range.start, range.end, settings.delay_ms
    );
    let stats = pipeline::run_range(&fetcher, settings, stores, mode, range.start, range.end).await?;
    stats.print();
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, _) => format!("{:.1}s", d.as_secs_f64()),
        (0, m, s) => format!("{}m {:02}s", m, s),
        (h, m, s) => format!("{}h {:02}m {:02}s", h, m, s),
    }
}
