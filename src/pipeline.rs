use std::time::Duration;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::settings::Settings;
use crate::fetch::{self, Fetcher};
use crate::parser;
use crate::store::{DocumentStore, RecordStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Store raw documents only.
    FetchOnly,
    /// Store raw documents, then parse and append to the tables.
    FetchAndParse,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Skipped { status: u16 },
    Stored,
    Parsed { ballots: usize },
    ParseFailed { reason: String },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub skipped: usize,
    pub stored: usize,
    pub parsed: usize,
    pub failed: usize,
    pub ballots: usize,
}

impl RunStats {
    fn record(&mut self, id: u32, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Skipped { status } => {
                self.skipped += 1;
                warn!("doc {}: skipped, status {}", id, status);
            }
            Outcome::Stored => info!("doc {}: stored", id),
            Outcome::Parsed { ballots } => {
                self.parsed += 1;
                self.ballots += ballots;
                info!("doc {}: parsed, {} ballots", id, ballots);
            }
            Outcome::ParseFailed { reason } => {
                self.failed += 1;
                warn!("doc {}: parse failed: {}", id, reason);
            }
        }
    }

    pub fn print(&self) {
        println!(
            "Done: {} docs ({} stored, {} skipped), {} parsed ({} failed), {} ballots.",
            self.total, self.stored, self.skipped, self.parsed, self.failed, self.ballots,
        );
    }
}

pub struct Stores {
    pub documents: DocumentStore,
    pub records: RecordStore,
}

impl Stores {
    pub fn from_settings(settings: &Settings) -> Self {
        Stores {
            documents: DocumentStore::new(&settings.doc_dir),
            records: RecordStore::new(&settings.headers_path, &settings.details_path),
        }
    }
}

/// Process ids `start..=end` in ascending order, one fetch at a time, pausing
/// `settings.delay()` between fetches. Storage failures abort the run; parse
/// failures and non-200 responses are counted and skipped.
pub async fn run_range<F: Fetcher>(
    fetcher: &F,
    settings: &Settings,
    stores: &Stores,
    mode: Mode,
    start: u32,
    end: u32,
) -> Result<RunStats> {
    if start > end {
        bail!("empty id range {}..={}", start, end);
    }
    if mode == Mode::FetchAndParse {
        stores.records.ensure_initialized()?;
    }

    let pb = progress_bar((end - start) as u64 + 1)?;
    let delay = settings.delay();
    let mut stats = RunStats::default();

    for id in start..=end {
        let outcome = process_one(fetcher, &settings.url_for(id), id, stores, mode).await?;
        if !matches!(outcome, Outcome::Skipped { .. }) {
            stats.stored += 1;
        }
        stats.record(id, &outcome);
        pb.inc(1);
        if id < end {
            pause(delay).await;
        }
    }

    pb.finish_and_clear();
    Ok(stats)
}

async fn process_one<F: Fetcher>(
    fetcher: &F,
    url: &str,
    id: u32,
    stores: &Stores,
    mode: Mode,
) -> Result<Outcome> {
    let response = fetcher.fetch(url).await?;
    if response.status != 200 {
        return Ok(Outcome::Skipped { status: response.status });
    }

    let html = fetch::normalize(&response.body);
    stores.documents.put(id, &html)?;

    match mode {
        Mode::FetchOnly => Ok(Outcome::Stored),
        Mode::FetchAndParse => parse_and_append(&html, &stores.records),
    }
}

fn parse_and_append(html: &str, records: &RecordStore) -> Result<Outcome> {
    let vote = match parser::parse_document(html) {
        Ok(v) => v,
        Err(e) => return Ok(Outcome::ParseFailed { reason: e.to_string() }),
    };
    let h = &vote.header;
    records.append_header(h)?;
    records.append_ballots(&h.doc_number, &h.date, &h.time, &vote.ballots)?;
    Ok(Outcome::Parsed { ballots: vote.ballots.len() })
}

/// Rebuild both tables from the stored raw documents. Truncates the tables
/// first; a document that cannot be read or parsed is reported and skipped.
pub fn reparse(stores: &Stores) -> Result<RunStats> {
    stores.records.initialize()?;

    let docs = stores.documents.iter_all()?;
    let pb = progress_bar(docs.size_hint().0 as u64)?;
    let mut stats = RunStats::default();

    for (id, html) in docs {
        let outcome = match html {
            Ok(html) => parse_and_append(&html, &stores.records)?,
            Err(e) => Outcome::ParseFailed { reason: format!("{:#}", e) },
        };
        stats.record(id, &outcome);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(stats)
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn progress_bar(len: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );
    Ok(pb)
}
