use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::info;

pub const HEADER_COLUMNS: &str =
    "session,kind,docnum,date,time,title,yay,nay,abstain,dnv,total,result";
pub const DETAIL_COLUMNS: &str = "docnum,date,time,name,vote";

/// One row of the header table. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteHeader {
    pub session: String,
    pub kind: String,
    #[serde(rename = "docnum")]
    pub doc_number: String,
    pub date: String,
    pub time: String,
    pub title: String,
    pub yay: u32,
    pub nay: u32,
    pub abstain: u32,
    #[serde(rename = "dnv")]
    pub did_not_vote: u32,
    pub total: u32,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteBallot {
    pub member_name: String,
    pub choice: String,
}

#[derive(Serialize)]
struct BallotRow<'a> {
    docnum: &'a str,
    date: &'a str,
    time: &'a str,
    name: &'a str,
    vote: &'a str,
}

/// Header table (plain CSV) and detail table (gzip CSV).
///
/// Every append opens the file, writes, and closes it again, so the tables are
/// complete on disk between calls. Appends to the detail table add a new gzip
/// member; readers must use a multi-member decoder.
pub struct RecordStore {
    headers_path: PathBuf,
    details_path: PathBuf,
}

impl RecordStore {
    pub fn new(headers_path: impl Into<PathBuf>, details_path: impl Into<PathBuf>) -> Self {
        RecordStore {
            headers_path: headers_path.into(),
            details_path: details_path.into(),
        }
    }

    pub fn headers_path(&self) -> &Path {
        &self.headers_path
    }

    pub fn details_path(&self) -> &Path {
        &self.details_path
    }

    /// Truncate both tables and write their column rows. Destroys prior content.
    pub fn initialize(&self) -> Result<()> {
        create_parent(&self.headers_path)?;
        create_parent(&self.details_path)?;

        let mut f = File::create(&self.headers_path)
            .with_context(|| format!("Failed to create {:?}", self.headers_path))?;
        writeln!(f, "{}", HEADER_COLUMNS)?;
        f.sync_all()?;

        let f = File::create(&self.details_path)
            .with_context(|| format!("Failed to create {:?}", self.details_path))?;
        let mut gz = GzEncoder::new(f, Compression::default());
        writeln!(gz, "{}", DETAIL_COLUMNS)?;
        gz.finish()?.sync_all()?;
        Ok(())
    }

    /// Initialize only if either table is missing. Returns whether it did.
    pub fn ensure_initialized(&self) -> Result<bool> {
        if self.headers_path.is_file() && self.details_path.is_file() {
            return Ok(false);
        }
        info!("Creating table headers in {:?} and {:?}", self.headers_path, self.details_path);
        self.initialize()?;
        Ok(true)
    }

    pub fn append_header(&self, header: &VoteHeader) -> Result<()> {
        let f = open_append(&self.headers_path)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(f);
        w.serialize(header)
            .with_context(|| format!("Failed to append to {:?}", self.headers_path))?;
        w.flush()?;
        Ok(())
    }

    pub fn append_ballots(
        &self,
        doc_number: &str,
        date: &str,
        time: &str,
        ballots: &[VoteBallot],
    ) -> Result<()> {
        let f = open_append(&self.details_path)?;
        let gz = GzEncoder::new(f, Compression::default());
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(gz);
        for b in ballots {
            w.serialize(BallotRow {
                docnum: doc_number,
                date,
                time,
                name: &b.member_name,
                vote: &b.choice,
            })
            .with_context(|| format!("Failed to append to {:?}", self.details_path))?;
        }
        let gz = w
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush {:?}: {}", self.details_path, e.error()))?;
        gz.finish()?;
        Ok(())
    }

    /// Data rows in the header table (column row excluded). 0 if missing.
    pub fn count_headers(&self) -> Result<usize> {
        if !self.headers_path.is_file() {
            return Ok(0);
        }
        let f = File::open(&self.headers_path)
            .with_context(|| format!("Failed to open {:?}", self.headers_path))?;
        count_rows(csv::Reader::from_reader(f))
    }

    /// Data rows in the detail table (column row excluded). 0 if missing.
    pub fn count_ballots(&self) -> Result<usize> {
        if !self.details_path.is_file() {
            return Ok(0);
        }
        let f = File::open(&self.details_path)
            .with_context(|| format!("Failed to open {:?}", self.details_path))?;
        let reader = BufReader::new(MultiGzDecoder::new(f));
        count_rows(csv::Reader::from_reader(reader))
    }
}

fn count_rows<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<usize> {
    let mut n = 0;
    for rec in reader.records() {
        rec?;
        n += 1;
    }
    Ok(n)
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {:?} for append (run init first?)", path))
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
    }
    Ok(())
}

/// Read the detail table back as raw lines (column row included).
#[cfg(test)]
pub fn read_detail_lines(path: &Path) -> Result<Vec<String>> {
    use std::io::BufRead;
    let reader = BufReader::new(MultiGzDecoder::new(File::open(path)?));
    Ok(reader.lines().collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_dir;

    fn header(num: &str) -> VoteHeader {
        VoteHeader {
            session: "1 сесія 9 скликання".into(),
            kind: "РЕЗУЛЬТАТИ ПОІМЕННОГО ГОЛОСУВАННЯ".into(),
            doc_number: num.into(),
            date: "29.08.2019".into(),
            time: "14:54:57".into(),
            title: "Поіменне голосування про проект Постанови (№1001), в цілому".into(),
            yay: 311,
            nay: 6,
            abstain: 6,
            did_not_vote: 95,
            total: 418,
            result: "Рішення прийнято".into(),
        }
    }

    fn ballots() -> Vec<VoteBallot> {
        vec![
            VoteBallot { member_name: "Аліксійчук О.В.".into(), choice: "За".into() },
            VoteBallot { member_name: "Бабак С.В.".into(), choice: "Не голосував".into() },
        ]
    }

    #[test]
    fn initialize_writes_column_rows() {
        let dir = test_dir("records_init");
        let store = RecordStore::new(dir.join("h.csv"), dir.join("d.csv.gz"));
        store.initialize().unwrap();

        let h = std::fs::read_to_string(store.headers_path()).unwrap();
        assert_eq!(h, format!("{}\n", HEADER_COLUMNS));
        assert_eq!(read_detail_lines(store.details_path()).unwrap(), vec![DETAIL_COLUMNS]);
        assert_eq!(store.count_headers().unwrap(), 0);
        assert_eq!(store.count_ballots().unwrap(), 0);
    }

    #[test]
    fn header_row_follows_column_order() {
        let dir = test_dir("records_header");
        let store = RecordStore::new(dir.join("h.csv"), dir.join("d.csv.gz"));
        store.initialize().unwrap();
        store.append_header(&header("7")).unwrap();

        let text = std::fs::read_to_string(store.headers_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "1 сесія 9 скликання,РЕЗУЛЬТАТИ ПОІМЕННОГО ГОЛОСУВАННЯ,7,29.08.2019,14:54:57,\
             \"Поіменне голосування про проект Постанови (№1001), в цілому\",311,6,6,95,418,Рішення прийнято"
        );
    }

    #[test]
    fn appends_are_not_deduplicated() {
        let dir = test_dir("records_dupes");
        let store = RecordStore::new(dir.join("h.csv"), dir.join("d.csv.gz"));
        store.initialize().unwrap();
        for _ in 0..2 {
            store.append_header(&header("7")).unwrap();
            store.append_ballots("7", "29.08.2019", "14:54:57", &ballots()).unwrap();
        }
        assert_eq!(store.count_headers().unwrap(), 2);
        assert_eq!(store.count_ballots().unwrap(), 4);

        let lines = read_detail_lines(store.details_path()).unwrap();
        assert_eq!(lines[1], "7,29.08.2019,14:54:57,Аліксійчук О.В.,За");
        assert_eq!(lines[3], lines[1]);
    }

    #[test]
    fn ensure_initialized_keeps_existing_rows() {
        let dir = test_dir("records_ensure");
        let store = RecordStore::new(dir.join("h.csv"), dir.join("d.csv.gz"));
        assert!(store.ensure_initialized().unwrap());
        store.append_header(&header("7")).unwrap();
        assert!(!store.ensure_initialized().unwrap());
        assert_eq!(store.count_headers().unwrap(), 1);
    }

    #[test]
    fn append_without_init_fails() {
        let dir = test_dir("records_noinit");
        let store = RecordStore::new(dir.join("h.csv"), dir.join("d.csv.gz"));
        assert!(store.append_header(&header("7")).is_err());
    }
}
