use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

const FILE_PREFIX: &str = "vote_";
const FILE_SUFFIX: &str = ".html.gz";

/// Raw fetched pages, one gzip file per document id.
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DocumentStore { dir: dir.into() }
    }

    pub fn path_for(&self, id: u32) -> PathBuf {
        self.dir.join(format!("{}{}{}", FILE_PREFIX, id, FILE_SUFFIX))
    }

    /// Store `html` under `id`, replacing any earlier copy.
    pub fn put(&self, id: u32, html: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {:?}", self.dir))?;
        let path = self.path_for(id);
        let f = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        let mut gz = GzEncoder::new(f, Compression::default());
        gz.write_all(html.as_bytes())
            .with_context(|| format!("Failed to write {:?}", path))?;
        gz.finish()?.sync_all()?;
        Ok(())
    }

    pub fn get(&self, id: u32) -> Result<String> {
        read_gz(&self.path_for(id))
    }

    /// Stored ids in ascending order.
    pub fn ids(&self) -> Result<Vec<u32>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {:?}", self.dir))?
        {
            let name = entry?.file_name();
            if let Some(id) = name.to_str().and_then(id_from_file_name) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    /// Lazily read every stored document in ascending id order. Each call
    /// lists the directory again, so the sequence can be restarted.
    pub fn iter_all(&self) -> Result<impl Iterator<Item = (u32, Result<String>)> + '_> {
        let ids = self.ids()?;
        Ok(ids.into_iter().map(move |id| (id, self.get(id))))
    }
}

fn id_from_file_name(name: &str) -> Option<u32> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

fn read_gz(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut html = String::new();
    GzDecoder::new(f)
        .read_to_string(&mut html)
        .with_context(|| format!("Failed to decompress {:?}", path))?;
    Ok(html)
}
