pub mod documents;
pub mod records;

pub use documents::DocumentStore;
pub use records::{RecordStore, VoteBallot, VoteHeader};

/// Fresh, empty scratch directory for one test.
#[cfg(test)]
pub fn test_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("rada_votes_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
