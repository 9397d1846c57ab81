// Sent ledger: which input batches have already been emailed
//
// A batch is identified by the sorted set of its input file names. The
// in-memory ledger lives for one process; the file ledger persists across
// invocations until cleared.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub trait SentLedger {
    fn contains(&self, key: &str) -> bool;
    /// Remember a batch. Called only after a successful send.
    fn record(&mut self, key: &str) -> Result<(), String>;
    fn clear(&mut self) -> Result<(), String>;
}

/// Key for a batch: file names sorted, deduplicated, joined with `|`.
pub fn batch_key<S: AsRef<str>>(names: &[S]) -> String {
    let set: BTreeSet<&str> = names.iter().map(|n| n.as_ref()).collect();
    set.into_iter().collect::<Vec<_>>().join("|")
}

/// Default ledger file: <config dir>/ticketboard/sent.json
pub fn default_ledger_path() -> PathBuf {
    crate::app_dir().join("sent.json")
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    keys: BTreeSet<String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SentLedger for MemoryLedger {
    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn record(&mut self, key: &str) -> Result<(), String> {
        self.keys.insert(key.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), String> {
        self.keys.clear();
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    sent: BTreeSet<String>,
}

/// JSON-backed ledger. Every change is written through.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    state: LedgerFile,
}

impl FileLedger {
    /// Open the ledger at `path`; a missing file is an empty ledger.
    pub fn open(path: &Path) -> Result<Self, String> {
        let state = if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| format!("cannot read ledger {}: {}", path.display(), e))?;
            serde_json::from_str(&contents)
                .map_err(|e| format!("corrupt ledger {}: {}", path.display(), e))?
        } else {
            LedgerFile::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.state.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.sent.is_empty()
    }

    fn save(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(&self.state).map_err(|e| e.to_string())?;
        fs::write(&self.path, json).map_err(|e| e.to_string())
    }
}

impl SentLedger for FileLedger {
    fn contains(&self, key: &str) -> bool {
        self.state.sent.contains(key)
    }

    fn record(&mut self, key: &str) -> Result<(), String> {
        self.state.sent.insert(key.to_string());
        self.save()
    }

    fn clear(&mut self) -> Result<(), String> {
        self.state.sent.clear();
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_key_is_order_independent() {
        let a = batch_key(&["weekly.csv", "ytd(1).xls", "ytd(2).xls"]);
        let b = batch_key(&["ytd(2).xls", "weekly.csv", "ytd(1).xls", "weekly.csv"]);
        assert_eq!(a, b);
        assert_eq!(a, "weekly.csv|ytd(1).xls|ytd(2).xls");
    }

    #[test]
    fn test_memory_ledger() {
        let mut ledger = MemoryLedger::new();
        assert!(!ledger.contains("a|b"));
        ledger.record("a|b").unwrap();
        assert!(ledger.contains("a|b"));
        ledger.clear().unwrap();
        assert!(!ledger.contains("a|b"));
    }

    #[test]
    fn test_file_ledger_persists_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sent.json");

        let mut ledger = FileLedger::open(&path).unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.path(), path.as_path());
        ledger.record("a|b|c").unwrap();

        let mut reopened = FileLedger::open(&path).unwrap();
        assert!(reopened.contains("a|b|c"));
        assert_eq!(reopened.len(), 1);

        reopened.clear().unwrap();
        assert!(!path.exists());
        assert!(FileLedger::open(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        fs::write(&path, "not json").unwrap();
        assert!(FileLedger::open(&path).unwrap_err().contains("corrupt ledger"));
    }
}
