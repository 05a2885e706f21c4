//! # Key-Value Persistence
//!
//! Calibration state outlives a single run, but the core never touches storage
//! directly: it goes through [`KeyValueStore`]. Two implementations are provided:
//! - [`MemoryStore`]: in-process map, used by tests and embedders with their own
//!   persistence
//! - [`JsonFileStore`]: all keys in one JSON object on disk, used by the CLI
//!
//! Reads never fail from the caller's point of view: a missing, unreadable or
//! corrupted store reads as "no value".

use log::warn;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// String key-value storage for persisted state.
pub trait KeyValueStore {
    /// Value stored under `key`, or `None` if absent or unreadable.
    fn load(&self, key: &str) -> Option<String>;

    fn save(&mut self, key: &str, value: &str) -> io::Result<()>;

    /// Removing an absent key succeeds.
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stores every key in a single JSON object file.
///
/// The file is read on every access; it holds a handful of keys at most.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonFileStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> io::Result<BTreeMap<String, String>> {
        let data = fs::read(&self.path)?;
        let entries = serde_json::from_slice(&data)?;
        Ok(entries)
    }

    /// Current entries for a read-modify-write. A missing file starts empty;
    /// a corrupted one is replaced.
    fn entries_for_update(&self) -> io::Result<BTreeMap<String, String>> {
        match self.read_entries() {
            Ok(entries) => Ok(entries),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) if e.kind() == io::ErrorKind::InvalidData || e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!("Replacing corrupted store {}: {}", self.path.display(), e);
                Ok(BTreeMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        fs::write(&self.path, data)
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Option<String> {
        match self.read_entries() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Unable to read store {}: {}", self.path.display(), e);
                }
                None
            }
        }
    }

    fn save(&mut self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        let mut entries = self.entries_for_update()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
