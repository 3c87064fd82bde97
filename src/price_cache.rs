//! Last-notified price per listing, and the JSON file it lives in.
//!
//! The cache is rewritten wholesale; there is no append log. Writes go to a
//! sibling `.tmp` file first and are renamed over the real file, so a crash
//! mid-write leaves the previous snapshot intact.

use crate::config::{read_guarded, ConfigError};
use crate::model::{CacheUpdate, ListingId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk record: `{"id": int, "price": int}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: ListingId,
    pub price: i64,
}

#[derive(Debug)]
pub enum CacheError {
    Malformed(serde_json::Error),
    File(ConfigError),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Malformed(e) => write!(f, "Malformed cache snapshot: {}", e),
            CacheError::File(e) => write!(f, "Cache file error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Malformed(err)
    }
}

impl From<ConfigError> for CacheError {
    fn from(err: ConfigError) -> Self {
        CacheError::File(err)
    }
}

#[derive(Debug)]
pub enum PersistError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for PersistError {
    fn from(err: std::io::Error) -> Self {
        PersistError::Io(err)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        PersistError::Serialization(err)
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "IO error: {}", e),
            PersistError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for PersistError {}

/// In-memory map of listing id to the last price we notified about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceCache {
    prices: HashMap<ListingId, i64>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a snapshot. Empty input is the empty cache.
    pub fn load(bytes: &[u8]) -> Result<Self, CacheError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::new());
        }

        let entries: Vec<CacheEntry> = serde_json::from_slice(bytes)?;
        Ok(entries.into_iter().collect())
    }

    pub fn lookup(&self, id: ListingId) -> Option<i64> {
        self.prices.get(&id).copied()
    }

    pub fn upsert(&mut self, id: ListingId, price: i64) {
        self.prices.insert(id, price);
    }

    pub fn apply(&mut self, update: &CacheUpdate) {
        self.upsert(update.id, update.price);
    }

    /// Drop every entry whose id is not in `live`. Returns how many were removed.
    pub fn prune(&mut self, live: &HashSet<ListingId>) -> usize {
        let before = self.prices.len();
        self.prices.retain(|id, _| live.contains(id));
        before - self.prices.len()
    }

    /// Dump all entries as a JSON array, sorted by id so files diff cleanly
    pub fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut entries: Vec<CacheEntry> = self.iter().collect();
        entries.sort_by_key(|entry| entry.id);
        serde_json::to_vec(&entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = CacheEntry> + '_ {
        self.prices
            .iter()
            .map(|(&id, &price)| CacheEntry { id, price })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<CacheEntry> for PriceCache {
    fn from_iter<I: IntoIterator<Item = CacheEntry>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().map(|e| (e.id, e.price)).collect(),
        }
    }
}

/// Durable storage for the price cache
pub trait CacheStore: Send {
    /// Overwrite the stored snapshot with `cache`
    fn persist(&mut self, cache: &PriceCache) -> Result<(), PersistError>;

    /// Where the snapshot lives, for logging
    fn describe(&self) -> String;
}

/// JSON array file on local disk
#[derive(Debug, Clone)]
pub struct JsonCacheFile {
    path: PathBuf,
}

impl JsonCacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot; a missing file is created as `[]`
    pub fn load(&self) -> Result<PriceCache, CacheError> {
        log::info!("📂 Loading cache file: {}", self.path.display());

        let Some(text) = read_guarded(&self.path)? else {
            log::info!("Cache file not found, creating empty cache");
            fs::write(&self.path, b"[]").map_err(|e| {
                CacheError::File(ConfigError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            })?;
            return Ok(PriceCache::new());
        };

        let cache = PriceCache::load(text.as_bytes())?;
        log::info!("Loaded {} cached prices from {}", cache.len(), self.path.display());
        Ok(cache)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CacheStore for JsonCacheFile {
    fn persist(&mut self, cache: &PriceCache) -> Result<(), PersistError> {
        let bytes = cache.serialize()?;
        let temp = self.temp_path();

        fs::write(&temp, &bytes)?;
        fs::rename(&temp, &self.path)?;

        log::debug!("💾 Saved {} cached prices to {}", cache.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
