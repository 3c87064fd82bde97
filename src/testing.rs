//! In-memory collaborators for unit tests.
//!
//! Each fake is a cheap clone over shared state, so a test can hand one
//! clone to the runner and keep another to inspect what happened.

use crate::config::QuerySpec;
use crate::model::{Listing, ListingId, NotifiableEvent};
use crate::notifier::{DeliveryError, Notifier};
use crate::price_cache::{CacheStore, PersistError, PriceCache};
use crate::source::{FetchError, ListingSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Build a listing with a predictable title and link
pub fn listing(id: u64, price: i64) -> Listing {
    Listing {
        id: ListingId(id),
        title: format!("listing {}", id),
        price,
        tag: None,
        link: format!("https://www.kufar.by/item/{}", id),
        published_at: None,
    }
}

/// Returns canned snapshots keyed by query tag. Unknown tags return nothing.
#[derive(Clone, Default)]
pub struct FakeSource {
    responses: Arc<Mutex<HashMap<String, Option<Vec<Listing>>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, tag: &str, listings: Vec<Listing>) {
        self.responses
            .lock()
            .unwrap()
            .insert(tag.to_string(), Some(listings));
    }

    /// Make every fetch for `tag` fail until `set` is called again
    pub fn fail(&self, tag: &str) {
        self.responses.lock().unwrap().insert(tag.to_string(), None);
    }

    /// Tags fetched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for FakeSource {
    async fn fetch(&self, spec: &QuerySpec) -> Result<Vec<Listing>, FetchError> {
        let tag = spec.label().to_string();
        self.calls.lock().unwrap().push(tag.clone());

        let response = self.responses.lock().unwrap().get(&tag).cloned();
        match response {
            Some(Some(listings)) => Ok(listings),
            Some(None) => Err(FetchError::Status(503)),
            None => Ok(Vec::new()),
        }
    }

    fn source_name(&self) -> &'static str {
        "Fake"
    }
}

/// Records every event it is asked to send
#[derive(Clone, Default)]
pub struct FakeNotifier {
    sent: Arc<Mutex<Vec<NotifiableEvent>>>,
    fail: bool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails after being recorded
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent_ids(&self) -> Vec<u64> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.listing().id.0)
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, event: &NotifiableEvent) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(DeliveryError::Rejected("chat not found".to_string()));
        }
        Ok(())
    }

    fn channel_name(&self) -> &'static str {
        "Fake"
    }
}

/// Keeps every persisted snapshot in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    snapshots: Arc<Mutex<Vec<PriceCache>>>,
    attempts: Arc<Mutex<usize>>,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of persist attempts, successful or not
    pub fn persist_count(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn last_snapshot(&self) -> Option<PriceCache> {
        self.snapshots.lock().unwrap().last().cloned()
    }
}

impl CacheStore for MemoryStore {
    fn persist(&mut self, cache: &PriceCache) -> Result<(), PersistError> {
        *self.attempts.lock().unwrap() += 1;
        if self.fail {
            return Err(PersistError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            )));
        }
        self.snapshots.lock().unwrap().push(cache.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
