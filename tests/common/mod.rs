//! Fake collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use kufarwatch::config::QuerySpec;
use kufarwatch::model::{Listing, ListingId, NotifiableEvent};
use kufarwatch::notifier::{DeliveryError, Notifier};
use kufarwatch::source::{FetchError, ListingSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

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

/// Canned snapshots keyed by query tag; `None` makes the fetch fail
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

    pub fn fail(&self, tag: &str) {
        self.responses.lock().unwrap().insert(tag.to_string(), None);
    }

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

#[derive(Clone, Default)]
pub struct FakeNotifier {
    sent: Arc<Mutex<Vec<NotifiableEvent>>>,
    fail: bool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the event, then reports a delivery failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<NotifiableEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_ids(&self) -> Vec<u64> {
        self.events().iter().map(|e| e.listing().id.0).collect()
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
