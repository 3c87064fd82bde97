//! Core data types shared by the fetch, reconcile and notify stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketplace-assigned listing identifier. The only cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub u64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One listing as returned by a single fetch. Never persisted in full.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    /// Price in the smallest currency unit
    pub price: i64,
    /// Tag of the query that produced this listing
    pub tag: Option<String>,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// A notification-worthy transition detected by the reconciler
#[derive(Debug, Clone, PartialEq)]
pub enum NotifiableEvent {
    NewListing(Listing),
    PriceDrop {
        listing: Listing,
        old_price: i64,
        new_price: i64,
    },
}

impl NotifiableEvent {
    pub fn listing(&self) -> &Listing {
        match self {
            NotifiableEvent::NewListing(listing) => listing,
            NotifiableEvent::PriceDrop { listing, .. } => listing,
        }
    }

    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            NotifiableEvent::NewListing(_) => "NEW",
            NotifiableEvent::PriceDrop { .. } => "PRICE_DROP",
        }
    }
}

/// Cache mutation implied by an event: set `id` to `price`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheUpdate {
    pub id: ListingId,
    pub price: i64,
}

/// Formats a smallest-unit price as `123.45`
pub fn format_price(price: i64) -> String {
    let sign = if price < 0 { "-" } else { "" };
    let abs = price.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: u64, price: i64) -> Listing {
        Listing {
            id: ListingId(id),
            title: "Thinkpad X220".to_string(),
            price,
            tag: Some("thinkpad".to_string()),
            link: format!("https://www.kufar.by/item/{}", id),
            published_at: None,
        }
    }

    #[test]
    fn test_event_accessors() {
        let new = NotifiableEvent::NewListing(listing(1, 100));
        assert_eq!(new.kind(), "NEW");
        assert_eq!(new.listing().id, ListingId(1));

        let drop = NotifiableEvent::PriceDrop {
            listing: listing(2, 80),
            old_price: 100,
            new_price: 80,
        };
        assert_eq!(drop.kind(), "PRICE_DROP");
        assert_eq!(drop.listing().price, 80);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0.00");
        assert_eq!(format_price(12_345), "123.45");
        assert_eq!(format_price(7), "0.07");
        assert_eq!(format_price(-150), "-1.50");
    }
}
