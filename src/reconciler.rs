//! Snapshot-vs-cache comparison.
//!
//! `diff` is pure: it reads the cache and returns the events together with
//! the cache updates they imply, leaving it to the caller to interleave
//! notification attempts with applying those updates.
//!
//! Rules per listing, in source order:
//! - id not cached: `NewListing`, insert `(id, price)`
//! - `price < cached`: `PriceDrop(cached, price)`, set `(id, price)`
//! - `price >= cached`: nothing. Equal prices and increases are silent.

use crate::model::{CacheUpdate, Listing, ListingId, NotifiableEvent};
use crate::price_cache::PriceCache;
use std::collections::HashMap;

/// Result of one reconciliation.
///
/// `events[i]` implies `updates[i]`; both keep the source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub events: Vec<NotifiableEvent>,
    pub updates: Vec<CacheUpdate>,
    /// Index into the input slice of the listing behind each event
    pub positions: Vec<usize>,
}

impl Diff {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate `(listing index, event, update)` triples
    pub fn iter(&self) -> impl Iterator<Item = (usize, &NotifiableEvent, &CacheUpdate)> {
        self.positions
            .iter()
            .copied()
            .zip(self.events.iter())
            .zip(self.updates.iter())
            .map(|((pos, event), update)| (pos, event, update))
    }
}

pub fn diff(listings: &[Listing], cache: &PriceCache) -> Diff {
    let mut out = Diff::default();
    // A listing repeated within one snapshot compares against its earlier occurrence
    let mut pending: HashMap<ListingId, i64> = HashMap::new();

    for (pos, listing) in listings.iter().enumerate() {
        let known = pending
            .get(&listing.id)
            .copied()
            .or_else(|| cache.lookup(listing.id));

        let event = match known {
            None => NotifiableEvent::NewListing(listing.clone()),
            Some(cached) if listing.price < cached => NotifiableEvent::PriceDrop {
                listing: listing.clone(),
                old_price: cached,
                new_price: listing.price,
            },
            Some(_) => continue,
        };

        let update = CacheUpdate {
            id: listing.id,
            price: listing.price,
        };
        pending.insert(update.id, update.price);

        out.events.push(event);
        out.updates.push(update);
        out.positions.push(pos);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: u64, price: i64) -> Listing {
        Listing {
            id: ListingId(id),
            title: format!("item {}", id),
            price,
            tag: None,
            link: format!("https://www.kufar.by/item/{}", id),
            published_at: None,
        }
    }

    fn cache_of(pairs: &[(u64, i64)]) -> PriceCache {
        let mut cache = PriceCache::new();
        for &(id, price) in pairs {
            cache.upsert(ListingId(id), price);
        }
        cache
    }

    #[test]
    fn test_unknown_listing_is_new() {
        let listings = vec![listing(1, 100)];
        let result = diff(&listings, &PriceCache::new());

        assert_eq!(result.events, vec![NotifiableEvent::NewListing(listing(1, 100))]);
        assert_eq!(
            result.updates,
            vec![CacheUpdate {
                id: ListingId(1),
                price: 100
            }]
        );
        assert_eq!(result.positions, vec![0]);
    }

    #[test]
    fn test_lower_price_is_drop() {
        let result = diff(&[listing(1, 80)], &cache_of(&[(1, 100)]));

        assert_eq!(
            result.events,
            vec![NotifiableEvent::PriceDrop {
                listing: listing(1, 80),
                old_price: 100,
                new_price: 80,
            }]
        );
        assert_eq!(result.updates[0].price, 80);
    }

    #[test]
    fn test_equal_price_is_silent() {
        let result = diff(&[listing(1, 100)], &cache_of(&[(1, 100)]));
        assert!(result.is_empty());
        assert!(result.updates.is_empty());
    }

    #[test]
    fn test_price_increase_is_silent() {
        let result = diff(&[listing(1, 120)], &cache_of(&[(1, 100)]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_diff_does_not_mutate_cache() {
        let cache = cache_of(&[(1, 100)]);
        let snapshot = cache.clone();
        let _ = diff(&[listing(1, 50), listing(2, 10)], &cache);
        assert_eq!(cache, snapshot);
    }

    #[test]
    fn test_order_preserved_and_positions() {
        let cache = cache_of(&[(2, 200), (3, 300)]);
        let listings = vec![listing(1, 10), listing(2, 250), listing(3, 299), listing(4, 40)];

        let result = diff(&listings, &cache);
        let ids: Vec<u64> = result.updates.iter().map(|u| u.id.0).collect();

        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(result.positions, vec![0, 2, 3]);
        let kinds: Vec<&str> = result.iter().map(|(_, e, _)| e.kind()).collect();
        assert_eq!(kinds, vec!["NEW", "PRICE_DROP", "NEW"]);
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let mut cache = cache_of(&[(5, 500)]);
        let listings = vec![listing(1, 100), listing(5, 450), listing(6, 600)];

        let first = diff(&listings, &cache);
        assert_eq!(first.len(), 3);
        for update in &first.updates {
            cache.apply(update);
        }

        let second = diff(&listings, &cache);
        assert!(second.is_empty());
    }

    #[test]
    fn test_duplicate_id_in_snapshot() {
        let listings = vec![listing(1, 100), listing(1, 100), listing(1, 90)];
        let result = diff(&listings, &PriceCache::new());

        assert_eq!(result.len(), 2);
        assert_eq!(result.events[0].kind(), "NEW");
        assert_eq!(
            result.events[1],
            NotifiableEvent::PriceDrop {
                listing: listing(1, 90),
                old_price: 100,
                new_price: 90,
            }
        );
    }
}
