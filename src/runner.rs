//! Drives one query through fetch → reconcile → notify → cache → persist.
//!
//! Failure isolation:
//! - fetch failure: logged, query skipped until next cycle, cache untouched
//! - delivery failure: logged, cache update still applied (no redelivery)
//! - persist failure: logged, in-memory cache stays authoritative

use crate::config::{PrunePolicy, QuerySpec};
use crate::model::{format_price, ListingId, NotifiableEvent};
use crate::notifier::Notifier;
use crate::price_cache::{CacheStore, PriceCache};
use crate::reconciler;
use crate::shutdown::Shutdown;
use crate::source::ListingSource;
use std::collections::HashSet;
use std::time::Duration;

/// What happened during one query run. Used for logging only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub event_count: usize,
    /// `false` when the source failed
    pub fetched: bool,
    /// A per-query prune removed at least one entry
    pub pruned: bool,
    /// Shutdown cut the listing walk short
    pub interrupted: bool,
    /// Ids returned by the source, in source order
    pub live_ids: Vec<ListingId>,
}

pub struct QueryRunner {
    source: Box<dyn ListingSource>,
    notifier: Box<dyn Notifier>,
    store: Box<dyn CacheStore>,
    item_delay: Duration,
    prune_policy: PrunePolicy,
    shutdown: Shutdown,
}

impl QueryRunner {
    pub fn new(
        source: Box<dyn ListingSource>,
        notifier: Box<dyn Notifier>,
        store: Box<dyn CacheStore>,
        item_delay: Duration,
        prune_policy: PrunePolicy,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            item_delay,
            prune_policy,
            shutdown,
        }
    }

    pub fn prune_policy(&self) -> PrunePolicy {
        self.prune_policy
    }

    pub async fn run(&mut self, spec: &QuerySpec, cache: &mut PriceCache) -> RunOutcome {
        let mut outcome = RunOutcome::default();

        let listings = match self.source.fetch(spec).await {
            Ok(listings) => listings,
            Err(e) => {
                log::error!(
                    "❌ {} fetch failed for [{}]: {}",
                    self.source.source_name(),
                    spec.label(),
                    e
                );
                return outcome;
            }
        };

        outcome.fetched = true;
        outcome.live_ids = listings.iter().map(|l| l.id).collect();
        log::debug!("📥 [{}] returned {} listings", spec.label(), listings.len());

        let mut removed = 0;
        if self.prune_policy == PrunePolicy::PerQuery {
            if listings.is_empty() && !cache.is_empty() {
                // An empty page would evict every entry and re-notify them all later
                log::warn!("⚠️  [{}] returned nothing, skipping cache cleanup", spec.label());
            } else {
                let live: HashSet<ListingId> = outcome.live_ids.iter().copied().collect();
                removed = cache.prune(&live);
                if removed > 0 {
                    log::info!("🧹 Cache cleanup: removed {} outdated entries", removed);
                    outcome.pruned = true;
                }
            }
        }

        let diff = reconciler::diff(&listings, cache);
        let mut pending = diff.iter().peekable();

        for index in 0..listings.len() {
            if index > 0 && !self.shutdown.sleep(self.item_delay).await {
                log::info!(
                    "⚠️  Shutdown requested, stopping [{}] after {} of {} listings",
                    spec.label(),
                    index,
                    listings.len()
                );
                outcome.interrupted = true;
                break;
            }

            if let Some((_, event, update)) = pending.next_if(|(pos, _, _)| *pos == index) {
                log_event(event);
                if let Err(e) = self.notifier.send(event).await {
                    log::error!(
                        "❌ {} delivery failed for {}: {}",
                        self.notifier.channel_name(),
                        update.id,
                        e
                    );
                }
                cache.apply(update);
                outcome.event_count += 1;
            }
        }

        if outcome.event_count > 0 || removed > 0 {
            self.persist(cache);
        }

        outcome
    }

    /// Write the cache to durable storage. Returns `false` on failure.
    pub fn persist(&mut self, cache: &PriceCache) -> bool {
        log::info!("💾 Saving {} viewed listings to {}", cache.len(), self.store.describe());
        match self.store.persist(cache) {
            Ok(()) => true,
            Err(e) => {
                log::error!("❌ Failed to persist cache: {}", e);
                false
            }
        }
    }
}

fn log_event(event: &NotifiableEvent) {
    let listing = event.listing();
    match event {
        NotifiableEvent::NewListing(_) => log::info!(
            "🆕 New: title={} id={} tag={} link={}",
            listing.title,
            listing.id,
            listing.tag.as_deref().unwrap_or("-"),
            listing.link
        ),
        NotifiableEvent::PriceDrop {
            old_price,
            new_price,
            ..
        } => log::info!(
            "📉 Price drop: title={} id={} old={} new={}",
            listing.title,
            listing.id,
            format_price(*old_price),
            format_price(*new_price)
        ),
    }
}
