//! # kufarwatch
//!
//! Polls Kufar listing searches and sends a Telegram message whenever a
//! listing shows up for the first time or its price drops below the last
//! price we notified about.
//!
//! ## Architecture
//!
//! ```text
//! SchedulerLoop ─┬─ for each query ─ QueryRunner
//!                │                    ├─ ListingSource::fetch   (Kufar HTTP)
//!                │                    ├─ reconciler::diff       (pure)
//!                │                    ├─ Notifier::send         (Telegram)
//!                │                    ├─ PriceCache::apply
//!                │                    └─ CacheStore::persist    (if any event)
//!                ├─ query delay
//!                └─ cycle-level prune, loop delay, repeat
//! ```
//!
//! Everything runs on one task; the price cache is a single owned value.
//!
//! ## Module Organization
//!
//! - `model` - Listing, ListingId, NotifiableEvent, CacheUpdate
//! - `price_cache` - PriceCache and the JSON cache file
//! - `reconciler` - snapshot vs cache comparison
//! - `runner` - one query, end to end
//! - `scheduler` - the endless loop
//! - `source` - listing sources (Kufar)
//! - `notifier` - notification channels (Telegram)
//! - `config`, `cli`, `logging`, `shutdown`, `backoff` - plumbing

pub mod backoff;
pub mod cli;
pub mod config;
pub mod logging;
pub mod model;
pub mod notifier;
pub mod price_cache;
pub mod reconciler;
pub mod runner;
pub mod scheduler;
pub mod shutdown;
pub mod source;
#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{ProgramConfig, QuerySpec};
pub use model::{Listing, ListingId, NotifiableEvent};
pub use price_cache::{CacheStore, JsonCacheFile, PriceCache};
pub use runner::{QueryRunner, RunOutcome};
pub use scheduler::{CycleReport, SchedulerLoop, SchedulerState};
