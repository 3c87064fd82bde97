//! Endless query loop.
//!
//! One cycle runs every configured query in order, sleeping the
//! inter-query delay after each, then prunes (per policy) and sleeps the
//! inter-cycle delay. Queries never run concurrently; the price cache is
//! owned here and lent to the runner one query at a time.

use crate::config::{Delays, PrunePolicy, QuerySpec};
use crate::model::ListingId;
use crate::price_cache::PriceCache;
use crate::runner::QueryRunner;
use crate::shutdown::Shutdown;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    ShuttingDown,
    Stopped,
}

/// Summary of one full pass over the queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub queries_run: usize,
    pub events: usize,
    pub failed_queries: usize,
    /// Entries evicted by cycle-level pruning
    pub pruned: usize,
    /// The cycle stopped early because of shutdown
    pub interrupted: bool,
}

pub struct SchedulerLoop {
    queries: Vec<QuerySpec>,
    runner: QueryRunner,
    cache: PriceCache,
    delays: Delays,
    shutdown: Shutdown,
    state: SchedulerState,
    cycles: u64,
}

impl SchedulerLoop {
    pub fn new(
        queries: Vec<QuerySpec>,
        runner: QueryRunner,
        cache: PriceCache,
        delays: Delays,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            queries,
            runner,
            cache,
            delays,
            shutdown,
            state: SchedulerState::Running,
            cycles: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run cycles until shutdown is requested, then hand back the cache
    pub async fn run(mut self) -> PriceCache {
        log::info!(
            "🔄 Starting loop: {} queries, query delay {}s, loop delay {}s",
            self.queries.len(),
            self.delays.query,
            self.delays.cycle
        );

        while self.observe_shutdown() == SchedulerState::Running {
            let report = self.run_cycle().await;
            log::info!(
                "✅ Cycle {} done: {} queries, {} events, {} failed, {} pruned",
                self.cycles,
                report.queries_run,
                report.events,
                report.failed_queries,
                report.pruned
            );

            if report.interrupted || !self.shutdown.sleep(self.delays.cycle_delay()).await {
                self.state = SchedulerState::ShuttingDown;
            }
        }

        self.state = SchedulerState::Stopped;
        log::info!("✅ Loop stopped after {} cycles", self.cycles);
        self.cache
    }

    /// One pass over all queries
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        let mut live: HashSet<ListingId> = HashSet::new();

        for spec in &self.queries {
            if self.shutdown.is_requested() {
                if self.state == SchedulerState::Running {
                    log::info!("⚠️  Shutdown requested, no further queries will start");
                    self.state = SchedulerState::ShuttingDown;
                }
                report.interrupted = true;
                break;
            }

            let outcome = self.runner.run(spec, &mut self.cache).await;
            report.queries_run += 1;
            report.events += outcome.event_count;
            if outcome.fetched {
                live.extend(outcome.live_ids.iter().copied());
            } else {
                report.failed_queries += 1;
            }

            if outcome.interrupted || !self.shutdown.sleep(self.delays.query_delay()).await {
                self.state = SchedulerState::ShuttingDown;
                report.interrupted = true;
                break;
            }
        }

        self.cycles += 1;

        let complete = !report.interrupted && report.queries_run > 0;
        if self.runner.prune_policy() == PrunePolicy::CycleUnion && complete {
            if report.failed_queries > 0 {
                log::debug!(
                    "Skipping cache cleanup: {} queries failed this cycle",
                    report.failed_queries
                );
            } else if live.is_empty() && !self.cache.is_empty() {
                log::warn!(
                    "⚠️  Skipping cache cleanup: every query returned nothing, keeping {} entries",
                    self.cache.len()
                );
            } else {
                report.pruned = self.cache.prune(&live);
                if report.pruned > 0 {
                    log::info!("🧹 Cache cleanup: removed {} outdated entries", report.pruned);
                    self.runner.persist(&self.cache);
                }
            }
        }

        report
    }

    fn observe_shutdown(&mut self) -> SchedulerState {
        if self.state == SchedulerState::Running && self.shutdown.is_requested() {
            log::info!("⚠️  Shutdown requested, no further queries will start");
            self.state = SchedulerState::ShuttingDown;
        }
        self.state
    }
}
