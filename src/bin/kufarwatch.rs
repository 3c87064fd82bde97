//! kufarwatch - Kufar listing alerts for Telegram
//!
//! Usage:
//!   kufarwatch [--config=<path>] [--cache=<path>] [--log=<path>]
//!
//! Omitted paths default to `kufar-configuration.json`, `cached-data.json`
//! and `kufarwatch.log` next to the executable.
//!
//! Environment variables:
//!   RUST_LOG - log filter (default: info)

use dotenv::dotenv;
use kufarwatch::{
    cli::{executable_dir, CliArgs},
    config::ProgramConfig,
    logging,
    notifier::TelegramNotifier,
    price_cache::JsonCacheFile,
    runner::QueryRunner,
    scheduler::SchedulerLoop,
    shutdown,
    source::KufarClient,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let args = CliArgs::from_env();
    let paths = match args.resolve(executable_dir().as_deref()) {
        Ok(paths) => paths,
        Err(e) => {
            logging::init(None);
            log::error!("❌ {}", e);
            return Err(e.into());
        }
    };

    logging::init(Some(&paths.log));

    log::info!("🚀 Starting kufarwatch v{}", env!("CARGO_PKG_VERSION"));
    for arg in &args.unknown {
        log::warn!("⚠️  Ignoring unknown argument: {}", arg);
    }
    log::info!("📊 Files:");
    log::info!("   ├─ Config: {}", paths.config.display());
    log::info!("   ├─ Cache: {}", paths.cache.display());
    log::info!("   └─ Log: {}", paths.log.display());

    log::info!("📂 Loading configuration file: {}", paths.config.display());
    let config = ProgramConfig::load_from(&paths.config).map_err(|e| {
        log::error!("❌ {}", e);
        e
    })?;

    let store = JsonCacheFile::new(&paths.cache);
    let cache = store.load().map_err(|e| {
        log::error!("❌ {}", e);
        e
    })?;

    log::info!("✅ Configuration loaded");
    log::info!("   ├─ Queries: {}", config.queries.len());
    log::info!("   ├─ Cached listings: {}", cache.len());
    log::info!("   ├─ Cache pruning: {:?}", config.cache_pruning);
    log::info!(
        "   └─ Delays: query {}s, loop {}s, item {}ms",
        config.delays.query,
        config.delays.cycle,
        config.delays.item_ms
    );

    let (trigger, shutdown) = shutdown::channel();
    shutdown::spawn_signal_listener(trigger);

    let source = KufarClient::new(&config.kufar, shutdown.clone())?;
    let notifier = TelegramNotifier::new(&config.telegram)?;

    let runner = QueryRunner::new(
        Box::new(source),
        Box::new(notifier),
        Box::new(store),
        config.delays.item_delay(),
        config.cache_pruning,
        shutdown.clone(),
    );

    let scheduler = SchedulerLoop::new(config.queries, runner, cache, config.delays, shutdown);

    log::info!("🔄 Press CTRL+C to shutdown gracefully");
    let cache = scheduler.run().await;

    log::info!("✅ kufarwatch stopped ({} listings cached)", cache.len());
    Ok(())
}
