//! Configuration document loaded once at startup.
//!
//! Every query filter is optional: an absent field means "no filter", and so
//! does a filter with the wrong type or an unknown enum value (logged as a
//! warning). Outside the query filters a malformed value is a `ConfigError`.
//! Unknown keys are ignored everywhere.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config and cache files larger than this are refused at startup
pub const MAX_FILE_BYTES: u64 = 4_000_000;

pub const DEFAULT_QUERY_DELAY_SECS: u64 = 5;
pub const DEFAULT_LOOP_DELAY_SECS: u64 = 30;
pub const DEFAULT_ITEM_DELAY_MS: u64 = 300;

pub const DEFAULT_KUFAR_BASE_URL: &str = "https://api.kufar.by";
pub const DEFAULT_TELEGRAM_BASE_URL: &str = "https://api.telegram.org";

#[derive(Debug)]
pub enum ConfigError {
    Missing(PathBuf),
    TooLarge { path: PathBuf, size: u64 },
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(path) => write!(f, "File does not exist: {}", path.display()),
            ConfigError::TooLarge { path, size } => write!(
                f,
                "File {} is {} bytes, over the {} byte limit",
                path.display(),
                size,
                MAX_FILE_BYTES
            ),
            ConfigError::Io { path, source } => {
                write!(f, "Can't read file {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "Malformed configuration: {}", e),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Telegram bot credentials
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
    #[serde(default = "default_telegram_base_url")]
    pub base_url: String,
}

// Keeps the bot token out of logs
impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_telegram_base_url() -> String {
    DEFAULT_TELEGRAM_BASE_URL.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemCondition {
    Used,
    New,
}

impl ItemCondition {
    pub fn code(self) -> u8 {
        match self {
            ItemCondition::Used => 1,
            ItemCondition::New => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SellerType {
    Private,
    Company,
}

impl SellerType {
    pub fn code(self) -> u8 {
        match self {
            SellerType::Private => 0,
            SellerType::Company => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortType {
    Newest,
    Cheapest,
    MostExpensive,
}

impl SortType {
    pub fn code(self) -> &'static str {
        match self {
            SortType::Newest => "lst.d",
            SortType::Cheapest => "prc.a",
            SortType::MostExpensive => "prc.d",
        }
    }
}

/// Top-level marketplace categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    RealEstate,
    Transport,
    HomeAndGarden,
    Hobbies,
    Electronics,
    Computers,
    PhonesAndTablets,
}

impl Category {
    pub fn code(self) -> u32 {
        match self {
            Category::RealEstate => 1000,
            Category::Transport => 2000,
            Category::HomeAndGarden => 5000,
            Category::Hobbies => 12000,
            Category::Electronics => 15000,
            Category::Computers => 16000,
            Category::PhonesAndTablets => 17000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    Brest,
    Gomel,
    Grodno,
    Mogilev,
    MinskRegion,
    Vitebsk,
    Minsk,
}

impl Region {
    pub fn code(self) -> u8 {
        match self {
            Region::Brest => 1,
            Region::Gomel => 2,
            Region::Grodno => 3,
            Region::Mogilev => 4,
            Region::MinskRegion => 5,
            Region::Vitebsk => 6,
            Region::Minsk => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PriceRange {
    #[serde(default, deserialize_with = "lenient")]
    pub min: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub max: Option<i64>,
}

/// One user-authored marketplace query. Read-only after load.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QuerySpec {
    #[serde(default, deserialize_with = "lenient")]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub only_title_search: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<PriceRange>,
    #[serde(default, deserialize_with = "lenient")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub limit: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub condition: Option<ItemCondition>,
    #[serde(default, deserialize_with = "lenient")]
    pub seller_type: Option<SellerType>,
    #[serde(default, deserialize_with = "lenient")]
    pub kufar_delivery_required: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub kufar_payment_required: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub kufar_halva_required: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub only_with_photos: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub only_with_videos: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub only_with_exchange_available: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub sort_type: Option<SortType>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<Category>,
    #[serde(default, deserialize_with = "lenient")]
    pub sub_category: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub region: Option<Region>,
    #[serde(default, deserialize_with = "lenient")]
    pub areas: Option<Vec<u32>>,
}

/// Parse an optional filter, treating a malformed value as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }

    match T::deserialize(&value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            log::warn!("⚠️  Ignoring query filter value {}: {}", value, e);
            Ok(None)
        }
    }
}

impl QuerySpec {
    /// Name used in log lines
    pub fn label(&self) -> &str {
        self.tag.as_deref().unwrap_or("<untagged>")
    }
}

/// Delays applied by the scheduler and the query runner.
///
/// The whole object is optional, but when present `query` and `loop` are
/// both required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Delays {
    /// Seconds to wait after each query
    pub query: u64,
    /// Seconds to wait after each full cycle
    #[serde(rename = "loop")]
    pub cycle: u64,
    /// Milliseconds between consecutive listings of one query
    #[serde(default = "default_item_delay")]
    pub item_ms: u64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY_DELAY_SECS,
            cycle: DEFAULT_LOOP_DELAY_SECS,
            item_ms: DEFAULT_ITEM_DELAY_MS,
        }
    }
}

impl Delays {
    /// All delays zero, used by tests
    pub fn none() -> Self {
        Self {
            query: 0,
            cycle: 0,
            item_ms: 0,
        }
    }

    pub fn query_delay(&self) -> Duration {
        Duration::from_secs(self.query)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_ms)
    }
}

fn default_item_delay() -> u64 {
    DEFAULT_ITEM_DELAY_MS
}

/// When stale cache entries are evicted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrunePolicy {
    /// Cache entries are kept forever
    Never,
    /// Evict ids missing from one query's results after each fetch.
    /// Wrongly evicts listings when query result sets overlap.
    PerQuery,
    /// Evict ids missing from the union of all queries, once per cycle,
    /// and only when every query of the cycle fetched successfully
    #[default]
    CycleUnion,
}

/// Listing-source client settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KufarSettings {
    #[serde(default = "default_kufar_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for KufarSettings {
    fn default() -> Self {
        Self {
            base_url: default_kufar_base_url(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_kufar_base_url() -> String {
    DEFAULT_KUFAR_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

/// Whole configuration document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProgramConfig {
    pub telegram: TelegramConfig,
    pub queries: Vec<QuerySpec>,
    #[serde(default)]
    pub delays: Delays,
    #[serde(default)]
    pub cache_pruning: PrunePolicy,
    #[serde(default)]
    pub kufar: KufarSettings,
}

impl ProgramConfig {
    /// Parse and validate a configuration document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ProgramConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, applying the size guard
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = read_guarded(path)?.ok_or_else(|| ConfigError::Missing(path.to_path_buf()))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "telegram.bot-token cannot be empty".to_string(),
            ));
        }

        if self.kufar.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "kufar.timeout-seconds must be positive".to_string(),
            ));
        }

        for (index, query) in self.queries.iter().enumerate() {
            if let Some(PriceRange {
                min: Some(min),
                max: Some(max),
            }) = query.price
            {
                if min > max {
                    return Err(ConfigError::InvalidValue(format!(
                        "queries[{}]: price.min {} is above price.max {}",
                        index, min, max
                    )));
                }
            }
        }

        if self.queries.is_empty() {
            log::warn!("⚠️  Configuration has no queries, the loop will only sleep");
        }

        Ok(())
    }
}

/// Read a whole file, refusing anything over `MAX_FILE_BYTES`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_guarded(path: &Path) -> Result<Option<String>, ConfigError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if metadata.len() > MAX_FILE_BYTES {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
        });
    }

    fs::read_to_string(path).map(Some).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
