use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub auction: AuctionConfig,
    pub snipe: SnipeConfig,
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuctionConfig {
    /// Number of items biddable at the same time
    #[serde(default = "default_active_slots")]
    pub active_slots: usize,
    /// Bidding window per item, before extensions
    pub duration_secs: u64,
    /// Minimum amount a bid must exceed the current price by
    pub min_increment: Decimal,
    /// Per-bidder cooldown between bid submissions
    #[serde(default = "default_bid_cooldown_ms")]
    pub bid_cooldown_ms: u64,
    /// Bounded retries against commit conflicts before surfacing Outbid
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
}

fn default_active_slots() -> usize {
    3
}

fn default_bid_cooldown_ms() -> u64 {
    1000
}

fn default_max_commit_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnipeConfig {
    /// Trailing window inside which a bid triggers an extension
    #[serde(default = "default_snipe_secs")]
    pub window_secs: u64,
    /// How far past now a qualifying bid pushes the deadline
    #[serde(default = "default_snipe_secs")]
    pub extension_secs: u64,
    /// Cap on total extension past the natural end (None = uncapped)
    #[serde(default = "default_max_total_extension")]
    pub max_total_extension_secs: Option<u64>,
}

fn default_snipe_secs() -> u64 {
    15
}

fn default_max_total_extension() -> Option<u64> {
    Some(600)
}

impl Default for SnipeConfig {
    fn default() -> Self {
        Self {
            window_secs: default_snipe_secs(),
            extension_secs: default_snipe_secs(),
            max_total_extension_secs: default_max_total_extension(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Interval between sweep cycles (seconds)
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
    /// Maximum expired items to settle per cycle
    #[serde(default = "default_max_items_per_cycle")]
    pub max_items_per_cycle: usize,
}

fn default_sweep_interval() -> u64 {
    2
}

fn default_max_items_per_cycle() -> usize {
    20
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
            max_items_per_cycle: default_max_items_per_cycle(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL for the append-only audit log
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("auction.active_slots", 3)?
            .set_default("sweeper.interval_secs", 2)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("GAVEL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (GAVEL_AUCTION__DURATION_SECS, etc.)
            .add_source(
                Environment::with_prefix("GAVEL")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI and test usage
    pub fn default_config() -> Self {
        use rust_decimal_macros::dec;

        Self {
            auction: AuctionConfig {
                active_slots: 3,
                duration_secs: 300,
                min_increment: dec!(100_000),
                bid_cooldown_ms: 1000,
                max_commit_attempts: 3,
            },
            snipe: SnipeConfig::default(),
            sweeper: SweeperConfig::default(),
            database: None,
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.auction.active_slots == 0 {
            errors.push("auction.active_slots must be at least 1".to_string());
        }

        if self.auction.duration_secs == 0 {
            errors.push("auction.duration_secs must be positive".to_string());
        }

        if self.auction.min_increment <= Decimal::ZERO {
            errors.push("auction.min_increment must be positive".to_string());
        }

        if self.auction.max_commit_attempts == 0 {
            errors.push("auction.max_commit_attempts must be at least 1".to_string());
        }

        if self.snipe.extension_secs == 0 {
            errors.push("snipe.extension_secs must be positive".to_string());
        }

        if let Some(cap) = self.snipe.max_total_extension_secs {
            if cap < self.snipe.extension_secs {
                errors.push(
                    "snipe.max_total_extension_secs must be at least one extension".to_string(),
                );
            }
        }

        if self.sweeper.interval_secs == 0 {
            errors.push("sweeper.interval_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
