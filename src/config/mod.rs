//! Configuration for the yield ranker

pub mod endpoints;

use crate::ranking::StaticYieldSource;
use crate::scoring::ScoringThresholds;
use crate::{Error, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// Re-export endpoint config
pub use endpoints::{Endpoints, SubgraphIds};

/// The Graph API key environment variable name
pub const GRAPH_API_KEY_ENV: &str = "GRAPH_API_KEY";

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Arbitrum,
    Optimism,
    Base,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Arbitrum => 42161,
            Network::Optimism => 10,
            Network::Base => 8453,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
            Network::Base => "base",
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Network::Ethereum),
            42161 => Some(Network::Arbitrum),
            10 => Some(Network::Optimism),
            8453 => Some(Network::Base),
            _ => None,
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ethereum" | "mainnet" | "ethereum-mainnet" => Ok(Network::Ethereum),
            "arbitrum" | "arbitrum-mainnet" => Ok(Network::Arbitrum),
            "optimism" | "optimism-mainnet" => Ok(Network::Optimism),
            "base" | "base-mainnet" => Ok(Network::Base),
            _ => Err(Error::UnsupportedNetwork(s.to_string())),
        }
    }
}

/// Upstream data providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Morpho,
    UniswapV3,
    Aerodrome,
}

impl Protocol {
    /// Name used as the cache source prefix
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Morpho => "morpho",
            Protocol::UniswapV3 => "uniswap",
            Protocol::Aerodrome => "aerodrome",
        }
    }
}

/// On-disk response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one JSON file per cache entry
    pub dir: PathBuf,
    /// Entries older than this are refetched
    pub expiry_secs: u64,
}

impl CacheConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
            expiry_secs: 3600, // 1 hour
        }
    }
}

fn default_static_sources() -> Vec<StaticYieldSource> {
    vec![StaticYieldSource {
        name: "Spark.fi".to_string(),
        symbol: "SPARK".to_string(),
        address: Address::ZERO,
        apy: 12.5,
    }]
}

fn default_base_asset_symbol() -> String {
    "USDC".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upstream endpoints
    #[serde(default)]
    pub endpoints: Endpoints,
    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Reward token quality thresholds
    #[serde(default)]
    pub scoring: ScoringThresholds,
    /// Yield sources that cannot be discovered through the vault pipeline
    #[serde(default = "default_static_sources")]
    pub static_sources: Vec<StaticYieldSource>,
    /// Symbol of the asset whose vaults are ranked
    #[serde(default = "default_base_asset_symbol")]
    pub base_asset_symbol: String,
    /// Total timeout for a single upstream request (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.endpoints.validate()?;
        self.scoring.validate()?;
        if self.base_asset_symbol.is_empty() {
            return Err(Error::Config("base_asset_symbol must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            cache: CacheConfig::default(),
            scoring: ScoringThresholds::default(),
            static_sources: default_static_sources(),
            base_asset_symbol: default_base_asset_symbol(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
