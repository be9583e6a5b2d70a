//! Risk-adjusted yield ranking
//!
//! Every reward line of a vault is discounted by the market quality of its
//! token, so a vault's risk-adjusted APY is its base APY plus the
//! quality-weighted rewards. Static sources that the vault pipeline cannot
//! discover are merged in unscored, and the combined list is sorted by
//! risk-adjusted APY, highest first.

use crate::cache::FileCache;
use crate::config::{Config, Endpoints};
use crate::graphql::HttpTransport;
use crate::market::{MarketEnricher, TokenMarketData};
use crate::morpho::{Asset, Vault, VaultRepository};
use crate::query::CachedQueryClient;
use crate::scoring::QualityScorer;
use crate::Result;
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use ts_rs::TS;

/// A yield source with a fixed, externally known APY
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticYieldSource {
    pub name: String,
    pub symbol: String,
    pub address: Address,
    pub apy: f64,
}

/// A vault reward with its market evidence and quality discount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct YieldOptionReward {
    pub asset: Asset,
    pub apy: f64,
    pub risk_adjusted_apy: f64,
    /// Effective quality, the better of the two market sources
    pub quality_factor: f64,
    #[serde(rename = "uniswapTotalValueLockedUSD")]
    pub uniswap_total_value_locked_usd: Option<f64>,
    #[serde(rename = "uniswapVolumeUSD")]
    pub uniswap_volume_usd: Option<f64>,
    #[serde(rename = "uniswapTxCount")]
    pub uniswap_tx_count: Option<u64>,
    #[serde(rename = "uniswapRiskFactor")]
    pub uniswap_risk_factor: f64,
    #[serde(rename = "aerodromeTotalValueLockedUSD")]
    pub aerodrome_total_value_locked_usd: Option<f64>,
    #[serde(rename = "aerodromeVolumeUSD")]
    pub aerodrome_volume_usd: Option<f64>,
    #[serde(rename = "aerodromeTxCount")]
    pub aerodrome_tx_count: Option<u64>,
    #[serde(rename = "aerodromeRiskFactor")]
    pub aerodrome_risk_factor: f64,
}

/// One ranked yield opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct YieldOption {
    pub name: String,
    pub symbol: String,
    #[ts(type = "string")]
    pub address: Address,
    pub total_deposits_usd: f64,
    pub total_deposits: f64,
    pub creation_date: DateTime<Utc>,
    pub total_apy: f64,
    pub base_apy: f64,
    pub risk_adjusted_apy: f64,
    pub rewards: Vec<YieldOptionReward>,
}

impl From<&StaticYieldSource> for YieldOption {
    fn from(source: &StaticYieldSource) -> Self {
        Self {
            name: source.name.clone(),
            symbol: source.symbol.clone(),
            address: source.address,
            total_deposits_usd: 0.0,
            total_deposits: 0.0,
            creation_date: DateTime::<Utc>::default(),
            total_apy: source.apy,
            base_apy: source.apy,
            risk_adjusted_apy: source.apy,
            rewards: Vec::new(),
        }
    }
}

/// Score every vault against the enriched market data
pub fn score_vaults(
    vaults: Vec<Vault>,
    market: &HashMap<Address, TokenMarketData>,
    scorer: &QualityScorer,
) -> Vec<YieldOption> {
    vaults
        .into_iter()
        .map(|vault| score_vault(vault, market, scorer))
        .collect()
}

fn score_vault(
    vault: Vault,
    market: &HashMap<Address, TokenMarketData>,
    scorer: &QualityScorer,
) -> YieldOption {
    let rewards: Vec<YieldOptionReward> = vault
        .reward_apys
        .into_iter()
        .map(|reward| {
            let data = market.get(&reward.asset.address);
            let uniswap = data.and_then(|d| d.uniswap.as_ref());
            let aerodrome = data.and_then(|d| d.aerodrome.as_ref());

            let uniswap_risk_factor = scorer.quality_factor(uniswap);
            let aerodrome_risk_factor = scorer.quality_factor(aerodrome);
            let quality_factor = scorer.effective_quality(uniswap, aerodrome);

            YieldOptionReward {
                risk_adjusted_apy: reward.apy * quality_factor,
                apy: reward.apy,
                asset: reward.asset,
                quality_factor,
                uniswap_total_value_locked_usd: uniswap.map(|s| s.total_value_locked_usd),
                uniswap_volume_usd: uniswap.map(|s| s.volume_usd),
                uniswap_tx_count: uniswap.map(|s| s.tx_count),
                uniswap_risk_factor,
                aerodrome_total_value_locked_usd: aerodrome.map(|s| s.total_value_locked_usd),
                aerodrome_volume_usd: aerodrome.map(|s| s.volume_usd),
                aerodrome_tx_count: aerodrome.map(|s| s.tx_count),
                aerodrome_risk_factor,
            }
        })
        .collect();

    let risk_adjusted_apy =
        vault.base_apy + rewards.iter().map(|r| r.risk_adjusted_apy).sum::<f64>();

    YieldOption {
        name: vault.name,
        symbol: vault.symbol,
        address: vault.address,
        total_deposits_usd: vault.total_deposits_usd,
        total_deposits: vault.total_deposits,
        creation_date: DateTime::<Utc>::from_timestamp(vault.creation_timestamp, 0).unwrap_or_default(),
        total_apy: vault.total_apy,
        base_apy: vault.base_apy,
        risk_adjusted_apy,
        rewards,
    }
}

/// Highest risk-adjusted APY first; ties keep their current order
pub fn sort_by_risk_adjusted_apy(options: &mut [YieldOption]) {
    options.sort_by(|a, b| b.risk_adjusted_apy.total_cmp(&a.risk_adjusted_apy));
}

/// Builds the ranked list of yield options for a chain
#[derive(Clone)]
pub struct YieldRanker {
    endpoints: Arc<Endpoints>,
    repository: VaultRepository,
    enricher: MarketEnricher,
    scorer: QualityScorer,
    static_sources: Vec<StaticYieldSource>,
    base_asset_symbol: String,
}

impl YieldRanker {
    pub fn new(
        endpoints: Arc<Endpoints>,
        repository: VaultRepository,
        enricher: MarketEnricher,
        scorer: QualityScorer,
    ) -> Self {
        Self {
            endpoints,
            repository,
            enricher,
            scorer,
            static_sources: Vec::new(),
            base_asset_symbol: "USDC".to_string(),
        }
    }

    /// Wire the HTTP transport, file cache and subgraph sources from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.request_timeout())?);
        let cache = Arc::new(FileCache::new(&config.cache.dir));
        let client =
            CachedQueryClient::new(transport, cache).with_default_expiry(config.cache.expiry());
        let endpoints = Arc::new(config.endpoints.clone());

        let repository = VaultRepository::new(client.clone(), endpoints.clone());
        let enricher = MarketEnricher::from_subgraphs(endpoints.clone(), client);

        Ok(Self::new(
            endpoints,
            repository,
            enricher,
            QualityScorer::new(config.scoring.clone()),
        )
        .with_static_sources(config.static_sources.clone())
        .with_base_asset_symbol(&config.base_asset_symbol))
    }

    pub fn with_static_sources(mut self, sources: Vec<StaticYieldSource>) -> Self {
        self.static_sources = sources;
        self
    }

    pub fn with_base_asset_symbol(mut self, symbol: &str) -> Self {
        self.base_asset_symbol = symbol.to_string();
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn repository(&self) -> &VaultRepository {
        &self.repository
    }

    pub fn enricher(&self) -> &MarketEnricher {
        &self.enricher
    }

    /// Scored Morpho vaults for the base asset, best first
    pub async fn list_protocol_yield_options(&self, chain_id: u64) -> Result<Vec<YieldOption>> {
        let base_asset = self
            .repository
            .get_asset_by_symbol(chain_id, &self.base_asset_symbol)
            .await?;
        let vaults = self
            .repository
            .list_vaults(chain_id, base_asset.address)
            .await?;

        let reward_assets: Vec<Address> = vaults
            .iter()
            .flat_map(|vault| vault.reward_apys.iter().map(|r| r.asset.address))
            .collect();
        let market = self.enricher.enrich(&reward_assets, chain_id).await;

        let mut options = score_vaults(vaults, &market, &self.scorer);
        sort_by_risk_adjusted_apy(&mut options);
        Ok(options)
    }

    /// Configured static sources, best first
    pub async fn list_static_yield_options(&self, chain_id: u64) -> Result<Vec<YieldOption>> {
        self.endpoints.network_for_chain(chain_id)?;
        let mut options: Vec<YieldOption> =
            self.static_sources.iter().map(YieldOption::from).collect();
        sort_by_risk_adjusted_apy(&mut options);
        Ok(options)
    }

    /// All yield options for a chain, best first
    ///
    /// Fails if either the vault pipeline or the static sources fail; only
    /// individual token lookups degrade silently.
    pub async fn rank_yield_options(&self, chain_id: u64) -> Result<Vec<YieldOption>> {
        let (protocol_options, static_options) = futures::try_join!(
            self.list_protocol_yield_options(chain_id),
            self.list_static_yield_options(chain_id),
        )?;

        let mut options = protocol_options;
        options.extend(static_options);
        sort_by_risk_adjusted_apy(&mut options);

        info!(
            chain_id,
            count = options.len(),
            best = options.first().map(|o| o.name.as_str()).unwrap_or("-"),
            "Ranked yield options"
        );
        Ok(options)
    }
}
