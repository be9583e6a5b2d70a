//! Reward token market data
//!
//! Each reward token is looked up on two DEX subgraphs (Uniswap V3 and
//! Aerodrome). Lookups for one source run as a single concurrent batch and the
//! two batches run side by side. A failed lookup only blanks that
//! `(token, source)` pair; it never affects sibling lookups.

use crate::config::{Endpoints, Protocol};
use crate::graphql::{de, queries};
use crate::query::{CachedQueryClient, QueryRequest};
use crate::tokens;
use crate::{Error, Result};
use alloy::primitives::Address;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Token record from a DEX subgraph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMarketSnapshot {
    /// Subgraphs key tokens by lowercased address in `id`
    #[serde(alias = "id")]
    pub address: Address,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "de::u64_from_any")]
    pub decimals: u64,
    #[serde(default, deserialize_with = "de::string_from_any")]
    pub total_supply: String,
    #[serde(default, deserialize_with = "de::f64_from_any")]
    pub volume: f64,
    #[serde(rename = "volumeUSD", default, deserialize_with = "de::f64_from_any")]
    pub volume_usd: f64,
    #[serde(
        rename = "untrackedVolumeUSD",
        default,
        deserialize_with = "de::f64_from_any"
    )]
    pub untracked_volume_usd: f64,
    #[serde(rename = "feesUSD", default, deserialize_with = "de::f64_from_any")]
    pub fees_usd: f64,
    #[serde(default, deserialize_with = "de::u64_from_any")]
    pub tx_count: u64,
    #[serde(default, deserialize_with = "de::u64_from_any")]
    pub pool_count: u64,
    #[serde(default, deserialize_with = "de::f64_from_any")]
    pub total_value_locked: f64,
    #[serde(
        rename = "totalValueLockedUSD",
        default,
        deserialize_with = "de::f64_from_any"
    )]
    pub total_value_locked_usd: f64,
    #[serde(rename = "derivedETH", default, deserialize_with = "de::f64_from_any")]
    pub derived_eth: f64,
}

/// A source of per-token market data
#[async_trait]
pub trait TokenMarketSource: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Fails with `NotFound` when the source has no record of the token
    async fn token_by_address(&self, chain_id: u64, address: Address)
        -> Result<TokenMarketSnapshot>;
}

/// Token lookups against a Uniswap V3 style subgraph
pub struct SubgraphTokenSource {
    protocol: Protocol,
    endpoints: Arc<Endpoints>,
    client: CachedQueryClient,
}

impl SubgraphTokenSource {
    pub fn new(protocol: Protocol, endpoints: Arc<Endpoints>, client: CachedQueryClient) -> Self {
        Self {
            protocol,
            endpoints,
            client,
        }
    }
}

#[async_trait]
impl TokenMarketSource for SubgraphTokenSource {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn token_by_address(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<TokenMarketSnapshot> {
        let network = self.endpoints.network_for_chain(chain_id)?;
        let url = self.endpoints.url(network, self.protocol)?;
        let id = tokens::lower_hex(&address);

        let request = QueryRequest::new(self.protocol.name(), "tokens", url, queries::GET_TOKEN)
            .variable("tokenAddress", id.clone())
            .cache_qualifier(format!("token-{}", id))
            .single_page();

        let hit = self.client.fetch(request).await?.into_iter().find(|item| {
            let raw = de::raw_address(item, "id").or_else(|| de::raw_address(item, "address"));
            raw == Some(address)
        });
        if let Some(item) = hit {
            return Ok(serde_json::from_value(item)?);
        }

        Err(Error::NotFound(format!(
            "token {} on {}",
            id,
            self.protocol.name()
        )))
    }
}

/// Market data for one token from both sources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenMarketData {
    pub uniswap: Option<TokenMarketSnapshot>,
    pub aerodrome: Option<TokenMarketSnapshot>,
}

/// Fans token lookups out over both DEX sources
#[derive(Clone)]
pub struct MarketEnricher {
    uniswap: Arc<dyn TokenMarketSource>,
    aerodrome: Arc<dyn TokenMarketSource>,
}

impl MarketEnricher {
    pub fn new(uniswap: Arc<dyn TokenMarketSource>, aerodrome: Arc<dyn TokenMarketSource>) -> Self {
        Self { uniswap, aerodrome }
    }

    /// Build an enricher backed by the configured subgraphs
    pub fn from_subgraphs(endpoints: Arc<Endpoints>, client: CachedQueryClient) -> Self {
        Self::new(
            Arc::new(SubgraphTokenSource::new(
                Protocol::UniswapV3,
                endpoints.clone(),
                client.clone(),
            )),
            Arc::new(SubgraphTokenSource::new(
                Protocol::Aerodrome,
                endpoints,
                client,
            )),
        )
    }

    /// Look up every distinct address on both sources
    ///
    /// Every input address is present in the result; failed lookups are `None`.
    pub async fn enrich(
        &self,
        addresses: &[Address],
        chain_id: u64,
    ) -> HashMap<Address, TokenMarketData> {
        let mut seen = HashSet::new();
        let unique: Vec<Address> = addresses
            .iter()
            .copied()
            .filter(|address| seen.insert(*address))
            .collect();

        let (uniswap, aerodrome) = futures::join!(
            lookup_batch(self.uniswap.as_ref(), &unique, chain_id),
            lookup_batch(self.aerodrome.as_ref(), &unique, chain_id),
        );

        let enriched: HashMap<Address, TokenMarketData> = unique
            .into_iter()
            .zip(uniswap.into_iter().zip(aerodrome))
            .map(|(address, (uniswap, aerodrome))| {
                (address, TokenMarketData { uniswap, aerodrome })
            })
            .collect();

        debug!(chain_id, count = enriched.len(), "Enriched reward tokens");
        enriched
    }

    /// Market data for a single token
    pub async fn token(&self, chain_id: u64, address: Address) -> TokenMarketData {
        self.enrich(&[address], chain_id)
            .await
            .remove(&address)
            .unwrap_or_default()
    }
}

/// One lookup per address, results in input order
async fn lookup_batch(
    source: &dyn TokenMarketSource,
    addresses: &[Address],
    chain_id: u64,
) -> Vec<Option<TokenMarketSnapshot>> {
    let lookups = addresses
        .iter()
        .map(|address| source.token_by_address(chain_id, *address));

    join_all(lookups)
        .await
        .into_iter()
        .zip(addresses)
        .map(|(result, address)| match result {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(
                    source = source.protocol().name(),
                    address = %address,
                    error = %e,
                    "Token lookup failed"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory market sources for tests

    use super::*;
    use std::time::Duration;

    pub(crate) struct FakeSource {
        protocol: Protocol,
        snapshots: HashMap<Address, TokenMarketSnapshot>,
        failing: HashSet<Address>,
        /// Earlier addresses answer later, to shuffle completion order
        staggered: bool,
    }

    impl FakeSource {
        pub(crate) fn new(protocol: Protocol) -> Self {
            Self {
                protocol,
                snapshots: HashMap::new(),
                failing: HashSet::new(),
                staggered: false,
            }
        }

        pub(crate) fn with_token(mut self, address: Address, tvl: f64, volume: f64, tx: u64) -> Self {
            self.snapshots.insert(
                address,
                TokenMarketSnapshot {
                    address,
                    total_value_locked_usd: tvl,
                    volume_usd: volume,
                    tx_count: tx,
                    ..TokenMarketSnapshot::default()
                },
            );
            self
        }

        pub(crate) fn failing_on(mut self, address: Address) -> Self {
            self.failing.insert(address);
            self
        }

        pub(crate) fn staggered(mut self) -> Self {
            self.staggered = true;
            self
        }
    }

    #[async_trait]
    impl TokenMarketSource for FakeSource {
        fn protocol(&self) -> Protocol {
            self.protocol
        }

        async fn token_by_address(
            &self,
            _chain_id: u64,
            address: Address,
        ) -> Result<TokenMarketSnapshot> {
            if self.staggered {
                let delay = 50u64.saturating_sub(u64::from(address.as_slice()[19]) * 10);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.failing.contains(&address) {
                return Err(Error::GraphQL("upstream unavailable".to_string()));
            }
            self.snapshots
                .get(&address)
                .cloned()
                .ok_or_else(|| Error::NotFound(address.to_string()))
        }
    }
}
