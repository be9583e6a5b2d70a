//! Morpho vault repository
//!
//! Loads assets and vaults from the Morpho GraphQL API and normalizes them
//! into [`Vault`]s. Vaults carrying any warning are dropped. The difference
//! between a vault's net APY and its base APY that is not explained by the
//! listed reward tokens is attributed to the MORPHO token and prepended to
//! the vault's rewards.

use crate::config::{Endpoints, Protocol};
use crate::graphql::{de, queries};
use crate::query::{CachedQueryClient, QueryRequest};
use crate::tokens;
use crate::{Error, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use ts_rs::TS;

/// Token metadata as reported by the Morpho API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[ts(type = "string")]
    pub address: Address,
    pub decimals: u8,
    pub name: String,
    pub symbol: String,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
    /// Raw integer supply in the token's smallest unit
    #[serde(deserialize_with = "de::string_from_any")]
    pub total_supply: String,
    #[serde(default, deserialize_with = "de::opt_f64_from_any")]
    pub price_usd: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_from_any")]
    pub oracle_price_usd: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_from_any")]
    pub spot_price_eth: Option<f64>,
}

/// One reward stream paid by a vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultReward {
    pub asset: Asset,
    /// Raw annualized yield contribution, before any quality adjustment
    pub apy: f64,
}

/// A normalized, warning-free vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub name: String,
    pub symbol: String,
    pub address: Address,
    pub total_deposits_usd: f64,
    pub total_deposits: f64,
    pub creation_timestamp: i64,
    pub total_apy: f64,
    pub base_apy: f64,
    /// Protocol reward first, then one entry per listed reward token
    pub reward_apys: Vec<VaultReward>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVault {
    name: String,
    symbol: String,
    address: Address,
    #[serde(deserialize_with = "de::i64_from_any")]
    creation_timestamp: i64,
    state: RawVaultState,
    #[serde(default)]
    warnings: Vec<RawWarning>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVaultState {
    #[serde(deserialize_with = "de::f64_from_any")]
    total_assets: f64,
    #[serde(deserialize_with = "de::f64_from_any")]
    total_assets_usd: f64,
    #[serde(deserialize_with = "de::f64_from_any")]
    net_apy: f64,
    #[serde(deserialize_with = "de::f64_from_any")]
    net_apy_without_rewards: f64,
    #[serde(default)]
    rewards: Vec<RawVaultReward>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVaultReward {
    asset: Asset,
    #[serde(deserialize_with = "de::f64_from_any")]
    supply_apr: f64,
}

#[derive(Debug, Deserialize)]
struct RawWarning {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    level: Option<String>,
}

/// Reads assets and vaults from the Morpho API
#[derive(Clone)]
pub struct VaultRepository {
    client: CachedQueryClient,
    endpoints: Arc<Endpoints>,
}

impl VaultRepository {
    pub fn new(client: CachedQueryClient, endpoints: Arc<Endpoints>) -> Self {
        Self { client, endpoints }
    }

    fn api_url(&self, chain_id: u64) -> Result<String> {
        let network = self.endpoints.network_for_chain(chain_id)?;
        self.endpoints.url(network, Protocol::Morpho)
    }

    /// Look up an asset by its exact symbol (case-insensitive)
    pub async fn get_asset_by_symbol(&self, chain_id: u64, symbol: &str) -> Result<Asset> {
        let request = QueryRequest::new(
            Protocol::Morpho.name(),
            "assets",
            self.api_url(chain_id)?,
            queries::GET_CHAIN_ASSET,
        )
        .variable("chainId", chain_id)
        .variable("assetSymbol", symbol)
        .cache_qualifier(format!("asset-{}", symbol));

        let items = self.client.fetch(request).await?;
        find_asset(items, |item| {
            item.get("symbol")
                .and_then(Value::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case(symbol))
        })?
            .ok_or_else(|| Error::NotFound(format!("asset {} on chain {}", symbol, chain_id)))
    }

    /// Look up an asset by address
    pub async fn get_asset_by_address(&self, chain_id: u64, address: Address) -> Result<Asset> {
        let request = QueryRequest::new(
            Protocol::Morpho.name(),
            "assets",
            self.api_url(chain_id)?,
            queries::GET_CHAIN_ASSET_BY_ADDRESS,
        )
        .variable("chainId", chain_id)
        .variable("assetAddress", address.to_string())
        .cache_qualifier(format!("asset-{}", tokens::lower_hex(&address)));

        let items = self.client.fetch(request).await?;
        find_asset(items, |item| de::raw_address(item, "address") == Some(address))?
            .ok_or_else(|| Error::NotFound(format!("asset {} on chain {}", address, chain_id)))
    }

    /// List warning-free vaults for a base asset, largest deposits first
    pub async fn list_vaults(&self, chain_id: u64, base_asset: Address) -> Result<Vec<Vault>> {
        let request = QueryRequest::new(
            Protocol::Morpho.name(),
            "vaults",
            self.api_url(chain_id)?,
            queries::LIST_CHAIN_ASSET_VAULTS,
        )
        .variable("chainId", chain_id)
        .variable("assetAddress", base_asset.to_string())
        .cache_qualifier(format!("vaults-{}", tokens::lower_hex(&base_asset)));

        let raw_vaults: Vec<RawVault> = self
            .client
            .fetch(request)
            .await?
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<_, _>>()?;
        info!(chain_id, count = raw_vaults.len(), "Loaded vaults");

        let reward_asset_address = tokens::protocol_reward_asset(chain_id).ok_or_else(|| {
            Error::UnsupportedNetwork(format!("no protocol reward token for chain {}", chain_id))
        })?;
        let reward_asset = self
            .get_asset_by_address(chain_id, reward_asset_address)
            .await?;

        Ok(normalize_vaults(raw_vaults, &reward_asset))
    }
}

/// Decode the first item whose raw fields match; other items are never decoded
fn find_asset(items: Vec<Value>, matches: impl Fn(&Value) -> bool) -> Result<Option<Asset>> {
    items
        .into_iter()
        .find(|item| matches(item))
        .map(serde_json::from_value)
        .transpose()
        .map_err(Into::into)
}

fn normalize_vaults(raw_vaults: Vec<RawVault>, reward_asset: &Asset) -> Vec<Vault> {
    let mut retained: Vec<RawVault> = raw_vaults
        .into_iter()
        .filter(|vault| {
            if vault.warnings.is_empty() {
                return true;
            }
            debug!(
                vault = %vault.address,
                warnings = ?vault
                    .warnings
                    .iter()
                    .map(|w| format!("{}:{}", w.kind, w.level.as_deref().unwrap_or("?")))
                    .collect::<Vec<_>>(),
                "Skipping vault with warnings"
            );
            false
        })
        .collect();

    // Stable, so equal deposits keep upstream order
    retained.sort_by(|a, b| b.state.total_assets_usd.total_cmp(&a.state.total_assets_usd));

    retained
        .into_iter()
        .map(|vault| normalize_vault(vault, reward_asset))
        .collect()
}

fn normalize_vault(vault: RawVault, reward_asset: &Asset) -> Vault {
    let state = vault.state;
    // Upstream reports reward tokens as APR while net APY is compounded; the
    // subtraction mixes the two, see DESIGN.md.
    let listed_rewards: f64 = state.rewards.iter().map(|r| r.supply_apr).sum();
    let protocol_reward_apy = state.net_apy - state.net_apy_without_rewards - listed_rewards;

    let reward_apys = std::iter::once(VaultReward {
        asset: reward_asset.clone(),
        apy: protocol_reward_apy,
    })
    .chain(state.rewards.into_iter().map(|reward| VaultReward {
        asset: reward.asset,
        apy: reward.supply_apr,
    }))
    .collect();

    Vault {
        name: vault.name,
        symbol: vault.symbol,
        address: vault.address,
        total_deposits_usd: state.total_assets_usd,
        total_deposits: state.total_assets,
        creation_timestamp: vault.creation_timestamp,
        total_apy: state.net_apy,
        base_apy: state.net_apy_without_rewards,
        reward_apys,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Morpho API response fragments shared by tests

    use serde_json::{json, Value};

    pub(crate) const USDC: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
    pub(crate) const MORPHO: &str = "0xBAa5CC21fd487B8Fcc2F632f3F4E8D37262a0842";
    pub(crate) const WELL: &str = "0xA88594D404727625A9437C3f886C7643872296AE";

    pub(crate) fn asset(address: &str, symbol: &str) -> Value {
        json!({
            "address": address,
            "decimals": 18,
            "name": symbol,
            "symbol": symbol,
            "logoURI": null,
            "totalSupply": "1000000000000000000000000",
            "priceUsd": 1.5,
            "oraclePriceUsd": null,
            "spotPriceEth": "0.0005"
        })
    }

    pub(crate) fn vault(
        address: &str,
        total_assets_usd: f64,
        net_apy: f64,
        base_apy: f64,
        rewards: Value,
        warnings: Value,
    ) -> Value {
        json!({
            "name": format!("Vault {}", &address[..6]),
            "symbol": "mvUSDC",
            "address": address,
            "creationTimestamp": 1_700_000_000,
            "state": {
                "totalAssets": "1000000",
                "totalAssetsUsd": total_assets_usd,
                "fee": 0.1,
                "netApyWithoutRewards": base_apy,
                "netApy": net_apy,
                "rewards": rewards
            },
            "warnings": warnings
        })
    }
}
