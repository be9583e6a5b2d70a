//! Agent-facing tools
//!
//! Each tool declares a JSON Schema for its arguments and returns a
//! human-readable string, so an agent can call it without knowing the
//! crate's types. Tools are looked up by name in a fixed [`ToolRegistry`].

mod yield_options;

use crate::config::{Endpoints, Network};
use crate::ranking::YieldRanker;
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use ts_rs::TS;

pub use yield_options::{ListAllYieldOptionsTool, MorphoListVaultsTool, SparkYieldTool};

pub const TOOL_LIST_ALL_YIELD_OPTIONS: &str = "list_all_yield_options";
pub const TOOL_MORPHO_LIST_VAULTS: &str = "morpho_list_vaults";
pub const TOOL_GET_SPARK_YIELD: &str = "get_spark_yield";

/// Network used when a call does not name one
pub const DEFAULT_NETWORK: &str = "base-mainnet";

/// A capability exposed to the agent
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the accepted arguments
    fn input_schema(&self) -> Value;

    async fn invoke(&self, args: Value) -> Result<String>;
}

/// Arguments shared by every yield tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
#[serde(deny_unknown_fields)]
pub struct NetworkInput {
    /// Network to query, e.g. "base-mainnet". Defaults to Base.
    pub network: Option<String>,
}

impl NetworkInput {
    pub fn schema() -> Value {
        schemars::schema_for!(NetworkInput).to_value()
    }

    /// Parse tool arguments; `null` means no arguments
    pub fn from_args(args: Value) -> Result<Self> {
        if args.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(args).map_err(|e| Error::InvalidArgument(e.to_string()))
    }

    /// Resolve the requested network, rejecting any that is not configured
    pub fn network(&self, endpoints: &Endpoints) -> Result<Network> {
        let name = self.network.as_deref().unwrap_or(DEFAULT_NETWORK);
        let network: Network = name.parse()?;
        if !endpoints.supports(network) {
            return Err(Error::UnsupportedNetwork(name.to_string()));
        }
        Ok(network)
    }
}

/// Tools keyed by name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The yield tools, all backed by one ranker
    pub fn with_yield_tools(ranker: Arc<YieldRanker>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ListAllYieldOptionsTool::new(ranker.clone())));
        registry.register(Arc::new(MorphoListVaultsTool::new(ranker.clone())));
        registry.register(Arc::new(SparkYieldTool::new(ranker)));
        registry
    }

    /// Add a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    pub async fn invoke(&self, name: &str, args: Value) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        info!(tool = name, "Invoking tool");
        tool.invoke(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::graphql::mock::MockTransport;
    use crate::market::MarketEnricher;
    use crate::morpho::{fixtures, VaultRepository};
    use crate::query::CachedQueryClient;
    use crate::ranking::StaticYieldSource;
    use crate::scoring::QualityScorer;
    use alloy::primitives::Address;
    use serde_json::json;

    /// Ranker over an upstream with USDC but no vaults, plus Spark
    pub(super) fn test_ranker() -> (Arc<YieldRanker>, Arc<MockTransport>) {
        test_ranker_with_vaults(Vec::new())
    }

    /// Ranker over an upstream serving `vaults` for USDC, plus Spark.
    /// No Graph API key is set, so every reward token has no market data.
    pub(super) fn test_ranker_with_vaults(
        vaults: Vec<Value>,
    ) -> (Arc<YieldRanker>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new(move |_, query, _| {
            if query.contains("ListChainAssetVaults") {
                Ok(json!({
                    "vaults": {
                        "items": vaults,
                        "pageInfo": { "count": vaults.len(), "limit": 1000 }
                    }
                }))
            } else if query.contains("GetChainAssetByAddress") {
                Ok(json!({ "assets": { "items": [fixtures::asset(fixtures::MORPHO, "MORPHO")] } }))
            } else {
                Ok(json!({ "assets": { "items": [fixtures::asset(fixtures::USDC, "USDC")] } }))
            }
        }));
        let client = CachedQueryClient::new(transport.clone(), Arc::new(MemoryCache::new()));
        let mut endpoints = Endpoints::default().without_graph_api_key();
        endpoints.url_overrides.clear();
        let endpoints = Arc::new(endpoints);

        let ranker = YieldRanker::new(
            endpoints.clone(),
            VaultRepository::new(client.clone(), endpoints.clone()),
            MarketEnricher::from_subgraphs(endpoints, client),
            QualityScorer::default(),
        )
        .with_static_sources(vec![StaticYieldSource {
            name: "Spark.fi".to_string(),
            symbol: "SPARK".to_string(),
            address: Address::ZERO,
            apy: 12.5,
        }]);
        (Arc::new(ranker), transport)
    }

    #[test]
    fn test_registry_names() {
        let (ranker, _) = test_ranker();
        let registry = ToolRegistry::with_yield_tools(ranker);
        assert_eq!(
            registry.names(),
            vec![
                TOOL_GET_SPARK_YIELD,
                TOOL_LIST_ALL_YIELD_OPTIONS,
                TOOL_MORPHO_LIST_VAULTS
            ]
        );
        for tool in registry.tools() {
            assert!(!tool.description().is_empty());
            assert!(tool.input_schema()["properties"]["network"].is_object());
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("odos_swap", Value::Null).await;
        assert!(matches!(result, Err(Error::UnknownTool(_))));
    }

    #[test]
    fn test_network_input_defaults_to_base() {
        let endpoints = Endpoints::default();
        let input = tokio_test::assert_ok!(NetworkInput::from_args(Value::Null));
        assert_eq!(input.network(&endpoints).unwrap(), Network::Base);

        let input = NetworkInput::from_args(json!({ "network": "base-mainnet" })).unwrap();
        assert_eq!(input.network(&endpoints).unwrap(), Network::Base);
    }

    #[test]
    fn test_network_input_rejects_unsupported() {
        let endpoints = Endpoints::default();
        let input = NetworkInput::from_args(json!({ "network": "ethereum-mainnet" })).unwrap();
        assert!(matches!(
            input.network(&endpoints),
            Err(Error::UnsupportedNetwork(_))
        ));

        let input = NetworkInput::from_args(json!({ "network": "solana" })).unwrap();
        assert!(matches!(
            input.network(&endpoints),
            Err(Error::UnsupportedNetwork(_))
        ));
    }

    #[test]
    fn test_network_input_rejects_bad_args() {
        assert!(matches!(
            NetworkInput::from_args(json!({ "network": 8453 })),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            NetworkInput::from_args(json!({ "chain": "base" })),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_through_registry() {
        let (ranker, _) = test_ranker();
        let registry = ToolRegistry::with_yield_tools(ranker);
        let output = registry
            .invoke(TOOL_LIST_ALL_YIELD_OPTIONS, json!({ "network": "base" }))
            .await
            .unwrap();
        assert!(output.contains("Spark.fi"));
    }
}
