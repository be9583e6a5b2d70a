//! Yield discovery tools

use super::{
    NetworkInput, Tool, TOOL_GET_SPARK_YIELD, TOOL_LIST_ALL_YIELD_OPTIONS,
    TOOL_MORPHO_LIST_VAULTS,
};
use crate::ranking::YieldRanker;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Every yield option on a network, ranked by risk-adjusted APY
pub struct ListAllYieldOptionsTool {
    ranker: Arc<YieldRanker>,
}

impl ListAllYieldOptionsTool {
    pub fn new(ranker: Arc<YieldRanker>) -> Self {
        Self { ranker }
    }
}

#[async_trait]
impl Tool for ListAllYieldOptionsTool {
    fn name(&self) -> &'static str {
        TOOL_LIST_ALL_YIELD_OPTIONS
    }

    fn description(&self) -> &'static str {
        "List all yield options for the base asset, best first. Each option carries \
         its base APY, its reward APYs and a risk-adjusted APY that discounts every \
         reward by the market depth of the reward token."
    }

    fn input_schema(&self) -> Value {
        NetworkInput::schema()
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        let network = NetworkInput::from_args(args)?.network(self.ranker.endpoints())?;
        let options = self.ranker.rank_yield_options(network.chain_id()).await?;
        Ok(format!(
            "Found {} yield options on {}, ranked by risk-adjusted APY:\n{}",
            options.len(),
            network.name(),
            serde_json::to_string_pretty(&options)?
        ))
    }
}

/// Morpho vaults for the base asset, scored and ranked by risk-adjusted APY
pub struct MorphoListVaultsTool {
    ranker: Arc<YieldRanker>,
}

impl MorphoListVaultsTool {
    pub fn new(ranker: Arc<YieldRanker>) -> Self {
        Self { ranker }
    }
}

#[async_trait]
impl Tool for MorphoListVaultsTool {
    fn name(&self) -> &'static str {
        TOOL_MORPHO_LIST_VAULTS
    }

    fn description(&self) -> &'static str {
        "List Morpho vaults that accept the base asset, best first by risk-adjusted \
         APY. Each reward carries the market quality of its token. Vaults flagged \
         with warnings are left out."
    }

    fn input_schema(&self) -> Value {
        NetworkInput::schema()
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        let network = NetworkInput::from_args(args)?.network(self.ranker.endpoints())?;
        let vaults = self
            .ranker
            .list_protocol_yield_options(network.chain_id())
            .await?;

        Ok(format!(
            "Found {} Morpho vaults on {}, ranked by risk-adjusted APY:\n{}",
            vaults.len(),
            network.name(),
            serde_json::to_string_pretty(&vaults)?
        ))
    }
}

/// The Spark savings rate
pub struct SparkYieldTool {
    ranker: Arc<YieldRanker>,
}

impl SparkYieldTool {
    pub fn new(ranker: Arc<YieldRanker>) -> Self {
        Self { ranker }
    }
}

#[async_trait]
impl Tool for SparkYieldTool {
    fn name(&self) -> &'static str {
        TOOL_GET_SPARK_YIELD
    }

    fn description(&self) -> &'static str {
        "Get the current Spark yield for the base asset."
    }

    fn input_schema(&self) -> Value {
        NetworkInput::schema()
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        let network = NetworkInput::from_args(args)?.network(self.ranker.endpoints())?;
        let spark = self
            .ranker
            .list_static_yield_options(network.chain_id())
            .await?
            .into_iter()
            .find(|option| option.symbol.eq_ignore_ascii_case("SPARK"))
            .ok_or_else(|| Error::NotFound(format!("Spark yield on {}", network.name())))?;

        Ok(format!(
            "{} pays {}% APY on {}:\n{}",
            spark.name,
            spark.base_apy,
            network.name(),
            serde_json::to_string_pretty(&spark)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{test_ranker, test_ranker_with_vaults};
    use super::*;
    use crate::morpho::fixtures;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_all_yield_options() {
        let tool = ListAllYieldOptionsTool::new(test_ranker().0);
        let output = tool.invoke(Value::Null).await.unwrap();
        assert!(output.starts_with("Found 1 yield options on base"));
        assert!(output.contains("\"riskAdjustedApy\": 12.5"));
    }

    #[tokio::test]
    async fn test_morpho_list_vaults() {
        let (ranker, transport) = test_ranker();
        let tool = MorphoListVaultsTool::new(ranker);
        let output = tool.invoke(json!({})).await.unwrap();
        assert!(output.starts_with("Found 0 Morpho vaults on base, ranked by risk-adjusted APY"));
        assert!(!output.contains("Spark.fi"));
        assert!(transport.call_count() >= 2);
    }

    #[tokio::test]
    async fn test_morpho_list_vaults_ranks_by_risk_adjusted_apy() {
        let large = "0x1000000000000000000000000000000000000001";
        let small = "0x1000000000000000000000000000000000000002";
        // The large vault's yield is almost all MORPHO rewards, which score
        // zero without market data; the small one pays a plain 5%.
        let (ranker, _) = test_ranker_with_vaults(vec![
            fixtures::vault(large, 1000.0, 0.50, 0.01, json!([]), json!([])),
            fixtures::vault(small, 10.0, 0.05, 0.05, json!([]), json!([])),
        ]);
        let tool = MorphoListVaultsTool::new(ranker);
        let output = tool.invoke(Value::Null).await.unwrap();

        assert!(output.starts_with("Found 2 Morpho vaults on base"));
        assert!(output.contains("\"riskAdjustedApy\""));
        assert!(output.contains("\"qualityFactor\": 0.0"));
        let small_at = output.find(small).unwrap();
        let large_at = output.find(large).unwrap();
        assert!(small_at < large_at);
    }

    #[tokio::test]
    async fn test_spark_yield() {
        let (ranker, transport) = test_ranker();
        let tool = SparkYieldTool::new(ranker);
        let output = tool
            .invoke(json!({ "network": "base-mainnet" }))
            .await
            .unwrap();
        assert!(output.starts_with("Spark.fi pays 12.5% APY on base"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_network_makes_no_calls() {
        let (ranker, transport) = test_ranker();
        let tool = ListAllYieldOptionsTool::new(ranker);
        let result = tool.invoke(json!({ "network": "arbitrum" })).await;
        assert!(matches!(result, Err(Error::UnsupportedNetwork(_))));
        assert_eq!(transport.call_count(), 0);
    }
}
