//! Upstream endpoint configuration
//!
//! Resolves the GraphQL URL for every `(Network, Protocol)` pair:
//! 1. Per-protocol env overrides (MORPHO_API_URL, UNISWAP_SUBGRAPH_URL,
//!    AERODROME_SUBGRAPH_URL) - highest priority
//! 2. The Morpho public API for vault data
//! 3. The Graph gateway, built from GRAPH_API_KEY and a subgraph ID
//!
//! A network without an entry in `subgraphs` is unsupported for every protocol.
//!
//! # Examples
//!
//! ```bash
//! export GRAPH_API_KEY="YOUR_KEY"
//! # Optional: point a source at a self-hosted graph node
//! export AERODROME_SUBGRAPH_URL="http://localhost:8000/subgraphs/name/aerodrome"
//! ```

use super::{Network, Protocol, GRAPH_API_KEY_ENV};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Environment variable names
mod env_vars {
    pub const MORPHO_API_URL: &str = "MORPHO_API_URL";
    pub const UNISWAP_SUBGRAPH_URL: &str = "UNISWAP_SUBGRAPH_URL";
    pub const AERODROME_SUBGRAPH_URL: &str = "AERODROME_SUBGRAPH_URL";
}

mod defaults {
    pub const MORPHO_API_URL: &str = "https://blue-api.morpho.org/graphql";
    pub const GRAPH_GATEWAY_URL: &str = "https://gateway.thegraph.com";

    pub const UNISWAP_V3_BASE: &str = "GqzP4Xaehti8KSfQmv3ZctFSjnSUYZ4En5NRsiTbvZpz";
    pub const AERODROME_BASE: &str = "GENunSHWLBXm59mBSgPzQ8metBEp9YDfdqwFr91Av1UM";
}

/// Subgraph deployment IDs for one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubgraphIds {
    pub uniswap_v3: String,
    pub aerodrome: String,
}

fn graph_api_key_from_env() -> Option<Arc<SecretString>> {
    std::env::var(GRAPH_API_KEY_ENV)
        .ok()
        .filter(|key| !key.is_empty())
        .map(|key| Arc::new(SecretString::from(key)))
}

/// Endpoint table for all upstream data providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    /// Morpho GraphQL API (chain is passed as a query variable)
    pub morpho_api_url: String,
    /// The Graph gateway base URL
    pub graph_gateway_url: String,
    /// Subgraph IDs per supported network
    pub subgraphs: HashMap<Network, SubgraphIds>,
    /// Full URLs that replace the computed endpoint for a protocol
    #[serde(default)]
    pub url_overrides: HashMap<Protocol, String>,
    #[serde(skip, default = "graph_api_key_from_env")]
    graph_api_key: Option<Arc<SecretString>>,
}

impl Endpoints {
    /// Build the default endpoint table, applying environment overrides
    pub fn from_env() -> Self {
        let mut subgraphs = HashMap::new();
        subgraphs.insert(
            Network::Base,
            SubgraphIds {
                uniswap_v3: defaults::UNISWAP_V3_BASE.to_string(),
                aerodrome: defaults::AERODROME_BASE.to_string(),
            },
        );

        let mut url_overrides = HashMap::new();
        for (var, protocol) in [
            (env_vars::MORPHO_API_URL, Protocol::Morpho),
            (env_vars::UNISWAP_SUBGRAPH_URL, Protocol::UniswapV3),
            (env_vars::AERODROME_SUBGRAPH_URL, Protocol::Aerodrome),
        ] {
            let Ok(value) = std::env::var(var) else {
                continue;
            };
            match url::Url::parse(&value) {
                Ok(_) => {
                    tracing::debug!(var, protocol = protocol.name(), "Using endpoint override");
                    url_overrides.insert(protocol, value);
                }
                Err(e) => {
                    tracing::warn!(var, error = %e, "Ignoring invalid endpoint override");
                }
            }
        }

        let graph_api_key = graph_api_key_from_env();
        if graph_api_key.is_none() {
            tracing::debug!("{} not set, subgraph lookups will fail", GRAPH_API_KEY_ENV);
        }

        Self {
            morpho_api_url: defaults::MORPHO_API_URL.to_string(),
            graph_gateway_url: defaults::GRAPH_GATEWAY_URL.to_string(),
            subgraphs,
            url_overrides,
            graph_api_key,
        }
    }

    /// Set The Graph API key explicitly
    pub fn with_graph_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.graph_api_key = Some(Arc::new(SecretString::from(api_key.into())));
        self
    }

    /// Drop any API key picked up from the environment
    pub fn without_graph_api_key(mut self) -> Self {
        self.graph_api_key = None;
        self
    }

    /// Check if a network is configured
    pub fn supports(&self, network: Network) -> bool {
        self.subgraphs.contains_key(&network)
    }

    /// Resolve a network from a chain ID, failing for anything not configured
    pub fn network_for_chain(&self, chain_id: u64) -> Result<Network> {
        Network::from_chain_id(chain_id)
            .filter(|network| self.supports(*network))
            .ok_or_else(|| Error::UnsupportedNetwork(format!("chain {}", chain_id)))
    }

    /// Get the GraphQL URL for a protocol on a network
    pub fn url(&self, network: Network, protocol: Protocol) -> Result<String> {
        let ids = self
            .subgraphs
            .get(&network)
            .ok_or_else(|| Error::UnsupportedNetwork(network.name().to_string()))?;

        if let Some(url) = self.url_overrides.get(&protocol) {
            return Ok(url.clone());
        }

        match protocol {
            Protocol::Morpho => Ok(self.morpho_api_url.clone()),
            Protocol::UniswapV3 => self.gateway_url(&ids.uniswap_v3),
            Protocol::Aerodrome => self.gateway_url(&ids.aerodrome),
        }
    }

    fn gateway_url(&self, subgraph_id: &str) -> Result<String> {
        let api_key = self
            .graph_api_key
            .as_ref()
            .ok_or_else(|| Error::Config(format!("{} is not set", GRAPH_API_KEY_ENV)))?;
        Ok(format!(
            "{}/api/{}/subgraphs/id/{}",
            self.graph_gateway_url.trim_end_matches('/'),
            api_key.expose_secret(),
            subgraph_id
        ))
    }

    /// Ensure every configured URL parses
    pub fn validate(&self) -> Result<()> {
        let urls = [&self.morpho_api_url, &self.graph_gateway_url]
            .into_iter()
            .chain(self.url_overrides.values());
        for url in urls {
            url::Url::parse(url).map_err(|e| Error::Config(format!("invalid URL {}: {}", url, e)))?;
        }
        Ok(())
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::from_env()
    }
}
