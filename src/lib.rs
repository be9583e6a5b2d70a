//! DeFi Yield Ranker
//!
//! Ranks lending vault yields by how much of their reward APY is backed by
//! real market depth:
//! - Load warning-free Morpho vaults for a base asset
//! - Look up every reward token on the Uniswap V3 and Aerodrome subgraphs
//! - Discount each reward by a liquidity/volume/activity quality factor
//! - Merge statically known yield sources and sort by risk-adjusted APY
//!
//! Upstream responses are cached on disk and served until they expire.

pub mod cache;
pub mod config;
pub mod graphql;
pub mod market;
pub mod morpho;
pub mod query;
pub mod ranking;
pub mod scoring;
pub mod tokens;
pub mod tools;

mod error;

// Re-export commonly used types
pub use config::{Config, Network, Protocol, GRAPH_API_KEY_ENV};
pub use error::{Error, Result};
pub use ranking::{YieldOption, YieldOptionReward, YieldRanker};
pub use tools::{Tool, ToolRegistry};
