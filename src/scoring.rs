//! Market quality scoring
//!
//! Turns a token's DEX market snapshot into a quality factor in `[0, 1]`.
//! Three sub-scores (liquidity, volume, activity) each ramp linearly from 0
//! at their minimum threshold to 1 at their "good" threshold, and are
//! combined with fixed weights.

use crate::market::TokenMarketSnapshot;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

pub const TVL_WEIGHT: f64 = 0.5;
pub const VOLUME_WEIGHT: f64 = 0.3;
pub const TX_COUNT_WEIGHT: f64 = 0.2;

/// Ramp bounds for each sub-score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringThresholds {
    pub min_tvl_usd: f64,
    pub good_tvl_usd: f64,
    pub min_volume_usd: f64,
    pub good_volume_usd: f64,
    pub min_tx_count: f64,
    pub good_tx_count: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            min_tvl_usd: 100_000.0,
            good_tvl_usd: 1_000_000.0,
            min_volume_usd: 50_000.0,
            good_volume_usd: 500_000.0,
            min_tx_count: 100.0,
            good_tx_count: 1_000.0,
        }
    }
}

impl ScoringThresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, min, good) in [
            ("tvl_usd", self.min_tvl_usd, self.good_tvl_usd),
            ("volume_usd", self.min_volume_usd, self.good_volume_usd),
            ("tx_count", self.min_tx_count, self.good_tx_count),
        ] {
            if !min.is_finite() || !good.is_finite() || good <= min {
                return Err(Error::Config(format!(
                    "scoring threshold good_{} ({}) must be greater than min_{} ({})",
                    name, good, name, min
                )));
            }
        }
        Ok(())
    }
}

/// Clamped linear ramp: 0 at or below `min`, 1 at or above `good`
pub fn linear_factor(value: f64, min: f64, good: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    ((value - min) / (good - min)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    thresholds: ScoringThresholds,
}

impl QualityScorer {
    pub fn new(thresholds: ScoringThresholds) -> Self {
        Self { thresholds }
    }

    /// Quality of one market; a token with no market scores 0
    pub fn quality_factor(&self, snapshot: Option<&TokenMarketSnapshot>) -> f64 {
        let Some(snapshot) = snapshot else {
            return 0.0;
        };
        let t = &self.thresholds;

        let tvl = linear_factor(snapshot.total_value_locked_usd, t.min_tvl_usd, t.good_tvl_usd);
        let volume = linear_factor(snapshot.volume_usd, t.min_volume_usd, t.good_volume_usd);
        let activity = linear_factor(snapshot.tx_count as f64, t.min_tx_count, t.good_tx_count);

        TVL_WEIGHT * tvl + VOLUME_WEIGHT * volume + TX_COUNT_WEIGHT * activity
    }

    /// Best quality across both DEX sources
    pub fn effective_quality(
        &self,
        uniswap: Option<&TokenMarketSnapshot>,
        aerodrome: Option<&TokenMarketSnapshot>,
    ) -> f64 {
        self.quality_factor(uniswap)
            .max(self.quality_factor(aerodrome))
    }
}
