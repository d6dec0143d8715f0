use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SimError};

/// Behavioural constants shared by every firm in a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Weight on the previous aspiration level (γ)
    pub gamma: f64,
    /// Optimism bias applied to the reference quantity (μ)
    pub mu: f64,
    /// Weight on own performance in the mixed rule (w)
    pub w: f64,
    /// Share of the population used as the stepwise/ambitious reference group
    pub percentile_stepwise: f64,
}

impl ModelParams {
    /// Validate parameter ranges
    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || !self.mu.is_finite() {
            return Err(SimError::InvalidConfiguration(format!(
                "gamma and mu must be finite (gamma={}, mu={})",
                self.gamma, self.mu
            )));
        }
        if !(0.0..=1.0).contains(&self.w) {
            return Err(SimError::InvalidConfiguration(format!(
                "w must lie in [0, 1], got {}",
                self.w
            )));
        }
        if !(self.percentile_stepwise > 0.0 && self.percentile_stepwise <= 1.0) {
            return Err(SimError::InvalidConfiguration(format!(
                "percentile_stepwise must lie in (0, 1], got {}",
                self.percentile_stepwise
            )));
        }
        Ok(())
    }

    /// Size of the stepwise/ambitious reference group for a population of `n`
    ///
    /// `max(1, round(percentile × n))`, before any clipping to the number of
    /// available peers.
    pub fn reference_group_size(&self, n: usize) -> usize {
        ((self.percentile_stepwise * n as f64).round() as usize).max(1)
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            gamma: 0.5,
            mu: 0.05,
            w: 0.5, // equal weight on historical and social components
            percentile_stepwise: 0.1,
        }
    }
}

/// Coarse uncertainty level used to label regimes in the output table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UncertaintyLevel {
    Low,
    High,
}

impl fmt::Display for UncertaintyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UncertaintyLevel::Low => write!(f, "Low"),
            UncertaintyLevel::High => write!(f, "High"),
        }
    }
}

pub const TECH_UNCERT_LOW: f64 = 0.9; // 10% technology deterioration
pub const TECH_UNCERT_HIGH: f64 = 0.5; // 50% technology deterioration
pub const MARKET_UNCERT_LOW: f64 = 0.9;
pub const MARKET_UNCERT_HIGH: f64 = 0.5;

/// One technological/market uncertainty cell of the experiment
///
/// `d` is the technology carry-over factor and `v` the persistence of market
/// conditions. The label encodes both levels, e.g. `low_tech_high_market`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRegime {
    pub label: String,
    pub d: f64,
    pub v: f64,
}

impl UncertaintyRegime {
    pub fn new(label: impl Into<String>, d: f64, v: f64) -> Self {
        UncertaintyRegime {
            label: label.into(),
            d,
            v,
        }
    }

    /// The four regimes of the 2×2 uncertainty design
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("low_tech_low_market", TECH_UNCERT_LOW, MARKET_UNCERT_LOW),
            Self::new("low_tech_high_market", TECH_UNCERT_LOW, MARKET_UNCERT_HIGH),
            Self::new("high_tech_low_market", TECH_UNCERT_HIGH, MARKET_UNCERT_LOW),
            Self::new("high_tech_high_market", TECH_UNCERT_HIGH, MARKET_UNCERT_HIGH),
        ]
    }

    pub fn tech_level(&self) -> Result<UncertaintyLevel> {
        self.level_for("tech")
    }

    pub fn market_level(&self) -> Result<UncertaintyLevel> {
        self.level_for("market")
    }

    fn level_for(&self, dimension: &str) -> Result<UncertaintyLevel> {
        let label = self.label.to_ascii_lowercase();
        let low = label.contains(&format!("low_{dimension}"));
        let high = label.contains(&format!("high_{dimension}"));
        match (low, high) {
            (true, false) => Ok(UncertaintyLevel::Low),
            (false, true) => Ok(UncertaintyLevel::High),
            _ => Err(SimError::InvalidConfiguration(format!(
                "regime label {:?} must name exactly one of low_{dimension}/high_{dimension}",
                self.label
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.d.is_finite() || !self.v.is_finite() {
            return Err(SimError::InvalidConfiguration(format!(
                "regime {:?} has non-finite d={} or v={}",
                self.label, self.d, self.v
            )));
        }
        self.tech_level()?;
        self.market_level()?;
        Ok(())
    }
}
