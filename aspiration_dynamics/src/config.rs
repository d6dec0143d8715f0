//! Experiment configuration
//!
//! Loaded from TOML. Every field has a default, so a file only needs to list
//! what it changes:
//!
//! ```toml
//! [experiment]
//! name = "quick_view"
//! n_firms = 100
//! n_periods = 200
//! n_runs = 10
//! strategy = "ambitious"
//!
//! [model]
//! gamma = 0.5
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::aspiration::AspirationType;
use crate::error::{Result, SimError};
use crate::params::{ModelParams, UncertaintyRegime};
use crate::peer::PeerStrategy;

pub const NUM_ORG: usize = 200;
pub const NUM_PERIOD: usize = 1000;
pub const NUM_REPEAT: usize = 1000;
pub const SEED: u64 = 7;

/// Top-level experiment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub experiment: ExperimentSettings,
    pub model: ModelParams,
    pub regimes: Vec<UncertaintyRegime>,
}

/// Sweep size, strategy and seeding
///
/// Names stay as text here so that a bad name surfaces as
/// `InvalidConfiguration`/`UnknownStrategy` from `validate`, not as a
/// TOML parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentSettings {
    pub name: String,
    pub n_firms: usize,
    pub n_periods: usize,
    pub n_runs: usize,
    pub strategy: String,
    pub aspiration_types: Vec<String>,
    /// Job `j` of the sweep is seeded with `seed + j`
    pub seed: u64,
    /// Worker threads; `None` uses every core
    pub threads: Option<usize>,
}

impl Default for ExperimentSettings {
    fn default() -> Self {
        ExperimentSettings {
            name: "baseline".to_string(),
            n_firms: NUM_ORG,
            n_periods: NUM_PERIOD,
            n_runs: NUM_REPEAT,
            strategy: PeerStrategy::Stepwise.name().to_string(),
            aspiration_types: AspirationType::ALL
                .iter()
                .map(|a| a.name().to_string())
                .collect(),
            seed: SEED,
            threads: None,
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            experiment: ExperimentSettings::default(),
            model: ModelParams::default(),
            regimes: UncertaintyRegime::defaults(),
        }
    }
}

impl ExperimentConfig {
    /// Full-size design: 200 firms, 1000 periods, 1000 repetitions
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Small design for a first look: 100 firms, 200 periods, 10 runs
    pub fn quick_view() -> Self {
        let mut config = Self::default();
        config.experiment.name = "quick_view".to_string();
        config.experiment.n_firms = 100;
        config.experiment.n_periods = 200;
        config.experiment.n_runs = 10;
        config.experiment.strategy = PeerStrategy::Ambitious.name().to_string();
        config
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ExperimentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn strategy(&self) -> Result<PeerStrategy> {
        self.experiment.strategy.parse()
    }

    pub fn aspiration_types(&self) -> Result<Vec<AspirationType>> {
        self.experiment
            .aspiration_types
            .iter()
            .map(|name| name.parse())
            .collect()
    }

    /// Reject anything that would make a run fail or the sweep meaningless
    pub fn validate(&self) -> Result<()> {
        let e = &self.experiment;
        if e.n_firms == 0 {
            return Err(SimError::InvalidConfiguration(
                "n_firms must be positive".to_string(),
            ));
        }
        if e.n_periods == 0 {
            return Err(SimError::InvalidConfiguration(
                "n_periods must be positive".to_string(),
            ));
        }
        if e.n_runs == 0 {
            return Err(SimError::InvalidConfiguration(
                "n_runs must be positive".to_string(),
            ));
        }
        if e.threads == Some(0) {
            return Err(SimError::InvalidConfiguration(
                "threads must be positive when given".to_string(),
            ));
        }
        self.strategy()?;
        let aspirations = self.aspiration_types()?;
        if aspirations.is_empty() {
            return Err(SimError::InvalidConfiguration(
                "at least one aspiration type is required".to_string(),
            ));
        }
        let mut seen_aspirations = BTreeSet::new();
        for aspiration in aspirations {
            if !seen_aspirations.insert(aspiration) {
                return Err(SimError::InvalidConfiguration(format!(
                    "aspiration type {aspiration} is listed more than once"
                )));
            }
        }

        if self.regimes.is_empty() {
            return Err(SimError::InvalidConfiguration(
                "at least one uncertainty regime is required".to_string(),
            ));
        }
        // Records are keyed by (tech, market) level, so each pair may appear once
        let mut seen_levels = BTreeSet::new();
        for regime in &self.regimes {
            regime.validate()?;
            let levels = (regime.tech_level()?, regime.market_level()?);
            if !seen_levels.insert(levels) {
                return Err(SimError::InvalidConfiguration(format!(
                    "regime {:?} repeats the {}/{} uncertainty cell",
                    regime.label, levels.0, levels.1
                )));
            }
        }
        self.model.validate()
    }

    /// Number of independent simulation runs in the sweep
    pub fn total_jobs(&self) -> usize {
        self.regimes.len() * self.experiment.aspiration_types.len() * self.experiment.n_runs
    }
}
