//! Command-line options shared by the binaries

use clap::Args;
use std::path::PathBuf;

use crate::config::ExperimentConfig;
use crate::error::Result;

/// Where the experiment configuration comes from, plus per-field overrides
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// TOML experiment file (defaults to the full baseline design)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start from the small quick-view design instead of the baseline
    #[arg(long, conflicts_with = "config")]
    pub quick: bool,

    /// Peer reference strategy: conservative, stepwise or ambitious
    #[arg(long)]
    pub strategy: Option<String>,

    /// Number of firms per population
    #[arg(long)]
    pub firms: Option<usize>,

    /// Periods per run
    #[arg(long)]
    pub periods: Option<usize>,

    /// Repetitions per (regime, aspiration type) cell
    #[arg(long)]
    pub runs: Option<usize>,

    /// Base seed; job j uses seed + j
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads (1 = sequential)
    #[arg(long)]
    pub threads: Option<usize>,
}

impl ConfigArgs {
    /// Load the base config, apply overrides, and validate the result
    pub fn load(&self) -> Result<ExperimentConfig> {
        let mut config = match (&self.config, self.quick) {
            (Some(path), _) => {
                log::info!("loading experiment config from {}", path.display());
                ExperimentConfig::from_file(path)?
            }
            (None, true) => ExperimentConfig::quick_view(),
            (None, false) => ExperimentConfig::baseline(),
        };

        let e = &mut config.experiment;
        if let Some(strategy) = &self.strategy {
            e.strategy = strategy.clone();
        }
        if let Some(firms) = self.firms {
            e.n_firms = firms;
        }
        if let Some(periods) = self.periods {
            e.n_periods = periods;
        }
        if let Some(runs) = self.runs {
            e.n_runs = runs;
        }
        if let Some(seed) = self.seed {
            e.seed = seed;
        }
        if self.threads.is_some() {
            e.threads = self.threads;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    #[test]
    fn overrides_apply_on_top_of_quick_view() {
        let args = ConfigArgs {
            quick: true,
            runs: Some(3),
            seed: Some(99),
            threads: Some(1),
            ..Default::default()
        };
        let config = args.load().unwrap();
        assert_eq!(config.experiment.n_firms, 100);
        assert_eq!(config.experiment.n_runs, 3);
        assert_eq!(config.experiment.seed, 99);
        assert_eq!(config.experiment.threads, Some(1));
        assert_eq!(config.experiment.strategy, "ambitious");
    }

    #[test]
    fn bad_override_is_rejected() {
        let args = ConfigArgs {
            strategy: Some("random".to_string()),
            ..Default::default()
        };
        assert!(matches!(args.load(), Err(SimError::UnknownStrategy(_))));
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/experiment.toml")),
            ..Default::default()
        };
        assert!(matches!(args.load(), Err(SimError::Io(_))));
    }
}
