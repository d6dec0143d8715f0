use serde::{Deserialize, Serialize};
use std::time::Instant;

use batch::ParallelRunner;

use crate::aspiration::AspirationType;
use crate::config::ExperimentConfig;
use crate::error::{Result, SimError};
use crate::params::{UncertaintyLevel, UncertaintyRegime};
use crate::peer::PeerStrategy;
use crate::simulation::{Simulation, SimulationConfig};

/// One firm's summary for one run of one experimental cell
///
/// Field names match the columns consumed by the analysis and plotting
/// tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    #[serde(rename = "Aspiration")]
    pub aspiration: AspirationType,
    #[serde(rename = "Tech_Uncert_Level")]
    pub tech_uncertainty: UncertaintyLevel,
    #[serde(rename = "Market_Uncert_Level")]
    pub market_uncertainty: UncertaintyLevel,
    #[serde(rename = "Strategy")]
    pub strategy: PeerStrategy,
    #[serde(rename = "Performance")]
    pub performance: f64,
    #[serde(rename = "Risk")]
    pub risk: f64,
    #[serde(rename = "Run_ID")]
    pub run_id: usize,
    #[serde(rename = "Org_ID")]
    pub org_id: usize,
}

/// A single (regime, aspiration type, repetition) combination
#[derive(Debug, Clone)]
struct Job {
    regime: UncertaintyRegime,
    tech_level: UncertaintyLevel,
    market_level: UncertaintyLevel,
    aspiration: AspirationType,
    run_id: usize,
    seed: u64,
}

/// Sweeps uncertainty regimes × aspiration types × repetitions
///
/// Jobs are ordered regime-major, then aspiration type, then run id; job `j`
/// is seeded with `seed + j`. Records come back in that same order whatever
/// the thread count.
pub struct Experiment {
    config: ExperimentConfig,
    strategy: PeerStrategy,
    jobs: Vec<Job>,
}

impl Experiment {
    /// Validate the configuration and lay out the job list
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        let strategy = config.strategy()?;
        let aspirations = config.aspiration_types()?;

        let mut jobs = Vec::with_capacity(config.total_jobs());
        for regime in &config.regimes {
            let tech_level = regime.tech_level()?;
            let market_level = regime.market_level()?;
            for &aspiration in &aspirations {
                for run_id in 0..config.experiment.n_runs {
                    let seed = config.experiment.seed.wrapping_add(jobs.len() as u64);
                    jobs.push(Job {
                        regime: regime.clone(),
                        tech_level,
                        market_level,
                        aspiration,
                        run_id,
                        seed,
                    });
                }
            }
        }

        Ok(Experiment {
            config,
            strategy,
            jobs,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn num_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Rows the finished sweep will produce
    pub fn expected_records(&self) -> usize {
        self.jobs.len() * self.config.experiment.n_firms
    }

    /// Run every job and return the flat record table
    pub fn run(&self) -> Result<Vec<ExperimentRecord>> {
        let start = Instant::now();
        let total = self.jobs.len();
        log::info!(
            "experiment {:?}: {} jobs ({} regimes, strategy {}), {} firms × {} periods",
            self.config.experiment.name,
            total,
            self.config.regimes.len(),
            self.strategy,
            self.config.experiment.n_firms,
            self.config.experiment.n_periods,
        );

        let interval = (total / 20).max(1);
        let mut runner = ParallelRunner::new(total, |job_id| self.run_job(job_id))
            .progress(batch::simple_progress_reporter(interval));
        if let Some(threads) = self.config.experiment.threads {
            runner = runner.num_threads(threads);
        }

        let mut records = Vec::with_capacity(self.expected_records());
        for (job, result) in runner.run().into_iter().enumerate() {
            let job_records = result.map_err(|message| SimError::RunFailed { job, message })??;
            records.extend(job_records);
        }

        log::info!(
            "experiment {:?} finished: {} records in {:.2?}",
            self.config.experiment.name,
            records.len(),
            start.elapsed()
        );
        Ok(records)
    }

    fn run_job(&self, job_id: usize) -> Result<Vec<ExperimentRecord>> {
        let job = &self.jobs[job_id];
        log::debug!(
            "job {}: {} / {} run {} seed {}",
            job_id,
            job.regime.label,
            job.aspiration,
            job.run_id,
            job.seed
        );

        let sim_config = SimulationConfig::new(
            self.config.experiment.n_firms,
            job.aspiration,
            self.strategy,
            &job.regime,
            self.config.model,
        );
        let mut simulation = Simulation::new(sim_config, job.seed)?;
        let trajectory = simulation.run(self.config.experiment.n_periods);

        Ok(trajectory
            .summaries()
            .into_iter()
            .enumerate()
            .map(|(org_id, summary)| ExperimentRecord {
                aspiration: job.aspiration,
                tech_uncertainty: job.tech_level,
                market_uncertainty: job.market_level,
                strategy: self.strategy,
                performance: summary.performance,
                risk: summary.risk,
                run_id: job.run_id,
                org_id,
            })
            .collect())
    }
}

/// Build and run an experiment in one call
pub fn run_experiment(config: ExperimentConfig) -> Result<Vec<ExperimentRecord>> {
    Experiment::new(config)?.run()
}
