//! Export of experiment results for external analysis and plotting
//!
//! - `records.csv`: the flat per-firm table, one row per (regime, aspiration,
//!   run, firm)
//! - `anova.csv`: ANOVA rows for Performance and Risk
//! - `summary.json`: configuration, seed, timestamp and all derived tables

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::analysis::{
    factorial_anova, group_mean_differences, run_trends, AnovaRow, Factor, GroupDifference,
    Metric, RunTrend,
};
use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::experiment::ExperimentRecord;

/// Write the record table as CSV with its canonical column names
pub fn write_records_csv<W: io::Write>(records: &[ExperimentRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a record table written by [`write_records_csv`]
pub fn read_records_csv<R: io::Read>(reader: R) -> Result<Vec<ExperimentRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in rdr.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

pub fn read_records_file<P: AsRef<Path>>(path: P) -> Result<Vec<ExperimentRecord>> {
    read_records_csv(fs::File::open(path)?)
}

/// Metadata for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetadata {
    pub config: ExperimentConfig,
    pub seed: u64,
    pub num_records: usize,
    pub timestamp: String,
}

/// Everything derived from one experiment's record table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub metadata: SummaryMetadata,
    pub anova: Vec<AnovaRow>,
    pub group_differences: Vec<GroupDifference>,
    pub run_trends: Vec<RunTrend>,
}

impl ExperimentSummary {
    /// Run every analysis over `records`
    ///
    /// A design the ANOVA cannot decompose (e.g. one record per cell) leaves
    /// `anova` empty; the other tables are still filled in.
    pub fn from_records(records: &[ExperimentRecord], config: &ExperimentConfig) -> Self {
        let mut anova = Vec::new();
        for metric in [Metric::Performance, Metric::Risk] {
            match factorial_anova(records, metric) {
                Ok(rows) => anova.extend(rows),
                Err(e) => log::warn!("skipping {metric} ANOVA: {e}"),
            }
        }

        let group_differences = Factor::ALL
            .iter()
            .flat_map(|&factor| group_mean_differences(records, factor))
            .collect();

        ExperimentSummary {
            metadata: SummaryMetadata {
                config: config.clone(),
                seed: config.experiment.seed,
                num_records: records.len(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
            anova,
            group_differences,
            run_trends: run_trends(records),
        }
    }

    pub fn groups_for(&self, factor: Factor) -> Vec<GroupDifference> {
        self.group_differences
            .iter()
            .filter(|g| g.factor == factor)
            .cloned()
            .collect()
    }

    pub fn write_anova_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(["Metric", "Source", "Sum Sq", "df", "F value", "p-value"])?;
        for row in &self.anova {
            wtr.write_record(&[
                row.metric.to_string(),
                row.source.clone(),
                format!("{:.2}", row.sum_sq),
                row.df.to_string(),
                format!("{:.2}", row.f_value),
                format!("{:.3e}", row.p_value),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_summary_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Write `records.csv`, `anova.csv` and `summary.json` into `dir`
pub fn write_all<P: AsRef<Path>>(
    dir: P,
    records: &[ExperimentRecord],
    summary: &ExperimentSummary,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    write_records_csv(records, fs::File::create(dir.join("records.csv"))?)?;
    summary.write_anova_csv(dir.join("anova.csv"))?;
    summary.write_summary_json(dir.join("summary.json"))?;

    log::info!("wrote results to {}", dir.display());
    Ok(())
}
