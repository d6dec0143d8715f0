//! Post-processing of the experiment record table
//!
//! - Three-way factorial ANOVA of Performance and Risk on aspiration type,
//!   technological uncertainty and market uncertainty
//! - Group mean differences from the overall mean, per factor level
//! - Per-run trends by aspiration type

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::aspiration::AspirationType;
use crate::error::{Result, SimError};
use crate::experiment::ExperimentRecord;
use crate::stats;

/// Outcome variable being analysed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Performance,
    Risk,
}

impl Metric {
    pub fn value(&self, record: &ExperimentRecord) -> f64 {
        match self {
            Metric::Performance => record.performance,
            Metric::Risk => record.risk,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Performance => write!(f, "Performance"),
            Metric::Risk => write!(f, "Risk"),
        }
    }
}

/// Experimental factor a record is classified by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Factor {
    Aspiration,
    TechUncertainty,
    MarketUncertainty,
}

impl Factor {
    pub const ALL: [Factor; 3] = [
        Factor::Aspiration,
        Factor::TechUncertainty,
        Factor::MarketUncertainty,
    ];

    /// Column name in the record table
    pub fn column(&self) -> &'static str {
        match self {
            Factor::Aspiration => "Aspiration",
            Factor::TechUncertainty => "Tech_Uncert_Level",
            Factor::MarketUncertainty => "Market_Uncert_Level",
        }
    }

    pub fn level(&self, record: &ExperimentRecord) -> String {
        match self {
            Factor::Aspiration => record.aspiration.to_string(),
            Factor::TechUncertainty => record.tech_uncertainty.to_string(),
            Factor::MarketUncertainty => record.market_uncertainty.to_string(),
        }
    }
}

/// One effect row of the ANOVA table (residual row omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaRow {
    pub metric: Metric,
    pub source: String,
    pub sum_sq: f64,
    pub df: usize,
    pub f_value: f64,
    pub p_value: f64,
}

/// Full-factorial ANOVA of `metric` on the three experimental factors
///
/// Main effects come first, then two-way and three-way interactions.
/// Factors observed at a single level contribute no rows. The design must
/// be balanced (same number of records in every cell), which the experiment
/// driver always produces; in that case the decomposition is the same for
/// type I, II and III sums of squares.
///
/// Rows with a non-finite Performance or Risk are dropped first.
pub fn factorial_anova(records: &[ExperimentRecord], metric: Metric) -> Result<Vec<AnovaRow>> {
    let total = records.len();
    let records: Vec<&ExperimentRecord> = records
        .iter()
        .filter(|r| r.performance.is_finite() && r.risk.is_finite())
        .collect();
    if records.len() < total {
        log::warn!(
            "{} ANOVA: dropped {} of {} records with non-finite values",
            metric,
            total - records.len(),
            total
        );
    }
    if records.is_empty() {
        return Err(SimError::Analysis("no records to analyse".to_string()));
    }

    // Level index per factor per record
    let level_names: Vec<Vec<String>> = Factor::ALL
        .iter()
        .map(|factor| {
            let mut levels: Vec<String> = records.iter().map(|r| factor.level(r)).collect();
            levels.sort();
            levels.dedup();
            levels
        })
        .collect();
    let coded: Vec<[usize; 3]> = records
        .iter()
        .map(|r| {
            let mut code = [0; 3];
            for (f, factor) in Factor::ALL.iter().enumerate() {
                let level = factor.level(r);
                // levels were collected from these same records
                code[f] = level_names[f].binary_search(&level).unwrap_or(0);
            }
            code
        })
        .collect();
    let values: Vec<f64> = records.iter().map(|r| metric.value(r)).collect();

    let cell_means = group_means(&coded, &values, 0b111);
    let cells_expected: usize = level_names.iter().map(|l| l.len()).product();
    let per_cell = records.len() / cells_expected;
    let balanced = cell_means.len() == cells_expected
        && cell_means.values().all(|&(_, count)| count == per_cell);
    if !balanced {
        return Err(SimError::Analysis(format!(
            "design is unbalanced: {} records over {} of {} cells",
            records.len(),
            cell_means.len(),
            cells_expected
        )));
    }

    let df_resid = records.len() - cells_expected;
    let ss_resid: f64 = coded
        .iter()
        .zip(&values)
        .map(|(code, &y)| {
            let (cell_mean, _) = cell_means[&key_for(code, 0b111)];
            (y - cell_mean).powi(2)
        })
        .sum();
    if df_resid == 0 {
        return Err(SimError::Analysis(
            "no residual degrees of freedom (one record per cell)".to_string(),
        ));
    }
    let ms_resid = ss_resid / df_resid as f64;

    // Marginal means for every subset of factors, the empty set being the grand mean
    let marginals: Vec<BTreeMap<Vec<usize>, (f64, usize)>> =
        (0..8u8).map(|mask| group_means(&coded, &values, mask)).collect();

    let mut rows = Vec::new();
    for mask in [0b001u8, 0b010, 0b100, 0b011, 0b101, 0b110, 0b111] {
        let df: usize = (0..3usize)
            .filter(|&f| mask & (1u8 << f) != 0)
            .map(|f| level_names[f].len() - 1)
            .product();
        if df == 0 {
            continue;
        }

        let sum_sq: f64 = coded
            .iter()
            .map(|code| interaction_effect(code, mask, &marginals).powi(2))
            .sum();
        let ms = sum_sq / df as f64;
        let f_value = if ms_resid > 0.0 {
            ms / ms_resid
        } else if ms > 0.0 {
            f64::INFINITY
        } else {
            f64::NAN
        };
        let p_value = stats::f_survival(f_value, df as f64, df_resid as f64);

        rows.push(AnovaRow {
            metric,
            source: source_name(mask),
            sum_sq,
            df,
            f_value,
            p_value,
        });
    }

    Ok(rows)
}

/// Inclusion–exclusion over the sub-effects of `mask`
fn interaction_effect(
    code: &[usize; 3],
    mask: u8,
    marginals: &[BTreeMap<Vec<usize>, (f64, usize)>],
) -> f64 {
    let mut effect = 0.0;
    for sub in 0..8u8 {
        if sub & !mask != 0 {
            continue;
        }
        let sign = if (mask.count_ones() - sub.count_ones()) % 2 == 0 {
            1.0
        } else {
            -1.0
        };
        let (m, _) = marginals[sub as usize][&key_for(code, sub)];
        effect += sign * m;
    }
    effect
}

fn key_for(code: &[usize; 3], mask: u8) -> Vec<usize> {
    (0..3usize)
        .filter(|&f| mask & (1u8 << f) != 0)
        .map(|f| code[f])
        .collect()
}

fn group_means(coded: &[[usize; 3]], values: &[f64], mask: u8) -> BTreeMap<Vec<usize>, (f64, usize)> {
    let mut sums: BTreeMap<Vec<usize>, (f64, usize)> = BTreeMap::new();
    for (code, &y) in coded.iter().zip(values) {
        let entry = sums.entry(key_for(code, mask)).or_insert((0.0, 0));
        entry.0 += y;
        entry.1 += 1;
    }
    for (sum, count) in sums.values_mut() {
        *sum /= *count as f64;
    }
    sums
}

fn source_name(mask: u8) -> String {
    Factor::ALL
        .iter()
        .enumerate()
        .filter(|&(f, _)| mask & (1u8 << f) != 0)
        .map(|(_, factor)| format!("C({})", factor.column()))
        .collect::<Vec<_>>()
        .join(":")
}

/// Mean Performance/Risk of one factor level and its distance to the overall mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDifference {
    pub factor: Factor,
    pub level: String,
    pub performance: f64,
    pub risk: f64,
    pub perf_diff: f64,
    pub risk_diff: f64,
}

/// Group mean differences from the overall mean for every level of `factor`
///
/// Levels are returned in sorted order.
pub fn group_mean_differences(records: &[ExperimentRecord], factor: Factor) -> Vec<GroupDifference> {
    if records.is_empty() {
        return Vec::new();
    }
    let overall_perf = stats::mean(&records.iter().map(|r| r.performance).collect::<Vec<_>>());
    let overall_risk = stats::mean(&records.iter().map(|r| r.risk).collect::<Vec<_>>());

    let mut groups: BTreeMap<String, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(factor.level(record)).or_default();
        entry.0.push(record.performance);
        entry.1.push(record.risk);
    }

    groups
        .into_iter()
        .map(|(level, (perf, risk))| {
            let performance = stats::mean(&perf);
            let risk = stats::mean(&risk);
            GroupDifference {
                factor,
                level,
                performance,
                risk,
                perf_diff: performance - overall_perf,
                risk_diff: risk - overall_risk,
            }
        })
        .collect()
}

/// Mean Performance and Risk across firms for one run of one aspiration type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTrend {
    pub run_id: usize,
    pub aspiration: AspirationType,
    pub performance: f64,
    pub risk: f64,
}

/// Per-(run, aspiration) means, ordered by aspiration type then run id
pub fn run_trends(records: &[ExperimentRecord]) -> Vec<RunTrend> {
    let mut groups: BTreeMap<(AspirationType, usize), (f64, f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry((record.aspiration, record.run_id))
            .or_insert((0.0, 0.0, 0));
        entry.0 += record.performance;
        entry.1 += record.risk;
        entry.2 += 1;
    }

    groups
        .into_iter()
        .map(|((aspiration, run_id), (perf, risk, count))| RunTrend {
            run_id,
            aspiration,
            performance: perf / count as f64,
            risk: risk / count as f64,
        })
        .collect()
}

/// Print an ANOVA table in the layout of a journal "Table 1"
pub fn print_anova(rows: &[AnovaRow]) {
    println!(
        "{:<12} {:<70} {:>12} {:>4} {:>12} {:>10}",
        "Metric", "Source", "Sum Sq", "df", "F value", "p-value"
    );
    println!("{:-<12} {:-<70} {:->12} {:->4} {:->12} {:->10}", "", "", "", "", "", "");
    for row in rows {
        println!(
            "{:<12} {:<70} {:>12.2} {:>4} {:>12.2} {:>10.3e}",
            row.metric.to_string(),
            row.source,
            row.sum_sq,
            row.df,
            row.f_value,
            row.p_value
        );
    }
}

/// Print group mean differences for one factor
pub fn print_group_differences(factor: Factor, groups: &[GroupDifference]) {
    println!("\n→ {}", factor.column());
    println!("{:<12} {:>10} {:>10}", "Level", "Perf_diff", "Risk_diff");
    for group in groups {
        println!(
            "{:<12} {:>10.3} {:>10.3}",
            group.level, group.perf_diff, group.risk_diff
        );
    }
}
