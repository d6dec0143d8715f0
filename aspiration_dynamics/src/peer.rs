//! Peer reference resolution
//!
//! A firm's peer reference is one scalar summarising part of the population's
//! current performance vector. Which part depends on the strategy.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SimError};
use crate::params::ModelParams;

/// How a firm picks its reference group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStrategy {
    /// Whole population, focal firm included
    Conservative,
    /// The k firms whose performance is closest to the focal firm's
    Stepwise,
    /// The k best performers in the population
    Ambitious,
}

impl PeerStrategy {
    pub const ALL: [PeerStrategy; 3] = [
        PeerStrategy::Conservative,
        PeerStrategy::Stepwise,
        PeerStrategy::Ambitious,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PeerStrategy::Conservative => "conservative",
            PeerStrategy::Stepwise => "stepwise",
            PeerStrategy::Ambitious => "ambitious",
        }
    }

    /// Whether every firm gets the same reference in a given period
    pub fn is_firm_independent(&self) -> bool {
        !matches!(self, PeerStrategy::Stepwise)
    }
}

impl fmt::Display for PeerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PeerStrategy {
    type Err = SimError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(PeerStrategy::Conservative),
            "stepwise" => Ok(PeerStrategy::Stepwise),
            "ambitious" => Ok(PeerStrategy::Ambitious),
            _ => Err(SimError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Computes peer references for a population under one strategy
#[derive(Debug, Clone, Copy)]
pub struct PeerResolver {
    strategy: PeerStrategy,
    params: ModelParams,
}

impl PeerResolver {
    pub fn new(strategy: PeerStrategy, params: &ModelParams) -> Self {
        PeerResolver {
            strategy,
            params: *params,
        }
    }

    /// Build a resolver from a strategy name, failing on unknown names
    pub fn from_name(name: &str, params: &ModelParams) -> Result<Self> {
        Ok(Self::new(name.parse()?, params))
    }

    pub fn strategy(&self) -> PeerStrategy {
        self.strategy
    }

    /// Requested reference group size for a population of `n`
    pub fn group_size(&self, n: usize) -> usize {
        self.params.reference_group_size(n)
    }

    /// Peer reference of firm `firm` given the current performance vector
    ///
    /// A lone firm (or an empty candidate set) is its own peer.
    pub fn resolve(&self, firm: usize, performance: &[f64]) -> f64 {
        match self.strategy {
            PeerStrategy::Conservative => mean(performance),
            PeerStrategy::Stepwise => self.nearest_mean(firm, performance),
            PeerStrategy::Ambitious => self.top_mean(performance),
        }
    }

    /// Peer references of every firm, written into `out`
    ///
    /// Firm-independent strategies are evaluated once.
    pub fn resolve_all(&self, performance: &[f64], out: &mut Vec<f64>) {
        out.clear();
        if self.strategy.is_firm_independent() {
            let reference = if performance.is_empty() {
                0.0
            } else {
                self.resolve(0, performance)
            };
            out.resize(performance.len(), reference);
        } else {
            out.extend((0..performance.len()).map(|i| self.resolve(i, performance)));
        }
    }

    fn nearest_mean(&self, firm: usize, performance: &[f64]) -> f64 {
        let own = performance[firm];
        let mut candidates: Vec<(f64, usize)> = performance
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != firm)
            .map(|(j, &p)| ((p - own).abs(), j))
            .collect();
        if candidates.is_empty() {
            return own;
        }

        let k = self.group_size(performance.len()).min(candidates.len());
        let by_distance = |a: &(f64, usize), b: &(f64, usize)| -> Ordering {
            a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
        };
        select_smallest(&mut candidates, k, by_distance);

        candidates[..k].iter().map(|&(_, j)| performance[j]).sum::<f64>() / k as f64
    }

    fn top_mean(&self, performance: &[f64]) -> f64 {
        let mut ranked: Vec<(f64, usize)> = performance
            .iter()
            .enumerate()
            .map(|(j, &p)| (p, j))
            .collect();
        if ranked.is_empty() {
            return 0.0;
        }

        let k = self.group_size(performance.len()).min(ranked.len());
        let best_first = |a: &(f64, usize), b: &(f64, usize)| -> Ordering {
            b.0.total_cmp(&a.0).then(a.1.cmp(&b.1))
        };
        select_smallest(&mut ranked, k, best_first);

        ranked[..k].iter().map(|&(p, _)| p).sum::<f64>() / k as f64
    }
}

/// Move the `k` smallest items (under `cmp`) to the front, in order
///
/// Keys are unique (they embed the firm index), so the result is fully
/// deterministic and so is the order in which they are summed.
fn select_smallest<F>(items: &mut [(f64, usize)], k: usize, cmp: F)
where
    F: Fn(&(f64, usize), &(f64, usize)) -> Ordering,
{
    if k < items.len() {
        items.select_nth_unstable_by(k - 1, &cmp);
    }
    items[..k].sort_unstable_by(&cmp);
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
