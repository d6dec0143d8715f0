//! Aspiration update rules
//!
//! Every rule smooths a reference quantity into the firm's aspiration level:
//!
//!   A(t) = γ × A(t-1) + (1 - γ) × (1 + μ) × R(t)
//!
//! and the rules differ only in how R(t) is built from the firm's own
//! performance and its peer reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimError;
use crate::params::ModelParams;

/// Which reference quantity drives the aspiration update
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspirationType {
    /// Own current performance
    Historical,
    /// Peer-group reference performance
    Social,
    /// Weighted blend of own and peer performance
    Mixed,
    /// Whichever of own and peer performance is higher
    Switching,
}

impl AspirationType {
    pub const ALL: [AspirationType; 4] = [
        AspirationType::Historical,
        AspirationType::Social,
        AspirationType::Mixed,
        AspirationType::Switching,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AspirationType::Historical => "historical",
            AspirationType::Social => "social",
            AspirationType::Mixed => "mixed",
            AspirationType::Switching => "switching",
        }
    }

    /// Whether the rule reads the peer reference at all
    pub fn uses_peers(&self) -> bool {
        !matches!(self, AspirationType::Historical)
    }

    /// Reference quantity R(t) for this rule
    pub fn reference_quantity(&self, own: f64, peer: f64, w: f64) -> f64 {
        match self {
            AspirationType::Historical => own,
            AspirationType::Social => peer,
            AspirationType::Mixed => w * own + (1.0 - w) * peer,
            // ties keep own performance
            AspirationType::Switching => {
                if own < peer {
                    peer
                } else {
                    own
                }
            }
        }
    }

    /// Next aspiration level given the current one
    pub fn next_level(&self, current: f64, own: f64, peer: f64, params: &ModelParams) -> f64 {
        let reference = self.reference_quantity(own, peer, params.w);
        params.gamma * current + (1.0 - params.gamma) * (1.0 + params.mu) * reference
    }
}

impl fmt::Display for AspirationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AspirationType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "historical" => Ok(AspirationType::Historical),
            "social" => Ok(AspirationType::Social),
            "mixed" => Ok(AspirationType::Mixed),
            "switching" => Ok(AspirationType::Switching),
            other => Err(SimError::InvalidConfiguration(format!(
                "unknown aspiration type {other:?} (expected historical, social, mixed or switching)"
            ))),
        }
    }
}

/// Aspiration levels of a whole population under one rule
///
/// Levels are stored as one array indexed by firm id rather than one object
/// per firm.
#[derive(Debug, Clone)]
pub struct AspirationPolicy {
    kind: AspirationType,
    params: ModelParams,
    levels: Vec<f64>,
}

impl AspirationPolicy {
    pub fn new(kind: AspirationType, params: ModelParams) -> Self {
        AspirationPolicy {
            kind,
            params,
            levels: Vec::new(),
        }
    }

    /// Set every firm's starting level, replacing any previous state
    pub fn initialize(&mut self, initial_levels: Vec<f64>) {
        self.levels = initial_levels;
    }

    /// Advance firm `firm`'s level using its post-decision performance
    pub fn update(&mut self, firm: usize, own_performance: f64, peer_reference: f64) {
        let level = &mut self.levels[firm];
        *level = self
            .kind
            .next_level(*level, own_performance, peer_reference, &self.params);
    }

    pub fn kind(&self) -> AspirationType {
        self.kind
    }

    pub fn level(&self, firm: usize) -> f64 {
        self.levels[firm]
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
