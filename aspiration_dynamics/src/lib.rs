//! Aspirations and Technological Choice under Uncertainty ABM
//!
//! A population of firms repeatedly decides whether to search for a new
//! technology or keep exploiting its current one. A firm searches when its
//! last performance fell short of its aspiration level. Aspirations adapt
//! under one of four rules:
//!
//! - Historical: own past performance
//! - Social: performance of a peer reference group
//! - Mixed: weighted blend of both
//! - Switching: whichever of the two is higher
//!
//! Per period, for every firm i:
//!
//!   M(t) = v × M(t-1) + (1 - v) × ε,                    ε ~ N(0,1)
//!   T(t) = max(d × T(t-1), S) if P(t-1) < A(t-1),      S ~ N(0,1)
//!        = d × T(t-1)          otherwise
//!   P(t) = T(t) + M(t)
//!   A(t) = γ × A(t-1) + (1 - γ) × (1 + μ) × R(t)
//!
//! where R(t) is built from P(t) and the peer reference of the same period.
//!
//! The experiment crosses two levels of technological deterioration (d)
//! with two levels of market turbulence (v) and the four aspiration rules,
//! repeated over independent runs. Each firm's mean performance and its
//! standard deviation ("risk") over the run become one record.

pub mod analysis;
pub mod aspiration;
pub mod cli;
pub mod config;
pub mod error;
pub mod experiment;
pub mod output;
pub mod params;
pub mod peer;
pub mod simulation;
pub mod stats;

pub use aspiration::{AspirationPolicy, AspirationType};
pub use config::ExperimentConfig;
pub use error::{Result, SimError};
pub use experiment::{run_experiment, Experiment, ExperimentRecord};
pub use params::{ModelParams, UncertaintyLevel, UncertaintyRegime};
pub use peer::{PeerResolver, PeerStrategy};
pub use simulation::{run_single, FirmSummary, Simulation, SimulationConfig, Trajectory};
