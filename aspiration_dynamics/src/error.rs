use thiserror::Error;

/// Errors raised by the simulation, the experiment driver and the output layer
///
/// Configuration errors are raised when a simulator or experiment is
/// constructed, never in the middle of a run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Unknown aspiration type or an out-of-range parameter
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Peer-reference strategy name not recognised
    #[error("unknown peer-reference strategy: {0:?}")]
    UnknownStrategy(String),

    /// A worker panicked while executing one job of the sweep
    #[error("simulation job {job} failed: {message}")]
    RunFailed { job: usize, message: String },

    /// Record table cannot be analysed (empty, unbalanced, no residual)
    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to parse experiment config: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
