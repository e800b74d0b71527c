use thiserror::Error;

/// Errors raised while configuring or mutating a flock.
#[derive(Debug, Error)]
pub enum FlockError {
    /// A world configuration value that cannot be simulated.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An obstacle description that is incomplete or ambiguous.
    #[error("invalid obstacle: {0}")]
    InvalidObstacle(&'static str),
    /// A per-boid override outside its allowed range.
    #[error("invalid override `{field}` = {value}")]
    InvalidOverride { field: &'static str, value: f64 },
    /// A boid placed outside the world rectangle.
    #[error("position ({x}, {y}) lies outside the world")]
    OutOfBounds { x: f64, y: f64 },
    #[error("no boid with id {0}")]
    UnknownBoid(u64),
    #[error("unknown scene id '{0}'")]
    UnknownScene(String),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FlockError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        FlockError::InvalidConfig(msg.into())
    }
}
