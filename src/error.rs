use thiserror::Error;

/// Failures raised by the session engine itself.
#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    /// `pop_next` was called on an exhausted queue. Callers guard with `is_empty`.
    #[error("challenge queue is empty")]
    EmptyQueue,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures reported by a classifier adapter. The session never propagates
/// these; a failed tick simply carries no reading.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("no reading available this tick")]
    NoReading,

    #[error("classifier source disconnected")]
    Disconnected,

    #[error("malformed classifier output: {0}")]
    Malformed(String),

    #[error("classifier i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("challenge catalog is empty")]
    Empty,

    #[error("duplicate challenge identifier: {0}")]
    Duplicate(String),

    #[error("malformed labels file at line {line}: {content:?}")]
    MalformedLabels { line: usize, content: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub type EngineResult<T> = Result<T, EngineError>;
pub type ClassifierResult<T> = Result<T, ClassifierError>;
