use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PatternError {
    #[error("Pattern must be a non-empty string")]
    Empty,

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
