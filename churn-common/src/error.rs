//! Common error types for the churn client

use thiserror::Error;

/// Common result type for churn client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the client crates
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP client construction or transport error (wraps reqwest::Error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed value supplied on the command line, env or config file
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
