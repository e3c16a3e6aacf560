//! Error taxonomy for the recorder
//!
//! Inside `begin`/`end` every variant here is logged and swallowed: an
//! instrumentation fault must never alter the instrumented program's control
//! flow. Setup paths (config loading, replay) return these errors to the caller.

use thiserror::Error;

/// Errors raised by the recorder and its setup paths
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("timestamp map lock was poisoned by a panicking holder")]
    LockPoisoned,

    #[error("collaborator panicked: {what}")]
    CollaboratorPanicked { what: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("malformed replay event on line {line}: {source}")]
    ReplayParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for recorder setup operations
pub type Result<T> = std::result::Result<T, RecorderError>;
