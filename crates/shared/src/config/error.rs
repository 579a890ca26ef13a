//! Errors raised while reading `LAUNCHER_*` settings

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// `--env-file` points at nothing
    #[error("Env file {path} does not exist")]
    EnvFileNotFound { path: PathBuf },

    #[error("Cannot read env file {path}: {source}")]
    EnvFileLoad {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },

    /// One of the image variables has no value
    #[error("{var} must be set")]
    MissingRequired { var: String },

    #[error("{var}={value:?} is not {expected}")]
    InvalidValue {
        var: String,
        value: String,
        expected: &'static str,
    },

    /// Entry of a `k=v,k=v` list without `=` or with an empty key
    #[error("{var} has malformed entry {entry:?}, expected key=value")]
    MalformedEntry { var: String, entry: String },

    /// Values parse but do not make sense together
    #[error("Invalid launcher configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
