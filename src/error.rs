//! Error type shared by every module of the toolbox

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RheoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to parse config file: {0}")]
    Config(#[from] toml::de::Error),

    #[error("File already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Unknown sample '{0}'")]
    UnknownSample(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Input ended before a value was given")]
    EndOfInput,

    #[error("No data in selection: {0}")]
    EmptySelection(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Figure rendering failed: {0}")]
    Figure(String),

    #[error("Report rendering failed: {0}")]
    Report(String),
}

pub type Result<T> = std::result::Result<T, RheoError>;
