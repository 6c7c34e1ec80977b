//! Error handling for spatial quality control operations.
//!
//! Fatal conditions only: running out of admissible points and detrend
//! failures reported by the interpolation backend. Per-station missing
//! values never surface here; they are absorbed as `None` residuals.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid configuration file {path}: {reason}")]
    ConfigurationFile { path: PathBuf, reason: String },

    /// The caller handed over an empty station array
    #[error("No stations available for quality control")]
    NoStations,

    /// Staging produced no point admissible for interpolation
    #[error("No valid points available for interpolation of {variable}")]
    NoValidPoints { variable: String },

    /// The detrending preprocessor rejected a point set
    #[error("Detrending failed: {message}")]
    Preprocessing { message: String },

    #[error("Data validation error: {message}")]
    DataValidation { message: String },

    #[error("Unknown meteorological variable: {name}")]
    UnknownVariable { name: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an error for a configuration file that could not be parsed
    pub fn configuration_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigurationFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a no-valid-points error for the given variable
    pub fn no_valid_points(variable: impl Into<String>) -> Self {
        Self::NoValidPoints {
            variable: variable.into(),
        }
    }

    /// Create a preprocessing error carrying the backend's message
    pub fn preprocessing(message: impl Into<String>) -> Self {
        Self::Preprocessing {
            message: message.into(),
        }
    }

    /// Create a data validation error
    pub fn data_validation(message: impl Into<String>) -> Self {
        Self::DataValidation {
            message: message.into(),
        }
    }

    /// Create an unknown variable error
    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::UnknownVariable { name: name.into() }
    }

    /// True for errors that mean "nothing left to interpolate"
    pub fn is_input_exhaustion(&self) -> bool {
        matches!(self, Self::NoStations | Self::NoValidPoints { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
