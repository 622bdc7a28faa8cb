//! Error types for engine construction and persistence.

use std::fmt;

/// Errors surfaced by the tracking engine.
///
/// Only configuration problems are fatal; everything above that tier is
/// contained and recovered per the degraded-mode rules documented on the
/// engine.
#[derive(Debug, Clone)]
pub enum TrackerError {
    /// Invalid configuration, the engine refuses to initialize
    Configuration {
        /// Description of the configuration issue
        description: String,
    },

    /// Dimension mismatch between expected and actual
    DimensionMismatch {
        /// What was expected
        expected: usize,
        /// What was received
        actual: usize,
        /// Context (e.g., "transition matrix columns")
        context: String,
    },

    /// Loading or saving persisted matrices failed
    Persistence(PersistenceError),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Configuration { description } => {
                write!(f, "Configuration error: {}", description)
            }
            TrackerError::DimensionMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "Dimension mismatch for {}: expected {}, got {}",
                    context, expected, actual
                )
            }
            TrackerError::Persistence(e) => write!(f, "Persistence failed: {}", e),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PersistenceError> for TrackerError {
    fn from(e: PersistenceError) -> Self {
        TrackerError::Persistence(e)
    }
}

/// Errors from the delimited-text matrix store.
#[derive(Debug, Clone)]
pub enum PersistenceError {
    /// The file could not be read or written
    Io {
        /// Path of the artifact
        path: String,
        /// Underlying I/O detail
        detail: String,
    },

    /// A field failed numeric parsing
    MalformedField {
        /// Path of the artifact
        path: String,
        /// Zero-based row of the offending field
        row: usize,
        /// Zero-based column of the offending field
        column: usize,
    },

    /// The stored shape does not match the configured dimensions
    ShapeMismatch {
        /// Which artifact failed
        artifact: String,
        /// Expected (rows, columns)
        expected: (usize, usize),
        /// Actual (rows, columns) found on disk
        actual: (usize, usize),
    },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io { path, detail } => {
                write!(f, "I/O error on {}: {}", path, detail)
            }
            PersistenceError::MalformedField { path, row, column } => {
                write!(
                    f,
                    "Malformed numeric field in {} at row {}, column {}",
                    path, row, column
                )
            }
            PersistenceError::ShapeMismatch {
                artifact,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Shape mismatch for {}: expected {}x{}, found {}x{}",
                    artifact, expected.0, expected.1, actual.0, actual.1
                )
            }
        }
    }
}

impl std::error::Error for PersistenceError {}
