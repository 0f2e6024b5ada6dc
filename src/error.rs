//! Error types for loading tumor tables and writing the network.
//!
//! Load and row errors are recoverable: the caller logs them and keeps going.
//! Write errors abort the run.

use std::path::PathBuf;
use thiserror::Error;

/// A tumor table that could not be used at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("tumor file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no '{column}' column (found: {found})", path.display())]
    MissingColumn {
        path: PathBuf,
        column: String,
        found: String,
    },
}

/// A single row that was dropped while loading.
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("row {row}: correlation '{value}' is not a finite number")]
    InvalidCorrelation { row: usize, value: String },

    #[error("row {row}: empty gene symbol")]
    EmptyGeneSymbol { row: usize },

    #[error("row {row}: {message}")]
    Malformed { row: usize, message: String },
}

/// Failure to emit the rendered network.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize network payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
