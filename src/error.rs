//! Error types for blockarc
//!
//! Every fallible archive operation returns exactly one of these kinds.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ArchiveError
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Unified error type for archive operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    // -------------------------------------------------------------------------
    // Name / Index Errors
    // -------------------------------------------------------------------------
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists in archive: {0}")]
    FileExists(String),

    #[error("Invalid file name: {0}")]
    BadFilename(String),

    #[error("File too large: {name} is {size} bytes (max {max})")]
    FileTooLarge { name: String, size: u64, max: u64 },

    // -------------------------------------------------------------------------
    // Backing Medium Errors
    // -------------------------------------------------------------------------
    #[error("Failed to open {path}: {source}")]
    FileOpenError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read failed: {0}")]
    FileReadError(String),

    #[error("Write failed: {0}")]
    FileWriteError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Block Errors
    // -------------------------------------------------------------------------
    #[error("Bad block: {0}")]
    BadBlock(String),

    #[error("Block index {index} out of range (total blocks: {total})")]
    BadBlockIndex { index: usize, total: usize },
}
