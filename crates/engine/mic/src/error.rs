//! Error types for mic grid files
//!
//! Two tiers: [`MicError`] aborts the whole operation, [`RowError`] describes a
//! single data line that was reported and skipped while parsing continued.

use crate::grid::GridType;
use std::io;
use thiserror::Error;

/// Fatal errors. The grid must not be used after a read fails with one of these.
#[derive(Debug, Error)]
pub enum MicError {
    #[error("malformed {grid_type} mic header: {reason}")]
    MalformedHeader {
        grid_type: GridType,
        reason: String,
    },

    #[error("{operation} is not supported for {grid_type} mic files")]
    Unsupported {
        grid_type: GridType,
        operation: &'static str,
    },

    #[error("grid type mismatch: expected {expected} mic, found {found} mic")]
    GridTypeMismatch { expected: GridType, found: GridType },

    #[error("unknown grid type: {0}")]
    UnknownGridType(String),

    #[error("{operation} called on a square mic without sample limits")]
    Uninitialized { operation: &'static str },

    #[error("invalid resolution: {0} (must be finite and > 0)")]
    InvalidResolution(f64),

    #[error("resolution change would produce {requested} voxels, limit is {limit}")]
    TooManyVoxels { requested: f64, limit: usize },

    #[error("voxel side length {voxel} exceeds sample side length {sample}")]
    VoxelLargerThanSample { voxel: f64, sample: f64 },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Recoverable problems with a single data line.
///
/// Line numbers are 1-based positions in the source text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("line {line}: expected at least {expected} columns, found {found}")]
    TooFewColumns {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: column {column} is not a valid number: {value:?}")]
    InvalidField {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("line {line}: generation {generation} outside 0..={max}")]
    GenerationOutOfRange {
        line: usize,
        generation: i64,
        max: u32,
    },
}

impl RowError {
    /// Line number the error refers to.
    pub fn line(&self) -> usize {
        match self {
            RowError::TooFewColumns { line, .. }
            | RowError::InvalidField { line, .. }
            | RowError::GenerationOutOfRange { line, .. } => *line,
        }
    }
}

pub type Result<T> = std::result::Result<T, MicError>;
