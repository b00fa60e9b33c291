//! Error types for the tracking kernel

use thiserror::Error;

/// Errors raised by the filter subsystem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Covariance could not be repaired to a symmetric positive-semidefinite
    /// matrix after predict/update.
    #[error("filter covariance degenerate after repair attempt")]
    Degenerate,

    /// Innovation covariance `S` was singular and could not be inverted.
    #[error("innovation covariance is singular")]
    SingularInnovation,
}

/// Errors raised by the association subsystem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssociationError {
    /// No feasible pairing exists in the cost matrix (every cell gated to infinity).
    #[error("no feasible assignment: all {rows}x{cols} cells are gated")]
    Infeasible { rows: usize, cols: usize },

    /// Cost matrix dimensions did not match the number of tracks/detections supplied.
    #[error("cost matrix dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

/// Errors raised by the tracker kernel, wrapping lower subsystem errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("association error: {0}")]
    Association(#[from] AssociationError),

    /// Fatal, whole-frame failure; the caller may retry with the next frame.
    #[error("frame processing failed: {0}")]
    FrameFailed(String),
}
