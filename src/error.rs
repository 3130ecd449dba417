//! Error types for planet generation

use thiserror::Error;

/// Errors that can occur during planet generation or queries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanetError {
    /// Input parameters were rejected before any mutation took place
    #[error("invalid configuration: {0}")]
    DegenerateInput(String),

    /// An edge rotation was refused by the distortion predicate.
    ///
    /// This is non-fatal: the distortion pass counts it and moves on.
    #[error("edge {edge} cannot be rotated: {reason}")]
    ConstraintViolation {
        /// Index of the rejected edge
        edge: usize,
        /// Which part of the predicate failed
        reason: &'static str,
    },

    /// The mesh or topology is internally inconsistent
    #[error("structural invariant broken: {0}")]
    StructuralInvariantBroken(String),

    /// Requested tile ID does not exist
    #[error("tile not found: {0}")]
    TileNotFound(usize),
}

/// Result type alias for planet operations
pub type Result<T> = std::result::Result<T, PlanetError>;
