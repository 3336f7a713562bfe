use thiserror::Error;

use crate::spatial::IndexError;

/// Errors raised while building or reconfiguring a flock.
#[derive(Debug, Error, PartialEq)]
pub enum FlockError {
    /// Only planar and spatial flocks are simulated.
    #[error("unsupported dimensionality {0}, expected 2 or 3")]
    UnsupportedDimension(usize),
    #[error("bounds describe {found} axes but the flock is {expected}-dimensional")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    #[error("minimum speed {min} exceeds maximum speed {max}")]
    SpeedBounds { min: f64, max: f64 },
    #[error("avoid radius {avoid} exceeds view radius {view}")]
    Radii { avoid: f64, view: f64 },
    #[error("{positions} initial positions supplied with {velocities} initial velocities")]
    InitialStateLength { positions: usize, velocities: usize },
    #[error(transparent)]
    Index(#[from] IndexError),
}
