use nalgebra::SVector;
use rand::Rng;

use crate::FlockError;

/// Axis-aligned domain `[0, upper]` with an inset barrier region.
///
/// Boids inside `[barrier_lower, barrier_upper]` feel no containment force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena<const D: usize> {
    upper: SVector<f64, D>,
    barrier_pct: f64,
    barrier_lower: SVector<f64, D>,
    barrier_upper: SVector<f64, D>,
}

impl<const D: usize> Arena<D> {
    /// `barrier_pct` is a percentage of each axis extent, inset from both ends.
    pub fn new(bounds: &[f64], barrier_pct: f64) -> Result<Self, FlockError> {
        if bounds.len() != D {
            return Err(FlockError::DimensionMismatch {
                expected: D,
                found: bounds.len(),
            });
        }
        if bounds.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err(FlockError::InvalidParameter {
                name: "bounds",
                reason: "every axis extent must be finite and positive",
            });
        }
        if !(0.0..50.0).contains(&barrier_pct) {
            return Err(FlockError::InvalidParameter {
                name: "barrier_pct",
                reason: "must lie in [0, 50)",
            });
        }

        let upper = SVector::<f64, D>::from_fn(|k, _| bounds[k]);
        let fraction = barrier_pct / 100.0;
        Ok(Arena {
            upper,
            barrier_pct,
            barrier_lower: upper * fraction,
            barrier_upper: upper * (1.0 - fraction),
        })
    }

    pub fn upper(&self) -> &SVector<f64, D> {
        &self.upper
    }

    pub fn barrier_pct(&self) -> f64 {
        self.barrier_pct
    }

    pub fn barrier_lower(&self) -> &SVector<f64, D> {
        &self.barrier_lower
    }

    pub fn barrier_upper(&self) -> &SVector<f64, D> {
        &self.barrier_upper
    }

    pub fn contains(&self, point: &SVector<f64, D>) -> bool {
        (0..D).all(|k| point[k] >= 0.0 && point[k] <= self.upper[k])
    }

    /// Uniform sample from the barrier inset.
    pub fn sample_inside<R: Rng>(&self, rng: &mut R) -> SVector<f64, D> {
        let span = self.barrier_upper - self.barrier_lower;
        SVector::<f64, D>::from_fn(|k, _| self.barrier_lower[k] + rng.random::<f64>() * span[k])
    }
}

/// Uniformly distributed unit vector, by rejection from the enclosing cube.
pub fn random_heading<R: Rng, const D: usize>(rng: &mut R) -> SVector<f64, D> {
    loop {
        let candidate = SVector::<f64, D>::from_fn(|_, _| rng.random_range(-1.0..=1.0));
        let norm = candidate.norm();
        if norm > 1e-9 && norm <= 1.0 {
            return candidate / norm;
        }
    }
}

/// Random velocity with uniform heading and speed uniform in `[min_speed, max_speed]`.
pub fn random_velocity<R: Rng, const D: usize>(
    rng: &mut R,
    min_speed: f64,
    max_speed: f64,
) -> SVector<f64, D> {
    let speed = min_speed + rng.random::<f64>() * (max_speed - min_speed);
    random_heading::<R, D>(rng) * speed
}
