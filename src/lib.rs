pub mod arena;
pub mod error;
pub mod flock;
pub mod forces;
pub mod integrate;
pub mod spatial;

use serde::{Deserialize, Serialize};

pub use arena::Arena;
pub use error::FlockError;
pub use flock::{AnyFlock, Flock, Flock2, Flock3, FlockSummary};
pub use integrate::bound_norm;
pub use spatial::SpatialIndex;

/// Coefficients applied to each steering rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub separation: f64,
    pub alignment: f64,
    pub cohesion: f64,
    pub flee: f64,
    pub containment: f64,
    pub predator_seek: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            separation: 20.0 * 3.5,
            alignment: 20.0 / 15.0,
            cohesion: 1.0 / 10.0,
            flee: 20.0,
            containment: 1.0,
            predator_seek: 1.0,
        }
    }
}

/// Construction parameters for a flock.
///
/// `bounds` holds the upper extent of every axis (the lower extent is 0) and so also
/// fixes the dimensionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub n_boids: usize,
    pub n_predators: usize,
    pub min_speed: f64,
    pub max_speed: f64,
    pub predator_min_speed: f64,
    pub predator_max_speed: f64,
    pub view_radius: f64,
    pub avoid_radius: f64,
    pub weights: Weights,
    pub bounds: Vec<f64>,
    /// Percentage of each axis kept clear of containment force, inset from both walls.
    pub barrier_pct: f64,
    pub seed: Option<u64>,
}

impl Default for FlockConfig {
    fn default() -> Self {
        FlockConfig {
            n_boids: 0,
            n_predators: 0,
            min_speed: 4.0,
            max_speed: 5.0,
            predator_min_speed: 4.0,
            predator_max_speed: 10.0,
            view_radius: 10.0,
            avoid_radius: 3.0,
            weights: Weights::default(),
            bounds: vec![50.0, 50.0],
            barrier_pct: 5.0,
            seed: None,
        }
    }
}

impl FlockConfig {
    pub fn ndim(&self) -> usize {
        self.bounds.len()
    }
}
