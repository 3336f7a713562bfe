//! Steering rules for boids and predators.
//!
//! Neighbour lists handed to these functions come from
//! [`SpatialIndex`](crate::spatial::SpatialIndex) and include the boid they were
//! queried for. Each rule accounts for that explicitly.

use nalgebra::SVector;

use crate::arena::Arena;

/// Sum of offsets pointing away from every boid in `close`.
///
/// The boid's own entry contributes a zero offset, so a boid with nobody inside its
/// avoid radius gets a zero vector.
pub fn separation<const D: usize>(
    boid: usize,
    positions: &[SVector<f64, D>],
    close: &[usize],
) -> SVector<f64, D> {
    let here = positions[boid];
    close
        .iter()
        .fold(SVector::zeros(), |acc, &other| acc + (here - positions[other]))
}

/// Mean of `values` over `neighbours` minus `values[boid]`, skipping the boid itself.
///
/// Zero when the boid is the only member of its neighbourhood.
fn steer_towards_mean<const D: usize>(
    boid: usize,
    values: &[SVector<f64, D>],
    neighbours: &[usize],
) -> SVector<f64, D> {
    let (sum, count) = neighbours
        .iter()
        .filter(|&&other| other != boid)
        .fold((SVector::zeros(), 0usize), |(sum, count), &other| {
            (sum + values[other], count + 1)
        });
    if count == 0 {
        return SVector::zeros();
    }
    sum / count as f64 - values[boid]
}

/// Correction from the boid's velocity towards the mean velocity of its neighbours.
pub fn alignment<const D: usize>(
    boid: usize,
    velocities: &[SVector<f64, D>],
    sight: &[usize],
) -> SVector<f64, D> {
    steer_towards_mean(boid, velocities, sight)
}

/// Correction from the boid's position towards the centroid of its neighbours.
pub fn cohesion<const D: usize>(
    boid: usize,
    positions: &[SVector<f64, D>],
    sight: &[usize],
) -> SVector<f64, D> {
    steer_towards_mean(boid, positions, sight)
}

/// Inward nudge for a boid whose avoid radius pokes out of the barrier inset.
///
/// Each axis is checked on its own, so a boid in a corner is pushed along both. When
/// the radius spans the whole inset, the upper wall wins.
pub fn containment<const D: usize>(
    position: &SVector<f64, D>,
    arena: &Arena<D>,
    avoid_radius: f64,
    strength: f64,
) -> SVector<f64, D> {
    let mut nudge = SVector::<f64, D>::zeros();
    for dim in 0..D {
        if position[dim] - avoid_radius < arena.barrier_lower()[dim] {
            nudge[dim] = 1.0;
        }
        if position[dim] + avoid_radius > arena.barrier_upper()[dim] {
            nudge[dim] = -1.0;
        }
    }
    nudge * strength
}

/// Unit direction pointing from a predator through the boids it has spotted.
///
/// `None` when nobody is in range, or when the offsets cancel out and there is no
/// direction to flee in.
pub fn flee_direction<const D: usize>(
    predator: &SVector<f64, D>,
    positions: &[SVector<f64, D>],
    nearby: &[usize],
) -> Option<SVector<f64, D>> {
    if nearby.is_empty() {
        return None;
    }
    let away = nearby
        .iter()
        .fold(SVector::<f64, D>::zeros(), |acc, &b| acc + (positions[b] - predator));
    away.try_normalize(f64::EPSILON)
}

pub fn centroid<const D: usize>(positions: &[SVector<f64, D>]) -> Option<SVector<f64, D>> {
    if positions.is_empty() {
        return None;
    }
    let sum = positions.iter().fold(SVector::zeros(), |acc, p| acc + p);
    Some(sum / positions.len() as f64)
}

/// Predator acceleration towards the flock centroid.
pub fn seek<const D: usize>(
    predator: &SVector<f64, D>,
    target: &SVector<f64, D>,
    weight: f64,
) -> SVector<f64, D> {
    (target - predator) * weight
}
