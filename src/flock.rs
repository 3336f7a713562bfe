use nalgebra::SVector;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::arena::{self, Arena};
use crate::forces;
use crate::integrate::{self, bound_norm_all};
use crate::spatial::SpatialIndex;
use crate::{FlockConfig, FlockError, Weights};

/// Boids and predators sharing one arena.
///
/// Every per-agent quantity lives in its own `Vec`, index aligned with the others of
/// the same population. `update` integrates with the acceleration computed at the end
/// of the previous call (or at construction), then recomputes it for the next one.
#[derive(Debug, Clone)]
pub struct Flock<const D: usize> {
    position: Vec<SVector<f64, D>>,
    velocity: Vec<SVector<f64, D>>,
    acceleration: Vec<SVector<f64, D>>,
    predator_position: Vec<SVector<f64, D>>,
    predator_velocity: Vec<SVector<f64, D>>,
    predator_acceleration: Vec<SVector<f64, D>>,
    weights: Weights,
    min_speed: f64,
    max_speed: f64,
    predator_min_speed: f64,
    predator_max_speed: f64,
    view_radius: f64,
    avoid_radius: f64,
    arena: Arena<D>,
    rng: StdRng,
}

pub type Flock2 = Flock<2>;
pub type Flock3 = Flock<3>;

/// Aggregate figures describing the current state of a flock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlockSummary {
    pub ndim: usize,
    pub boids: usize,
    pub predators: usize,
    pub centroid: Option<Vec<f64>>,
    pub mean_speed: f64,
    pub mean_predator_speed: f64,
}

impl<const D: usize> Flock<D> {
    /// Flock with `config.n_boids` boids placed and launched at random.
    pub fn new(config: &FlockConfig) -> Result<Self, FlockError> {
        Self::build(config, None)
    }

    /// Flock starting from caller-provided boid state.
    ///
    /// The slices are copied and the velocities rescaled into the speed range; the
    /// number of boids is taken from them rather than from `config.n_boids`.
    pub fn with_initial_state(
        config: &FlockConfig,
        positions: &[SVector<f64, D>],
        velocities: &[SVector<f64, D>],
    ) -> Result<Self, FlockError> {
        if positions.len() != velocities.len() {
            return Err(FlockError::InitialStateLength {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        Self::build(config, Some((positions, velocities)))
    }

    fn build(
        config: &FlockConfig,
        initial: Option<(&[SVector<f64, D>], &[SVector<f64, D>])>,
    ) -> Result<Self, FlockError> {
        if D != 2 && D != 3 {
            return Err(FlockError::UnsupportedDimension(D));
        }
        let arena = Arena::new(&config.bounds, config.barrier_pct)?;
        check_speed_bounds(config.min_speed, config.max_speed)?;
        check_speed_bounds(config.predator_min_speed, config.predator_max_speed)?;
        check_radii(config.avoid_radius, config.view_radius)?;
        check_weights(&config.weights)?;

        let mut rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        let (position, velocity) = match initial {
            Some((positions, velocities)) => {
                let mut velocity = velocities.to_vec();
                bound_norm_all(&mut velocity, config.min_speed, config.max_speed);
                (positions.to_vec(), velocity)
            }
            None => spawn(&arena, &mut rng, config.n_boids, config.min_speed, config.max_speed),
        };
        let (predator_position, predator_velocity) = spawn(
            &arena,
            &mut rng,
            config.n_predators,
            config.predator_min_speed,
            config.predator_max_speed,
        );

        let mut flock = Flock {
            acceleration: vec![SVector::zeros(); position.len()],
            predator_acceleration: vec![SVector::zeros(); predator_position.len()],
            position,
            velocity,
            predator_position,
            predator_velocity,
            weights: config.weights,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            predator_min_speed: config.predator_min_speed,
            predator_max_speed: config.predator_max_speed,
            view_radius: config.view_radius,
            avoid_radius: config.avoid_radius,
            arena,
            rng,
        };
        flock.compute_acceleration();
        debug!(
            ndim = D,
            boids = flock.len(),
            predators = flock.predator_count(),
            seeded = config.seed.is_some(),
            "flock initialised"
        );
        Ok(flock)
    }

    /// Advance every agent by `step` time units and recompute accelerations.
    pub fn update(&mut self, step: f64) {
        integrate::advance(
            &mut self.position,
            &mut self.velocity,
            &self.acceleration,
            step,
            self.min_speed,
            self.max_speed,
        );
        integrate::advance(
            &mut self.predator_position,
            &mut self.predator_velocity,
            &self.predator_acceleration,
            step,
            self.predator_min_speed,
            self.predator_max_speed,
        );
        self.compute_acceleration();
    }

    /// Overwrite both acceleration arrays from the current positions and velocities.
    pub fn compute_acceleration(&mut self) {
        self.acceleration.fill(SVector::zeros());
        self.predator_acceleration.fill(SVector::zeros());

        let Ok(index) = SpatialIndex::build(&self.position) else {
            trace!("no boids to index, accelerations left at zero");
            return;
        };
        let close = index.neighbours_of_all(&self.position, self.avoid_radius);
        let sight = index.neighbours_of_all(&self.position, self.view_radius);

        let weights = self.weights;
        let containment_strength = self.max_speed * weights.containment;
        let (position, velocity, arena, avoid_radius) =
            (&self.position, &self.velocity, &self.arena, self.avoid_radius);

        // Gather every boid's acceleration in parallel, then apply.
        self.acceleration = (0..position.len())
            .into_par_iter()
            .map(|b| {
                forces::separation(b, position, &close[b]) * weights.separation
                    + forces::alignment(b, velocity, &sight[b]) * weights.alignment
                    + forces::cohesion(b, position, &sight[b]) * weights.cohesion
                    + forces::containment(&position[b], arena, avoid_radius, containment_strength)
            })
            .collect();

        let Some(target) = forces::centroid(&self.position) else {
            return;
        };
        let flee_strength = weights.flee * self.max_speed;
        for (p, predator) in self.predator_position.iter().enumerate() {
            self.predator_acceleration[p] = forces::seek(predator, &target, weights.predator_seek);

            let nearby = index.within_radius(predator, self.view_radius);
            match forces::flee_direction(predator, &self.position, &nearby) {
                Some(direction) => {
                    for &b in &nearby {
                        self.acceleration[b] += direction * flee_strength;
                    }
                }
                None if !nearby.is_empty() => {
                    trace!(predator = p, "flee offsets cancel out, no flee applied");
                }
                None => {}
            }
        }
    }

    /// Spawn a predator somewhere inside the barrier inset, heading in a random direction.
    pub fn add_predator(&mut self) {
        let position = self.arena.sample_inside(&mut self.rng);
        let velocity =
            arena::random_velocity(&mut self.rng, self.predator_min_speed, self.predator_max_speed);
        self.predator_position.push(position);
        self.predator_velocity.push(velocity);
        self.predator_acceleration.push(SVector::zeros());
        debug!(predators = self.predator_count(), "predator added");
    }

    /// Drop the predator that has been around the longest. Does nothing without predators.
    pub fn remove_oldest_predator(&mut self) {
        if self.predator_position.is_empty() {
            return;
        }
        self.predator_position.remove(0);
        self.predator_velocity.remove(0);
        self.predator_acceleration.remove(0);
        debug!(predators = self.predator_count(), "oldest predator removed");
    }

    /// Replace every predator with caller-provided state, oldest first.
    ///
    /// Velocities are copied and rescaled into the predator speed range, and
    /// accelerations are recomputed right away.
    pub fn place_predators(
        &mut self,
        positions: &[SVector<f64, D>],
        velocities: &[SVector<f64, D>],
    ) -> Result<(), FlockError> {
        if positions.len() != velocities.len() {
            return Err(FlockError::InitialStateLength {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        self.predator_position = positions.to_vec();
        self.predator_velocity = velocities.to_vec();
        bound_norm_all(
            &mut self.predator_velocity,
            self.predator_min_speed,
            self.predator_max_speed,
        );
        self.predator_acceleration = vec![SVector::zeros(); positions.len()];
        self.compute_acceleration();
        debug!(predators = self.predator_count(), "predators placed");
        Ok(())
    }

    pub fn set_min_speed(&mut self, min_speed: f64) -> Result<(), FlockError> {
        self.set_speed_bounds(min_speed, self.max_speed)
    }

    pub fn set_max_speed(&mut self, max_speed: f64) -> Result<(), FlockError> {
        self.set_speed_bounds(self.min_speed, max_speed)
    }

    pub fn set_speed_bounds(&mut self, min_speed: f64, max_speed: f64) -> Result<(), FlockError> {
        check_speed_bounds(min_speed, max_speed)?;
        self.min_speed = min_speed;
        self.max_speed = max_speed;
        Ok(())
    }

    pub fn set_predator_min_speed(&mut self, min_speed: f64) -> Result<(), FlockError> {
        self.set_predator_speed_bounds(min_speed, self.predator_max_speed)
    }

    pub fn set_predator_max_speed(&mut self, max_speed: f64) -> Result<(), FlockError> {
        self.set_predator_speed_bounds(self.predator_min_speed, max_speed)
    }

    pub fn set_predator_speed_bounds(
        &mut self,
        min_speed: f64,
        max_speed: f64,
    ) -> Result<(), FlockError> {
        check_speed_bounds(min_speed, max_speed)?;
        self.predator_min_speed = min_speed;
        self.predator_max_speed = max_speed;
        Ok(())
    }

    pub fn set_view_radius(&mut self, view_radius: f64) -> Result<(), FlockError> {
        check_radii(self.avoid_radius, view_radius)?;
        self.view_radius = view_radius;
        Ok(())
    }

    pub fn set_avoid_radius(&mut self, avoid_radius: f64) -> Result<(), FlockError> {
        check_radii(avoid_radius, self.view_radius)?;
        self.avoid_radius = avoid_radius;
        Ok(())
    }

    pub fn set_weights(&mut self, weights: Weights) -> Result<(), FlockError> {
        check_weights(&weights)?;
        self.weights = weights;
        Ok(())
    }

    pub fn position(&self) -> &[SVector<f64, D>] {
        &self.position
    }

    pub fn velocity(&self) -> &[SVector<f64, D>] {
        &self.velocity
    }

    pub fn acceleration(&self) -> &[SVector<f64, D>] {
        &self.acceleration
    }

    pub fn predator_position(&self) -> &[SVector<f64, D>] {
        &self.predator_position
    }

    pub fn predator_velocity(&self) -> &[SVector<f64, D>] {
        &self.predator_velocity
    }

    pub fn predator_acceleration(&self) -> &[SVector<f64, D>] {
        &self.predator_acceleration
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn arena(&self) -> &Arena<D> {
        &self.arena
    }

    pub fn min_speed(&self) -> f64 {
        self.min_speed
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn predator_min_speed(&self) -> f64 {
        self.predator_min_speed
    }

    pub fn predator_max_speed(&self) -> f64 {
        self.predator_max_speed
    }

    pub fn view_radius(&self) -> f64 {
        self.view_radius
    }

    pub fn avoid_radius(&self) -> f64 {
        self.avoid_radius
    }

    pub fn ndim(&self) -> usize {
        D
    }

    /// Number of boids.
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn predator_count(&self) -> usize {
        self.predator_position.len()
    }

    pub fn centroid(&self) -> Option<SVector<f64, D>> {
        forces::centroid(&self.position)
    }

    pub fn summary(&self) -> FlockSummary {
        FlockSummary {
            ndim: D,
            boids: self.len(),
            predators: self.predator_count(),
            centroid: self.centroid().map(|c| c.iter().copied().collect()),
            mean_speed: mean_norm(&self.velocity),
            mean_predator_speed: mean_norm(&self.predator_velocity),
        }
    }
}

/// A flock whose dimensionality is only known at runtime, from `FlockConfig::bounds`.
///
/// Parameters and population are driven through the forwarding methods. Per-agent
/// arrays are borrowed from the typed flock, via [`AnyFlock::as_two`] /
/// [`AnyFlock::as_three`] or by matching on the variant.
#[derive(Debug, Clone)]
pub enum AnyFlock {
    Two(Flock<2>),
    Three(Flock<3>),
}

macro_rules! each_flock {
    ($any:expr, $flock:ident => $body:expr) => {
        match $any {
            AnyFlock::Two($flock) => $body,
            AnyFlock::Three($flock) => $body,
        }
    };
}

impl AnyFlock {
    pub fn new(config: &FlockConfig) -> Result<Self, FlockError> {
        match config.ndim() {
            2 => Ok(AnyFlock::Two(Flock::new(config)?)),
            3 => Ok(AnyFlock::Three(Flock::new(config)?)),
            n => Err(FlockError::UnsupportedDimension(n)),
        }
    }

    pub fn ndim(&self) -> usize {
        each_flock!(self, flock => flock.ndim())
    }

    pub fn update(&mut self, step: f64) {
        each_flock!(self, flock => flock.update(step))
    }

    pub fn len(&self) -> usize {
        each_flock!(self, flock => flock.len())
    }

    pub fn is_empty(&self) -> bool {
        each_flock!(self, flock => flock.is_empty())
    }

    pub fn predator_count(&self) -> usize {
        each_flock!(self, flock => flock.predator_count())
    }

    pub fn add_predator(&mut self) {
        each_flock!(self, flock => flock.add_predator())
    }

    pub fn remove_oldest_predator(&mut self) {
        each_flock!(self, flock => flock.remove_oldest_predator())
    }

    pub fn weights(&self) -> &Weights {
        each_flock!(self, flock => flock.weights())
    }

    pub fn set_weights(&mut self, weights: Weights) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_weights(weights))
    }

    pub fn as_two(&self) -> Option<&Flock<2>> {
        match self {
            AnyFlock::Two(flock) => Some(flock),
            AnyFlock::Three(_) => None,
        }
    }

    pub fn as_three(&self) -> Option<&Flock<3>> {
        match self {
            AnyFlock::Three(flock) => Some(flock),
            AnyFlock::Two(_) => None,
        }
    }

    pub fn min_speed(&self) -> f64 {
        each_flock!(self, flock => flock.min_speed())
    }

    pub fn max_speed(&self) -> f64 {
        each_flock!(self, flock => flock.max_speed())
    }

    pub fn predator_min_speed(&self) -> f64 {
        each_flock!(self, flock => flock.predator_min_speed())
    }

    pub fn predator_max_speed(&self) -> f64 {
        each_flock!(self, flock => flock.predator_max_speed())
    }

    pub fn view_radius(&self) -> f64 {
        each_flock!(self, flock => flock.view_radius())
    }

    pub fn avoid_radius(&self) -> f64 {
        each_flock!(self, flock => flock.avoid_radius())
    }

    pub fn set_min_speed(&mut self, min_speed: f64) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_min_speed(min_speed))
    }

    pub fn set_max_speed(&mut self, max_speed: f64) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_max_speed(max_speed))
    }

    pub fn set_predator_min_speed(&mut self, min_speed: f64) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_predator_min_speed(min_speed))
    }

    pub fn set_predator_max_speed(&mut self, max_speed: f64) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_predator_max_speed(max_speed))
    }

    pub fn set_speed_bounds(&mut self, min_speed: f64, max_speed: f64) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_speed_bounds(min_speed, max_speed))
    }

    pub fn set_predator_speed_bounds(
        &mut self,
        min_speed: f64,
        max_speed: f64,
    ) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_predator_speed_bounds(min_speed, max_speed))
    }

    pub fn set_view_radius(&mut self, view_radius: f64) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_view_radius(view_radius))
    }

    pub fn set_avoid_radius(&mut self, avoid_radius: f64) -> Result<(), FlockError> {
        each_flock!(self, flock => flock.set_avoid_radius(avoid_radius))
    }

    pub fn summary(&self) -> FlockSummary {
        each_flock!(self, flock => flock.summary())
    }
}

fn spawn<const D: usize>(
    arena: &Arena<D>,
    rng: &mut StdRng,
    count: usize,
    min_speed: f64,
    max_speed: f64,
) -> (Vec<SVector<f64, D>>, Vec<SVector<f64, D>>) {
    let position = (0..count).map(|_| arena.sample_inside(rng)).collect();
    let velocity = (0..count)
        .map(|_| arena::random_velocity(rng, min_speed, max_speed))
        .collect();
    (position, velocity)
}

fn mean_norm<const D: usize>(vectors: &[SVector<f64, D>]) -> f64 {
    if vectors.is_empty() {
        return 0.0;
    }
    vectors.iter().map(|v| v.norm()).sum::<f64>() / vectors.len() as f64
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), FlockError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FlockError::InvalidParameter {
            name,
            reason: "must be finite and non-negative",
        })
    }
}

fn check_speed_bounds(min_speed: f64, max_speed: f64) -> Result<(), FlockError> {
    check_non_negative("min_speed", min_speed)?;
    check_non_negative("max_speed", max_speed)?;
    if min_speed > max_speed {
        return Err(FlockError::SpeedBounds {
            min: min_speed,
            max: max_speed,
        });
    }
    Ok(())
}

fn check_radii(avoid_radius: f64, view_radius: f64) -> Result<(), FlockError> {
    check_non_negative("avoid_radius", avoid_radius)?;
    check_non_negative("view_radius", view_radius)?;
    if avoid_radius > view_radius {
        return Err(FlockError::Radii {
            avoid: avoid_radius,
            view: view_radius,
        });
    }
    Ok(())
}

fn check_weights(weights: &Weights) -> Result<(), FlockError> {
    let all = [
        weights.separation,
        weights.alignment,
        weights.cohesion,
        weights.flee,
        weights.containment,
        weights.predator_seek,
    ];
    if all.iter().all(|w| w.is_finite()) {
        Ok(())
    } else {
        Err(FlockError::InvalidParameter {
            name: "weights",
            reason: "every weight must be finite",
        })
    }
}
