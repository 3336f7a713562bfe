use nalgebra::SVector;
use rayon::prelude::*;
use tracing::trace;

/// Relative slack around the speed bounds. A vector rescaled onto a bound can land a
/// few ULPs outside it and must not be rescaled again on the next pass.
const NORM_TOLERANCE: f64 = 8.0 * f64::EPSILON;

/// Rescale `v` so that its norm lies in `[min_norm, max_norm]`, up to rounding.
///
/// A zero vector has no heading to keep; when `min_norm` is positive it is given one
/// along the first axis.
pub fn bound_norm<const D: usize>(
    v: SVector<f64, D>,
    min_norm: f64,
    max_norm: f64,
) -> SVector<f64, D> {
    let norm = v.norm();
    if norm > max_norm * (1.0 + NORM_TOLERANCE) {
        v * (max_norm / norm)
    } else if norm < min_norm * (1.0 - NORM_TOLERANCE) {
        if norm > 0.0 {
            v * (min_norm / norm)
        } else {
            trace!(min_norm, "stationary agent given fallback heading");
            let mut fallback = SVector::<f64, D>::zeros();
            fallback[0] = min_norm;
            fallback
        }
    } else {
        v
    }
}

pub fn bound_norm_all<const D: usize>(
    vectors: &mut [SVector<f64, D>],
    min_norm: f64,
    max_norm: f64,
) {
    vectors
        .par_iter_mut()
        .for_each(|v| *v = bound_norm(*v, min_norm, max_norm));
}

/// Semi-implicit Euler step: velocity first, bounded, then position with the new velocity.
pub fn advance<const D: usize>(
    positions: &mut [SVector<f64, D>],
    velocities: &mut [SVector<f64, D>],
    accelerations: &[SVector<f64, D>],
    step: f64,
    min_speed: f64,
    max_speed: f64,
) {
    velocities
        .par_iter_mut()
        .zip(positions.par_iter_mut())
        .zip(accelerations.par_iter())
        .for_each(|((v, p), a)| {
            *v = bound_norm(*v + a * step, min_speed, max_speed);
            *p += *v * step;
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Vector2, Vector3};

    #[test]
    fn leaves_vectors_in_range_untouched() {
        let v = Vector2::new(3.0, 4.0);
        assert_eq!(bound_norm(v, 4.0, 6.0), v);
    }

    #[test]
    fn clamps_to_max_and_min() {
        let fast = bound_norm(Vector2::new(30.0, 40.0), 1.0, 5.0);
        assert!((fast - Vector2::new(3.0, 4.0)).norm() < 1e-12);

        let slow = bound_norm(Vector3::new(0.0, 0.3, 0.4), 2.0, 5.0);
        assert!((slow - Vector3::new(0.0, 1.2, 1.6)).norm() < 1e-12);
    }

    #[test]
    fn rescaled_vectors_are_stable() {
        let vs = [
            Vector3::new(3.1, -7.7, 0.3),
            Vector3::new(0.01, 0.02, -0.003),
            Vector3::new(123.0, 45.6, 78.9),
        ];
        for v in vs {
            let once = bound_norm(v, 4.0, 5.0);
            assert_eq!(bound_norm(once, 4.0, 5.0), once);
        }
        let edge = Vector2::new(5.0 * (1.0 + f64::EPSILON), 0.0);
        assert_eq!(bound_norm(edge, 4.0, 5.0), edge);
    }

    #[test]
    fn zero_vector_gets_fallback_heading() {
        let v = bound_norm(Vector3::zeros(), 2.0, 5.0);
        assert_eq!(v, Vector3::new(2.0, 0.0, 0.0));
        assert!(v.iter().all(|c| c.is_finite()));

        assert_eq!(bound_norm(Vector2::zeros(), 0.0, 5.0), Vector2::zeros());
    }

    #[test]
    fn advance_uses_updated_velocity() {
        let mut positions = vec![Vector2::new(0.0, 0.0)];
        let mut velocities = vec![Vector2::new(1.0, 0.0)];
        let accelerations = vec![Vector2::new(0.0, 2.0)];
        advance(&mut positions, &mut velocities, &accelerations, 0.5, 0.0, 10.0);
        assert_eq!(velocities[0], Vector2::new(1.0, 1.0));
        assert_eq!(positions[0], Vector2::new(0.5, 0.5));
    }

    #[test]
    fn bound_norm_all_applies_to_every_vector() {
        let mut vs = vec![
            Vector2::new(10.0, 0.0),
            Vector2::new(0.0, 0.1),
            Vector2::new(2.0, 0.0),
        ];
        bound_norm_all(&mut vs, 1.0, 3.0);
        assert!((vs[0] - Vector2::new(3.0, 0.0)).norm() < 1e-12);
        assert!((vs[1] - Vector2::new(0.0, 1.0)).norm() < 1e-12);
        assert_eq!(vs[2], Vector2::new(2.0, 0.0));
    }
}
