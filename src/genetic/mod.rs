//! Genetic search for first-order coefficients
//!
//! A fallback for point sets the least-squares builder cannot handle. Each
//! pixel → geo axis is searched independently on its own thread with its
//! own random generator, so results are reproducible for a fixed seed.

mod fitness;
mod gene;
mod lifecycle;

pub use fitness::{Axis, FitnessFunction};
pub use gene::{CoefficientGene, GeneError, GENE_WIDTH};
pub use lifecycle::{
    AxisOutcome, Candidate, GeneticConfig, GeneticConfigError, LifeCycle, LifeCycleState,
};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, TransformError};
use crate::gcp::{canonicalize, GroundControlPoint};
use crate::geodesy::GeodesicDistance;
use crate::polynomial::{Order, TransformCoefficients};
use crate::solve::{self, SolveMethod};
use crate::transform::ImageryTransform;

/// Outcome of a two-axis search
#[derive(Debug, Clone, Serialize)]
pub struct GeneticFit {
    pub lon: AxisOutcome,
    pub lat: AxisOutcome,
}

impl GeneticFit {
    /// First-order pixel → geo coefficients from both axes
    pub fn pixel_to_geo(&self) -> TransformCoefficients {
        TransformCoefficients::new(self.lon.coefficients.to_vec(), self.lat.coefficients.to_vec())
    }

    pub fn converged(&self) -> bool {
        matches!(self.lon.state, LifeCycleState::Converged { .. })
            && matches!(self.lat.state, LifeCycleState::Converged { .. })
    }

    /// Combine the searched pixel → geo direction with a least-squares
    /// geo → pixel direction.
    ///
    /// The geo → pixel direction is left zeroed when the points cannot
    /// support a first-order fit.
    pub fn to_transform(
        &self,
        gcps: &[GroundControlPoint],
        method: SolveMethod,
    ) -> Result<ImageryTransform> {
        let points = canonicalize(gcps)?;
        let geo_to_pixel = match solve::fit(&points, Order::MIN, method) {
            Ok(fitted) => fitted.geo_to_pixel,
            Err(e) => {
                warn!("No least-squares geo -> pixel direction: {}", e);
                TransformCoefficients::zeroed(Order::MIN)
            }
        };
        ImageryTransform::from_coefficients(Order::MIN, self.pixel_to_geo(), geo_to_pixel, &points)
    }
}

/// Search first-order pixel → geo coefficients for both axes in parallel
pub fn evolve_first_order(
    gcps: &[GroundControlPoint],
    config: &GeneticConfig,
    geodesic: &dyn GeodesicDistance,
) -> Result<GeneticFit> {
    config.validate()?;
    let points = canonicalize(gcps)?;
    if points.len() < Order::MIN.size() {
        return Err(TransformError::InsufficientPoints {
            required: Order::MIN.size(),
            actual: points.len(),
        });
    }

    let (lon_rng, lat_rng) = match config.seed {
        Some(seed) => (
            StdRng::seed_from_u64(seed),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        ),
        None => (StdRng::from_os_rng(), StdRng::from_os_rng()),
    };

    info!(
        "Starting genetic search over {} points (population {}, up to {} generations)",
        points.len(),
        config.population,
        config.max_generations
    );

    let run = |axis, rng| {
        let fitness = FitnessFunction::new(axis, &points, geodesic);
        LifeCycle::new(config.clone(), fitness, rng).map(LifeCycle::run)
    };
    let (lon, lat) = rayon::join(|| run(Axis::Lon, lon_rng), || run(Axis::Lat, lat_rng));

    Ok(GeneticFit {
        lon: lon?,
        lat: lat?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Haversine;

    fn gcps() -> Vec<GroundControlPoint> {
        (0..9)
            .map(|i| {
                let x = (i % 3) as f64 * 400.0 + (i as f64) * 3.0;
                let y = (i / 3) as f64 * 300.0;
                GroundControlPoint::new(x, y, -3.0 + 0.001 * x, 51.0 - 0.001 * y)
            })
            .collect()
    }

    fn config(seed: u64) -> GeneticConfig {
        GeneticConfig {
            population: 50,
            max_generations: 30,
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_seeded_search_is_reproducible() {
        let geodesic = Haversine::default();
        let a = evolve_first_order(&gcps(), &config(21), &geodesic).unwrap();
        let b = evolve_first_order(&gcps(), &config(21), &geodesic).unwrap();

        assert_eq!(a.lon.axis, Axis::Lon);
        assert_eq!(a.lat.axis, Axis::Lat);
        assert_eq!(a.lon.coefficients, b.lon.coefficients);
        assert_eq!(a.lat.coefficients, b.lat.coefficients);
        assert!(a.lon.state.generation() <= 30);
        assert!(a.lat.state.generation() <= 30);
    }

    #[test]
    fn test_pixel_to_geo_layout() {
        let geodesic = Haversine::default();
        let fit = evolve_first_order(&gcps(), &config(5), &geodesic).unwrap();
        let coefficients = fit.pixel_to_geo();
        assert_eq!(coefficients.x(), &fit.lon.coefficients[..]);
        assert_eq!(coefficients.y(), &fit.lat.coefficients[..]);
    }

    #[test]
    fn test_converted_transform_inverse_is_least_squares() {
        let geodesic = Haversine::default();
        let fit = evolve_first_order(&gcps(), &config(8), &geodesic).unwrap();
        let transform = fit.to_transform(&gcps(), SolveMethod::Svd).unwrap();

        assert_eq!(transform.order(), Order::MIN);
        let pixel = transform.geo_to_pixel(-3.0 + 0.4, 51.0 - 0.3);
        assert!((pixel.x - 400.0).abs() < 1e-6);
        assert!((pixel.y - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_collinear_points_still_convert() {
        let geodesic = Haversine::default();
        let line: Vec<_> = (0..6)
            .map(|i| GroundControlPoint::new(i as f64 * 50.0, i as f64 * 50.0, 7.0 + i as f64 * 0.05, 45.0))
            .collect();
        let fit = evolve_first_order(&line, &config(13), &geodesic).unwrap();
        let transform = fit.to_transform(&line, SolveMethod::Svd).unwrap();

        assert_eq!(transform.geo_to_pixel_coefficients(), &TransformCoefficients::zeroed(Order::MIN));
        assert_eq!(transform.pixel_to_geo_coefficients(), &fit.pixel_to_geo());
    }

    #[test]
    fn test_invalid_probability_rejected_before_search() {
        let geodesic = Haversine::default();
        let config = GeneticConfig {
            mutation_probability: 1.5,
            ..config(3)
        };
        let err = evolve_first_order(&gcps(), &config, &geodesic).unwrap_err();
        assert_eq!(
            err,
            TransformError::GeneticConfig(GeneticConfigError::Probability {
                field: "mutation_probability",
                value: 1.5
            })
        );
    }

    #[test]
    fn test_needs_three_points() {
        let geodesic = Haversine::default();
        let err = evolve_first_order(&gcps()[..2], &config(1), &geodesic).unwrap_err();
        assert!(matches!(err, TransformError::InsufficientPoints { actual: 2, .. }));
    }
}
