//! Scoring of first-order candidates against control points

use serde::{Deserialize, Serialize};

use crate::gcp::{GeoPoint, GroundControlPoint};
use crate::geodesy::GeodesicDistance;

/// Geographic axis a first-order candidate predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Lon,
    Lat,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Lon => write!(f, "lon"),
            Axis::Lat => write!(f, "lat"),
        }
    }
}

/// Scores `[c0, c1, c2]` in `c0 + c1*x + c2*y` against the control points.
///
/// The candidate supplies one axis and the control point's own value fills
/// the other, so only that axis contributes to the distance. The score is
/// `sqrt(mean(meters))`, lower is better. NaN predictions score NaN and
/// predictions outside the valid lon/lat range score `f64::MAX`.
pub struct FitnessFunction<'a> {
    axis: Axis,
    gcps: &'a [GroundControlPoint],
    geodesic: &'a dyn GeodesicDistance,
}

impl<'a> FitnessFunction<'a> {
    pub fn new(axis: Axis, gcps: &'a [GroundControlPoint], geodesic: &'a dyn GeodesicDistance) -> Self {
        Self { axis, gcps, geodesic }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn evaluate(&self, coefficients: &[f64; 3]) -> f64 {
        if self.gcps.is_empty() {
            return f64::MAX;
        }

        let mut sum_meters = 0.0;
        for gcp in self.gcps {
            let value =
                coefficients[0] + coefficients[1] * gcp.pixel_x + coefficients[2] * gcp.pixel_y;
            if value.is_nan() {
                return f64::NAN;
            }

            let predicted = match self.axis {
                Axis::Lon => GeoPoint::new(value, gcp.lat),
                Axis::Lat => GeoPoint::new(gcp.lon, value),
            };
            if !predicted.in_range() {
                return f64::MAX;
            }

            sum_meters += self
                .geodesic
                .distance_meters(gcp.lat, gcp.lon, predicted.lat, predicted.lon);
        }

        (sum_meters / self.gcps.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Haversine;

    fn gcps() -> Vec<GroundControlPoint> {
        [(0.0, 0.0), (100.0, 0.0), (0.0, 100.0), (80.0, 60.0)]
            .iter()
            .map(|&(x, y)| GroundControlPoint::new(x, y, 10.0 + 0.01 * x, 20.0 - 0.02 * y))
            .collect()
    }

    #[test]
    fn test_exact_coefficients_score_zero() {
        let points = gcps();
        let geodesic = Haversine::default();

        let lon = FitnessFunction::new(Axis::Lon, &points, &geodesic);
        assert!(lon.evaluate(&[10.0, 0.01, 0.0]) < 1e-3);

        let lat = FitnessFunction::new(Axis::Lat, &points, &geodesic);
        assert!(lat.evaluate(&[20.0, 0.0, -0.02]) < 1e-3);
    }

    #[test]
    fn test_worse_coefficients_score_higher() {
        let points = gcps();
        let geodesic = Haversine::default();
        let lon = FitnessFunction::new(Axis::Lon, &points, &geodesic);

        let near = lon.evaluate(&[10.001, 0.01, 0.0]);
        let far = lon.evaluate(&[10.1, 0.01, 0.0]);
        assert!(near > 0.0);
        assert!(far > near);
    }

    #[test]
    fn test_invalid_predictions() {
        let points = gcps();
        let geodesic = Haversine::default();
        let lat = FitnessFunction::new(Axis::Lat, &points, &geodesic);

        assert_eq!(lat.evaluate(&[95.0, 0.0, 0.0]), f64::MAX);
        assert!(lat.evaluate(&[f64::NAN, 0.0, 0.0]).is_nan());

        // Out of range for lat, fine for lon
        let lon = FitnessFunction::new(Axis::Lon, &points, &geodesic);
        assert!(lon.evaluate(&[95.0, 0.0, 0.0]) < f64::MAX);
    }
}
