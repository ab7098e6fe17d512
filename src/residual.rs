//! Residual and error metrics for a fitted transform
//!
//! Every control point is pushed through the pixel → geo transform and
//! compared with its known position, both in degrees and in meters.

use serde::{Deserialize, Serialize};

use crate::gcp::{GeoPoint, GroundControlPoint};
use crate::geodesy::GeodesicDistance;

/// Starting value for the running maximum of meter errors
pub const MAX_ERROR_SENTINEL: f64 = -10000.0;

/// Quality of a fit measured on its own control points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// `sqrt(rmse_lat² + rmse_lon²)` in degrees
    pub rmse: f64,
    /// `sqrt(mean(meters))`.
    ///
    /// This roots the mean of the linear distances, not of their squares.
    /// Consumers depend on that definition, so it is kept as is.
    pub rmse_meters: f64,
    /// Largest single-point geodesic error in meters
    pub max_meters_error: f64,
}

impl ErrorMetrics {
    /// Metrics before any point has been evaluated
    pub fn empty() -> Self {
        Self {
            rmse: 0.0,
            rmse_meters: 0.0,
            max_meters_error: MAX_ERROR_SENTINEL,
        }
    }

    /// "Infinitely bad" result for predictions that leave the globe
    pub fn out_of_range() -> Self {
        Self {
            rmse: f64::MAX,
            rmse_meters: f64::MAX,
            max_meters_error: f64::MAX,
        }
    }

    pub fn is_out_of_range(&self) -> bool {
        self.rmse == f64::MAX
    }
}

impl Default for ErrorMetrics {
    fn default() -> Self {
        Self::empty()
    }
}

/// Per-point residual, useful when reporting which control point misfits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointResidual {
    pub predicted: GeoPoint,
    pub d_lon: f64,
    pub d_lat: f64,
    pub meters: f64,
}

/// Residual of one control point under `pixel_to_geo`, or `None` when the
/// prediction is not a valid geographic position
pub fn point_residual(
    pixel_to_geo: impl Fn(f64, f64) -> GeoPoint,
    gcp: &GroundControlPoint,
    geodesic: &dyn GeodesicDistance,
) -> Option<PointResidual> {
    let predicted = pixel_to_geo(gcp.pixel_x, gcp.pixel_y);
    if !predicted.in_range() {
        return None;
    }
    Some(PointResidual {
        predicted,
        d_lon: predicted.lon - gcp.lon,
        d_lat: predicted.lat - gcp.lat,
        meters: geodesic.distance_meters(predicted.lat, predicted.lon, gcp.lat, gcp.lon),
    })
}

/// Evaluate `pixel_to_geo` against every control point
pub fn evaluate(
    pixel_to_geo: impl Fn(f64, f64) -> GeoPoint,
    gcps: &[GroundControlPoint],
    geodesic: &dyn GeodesicDistance,
) -> ErrorMetrics {
    if gcps.is_empty() {
        return ErrorMetrics::empty();
    }

    let mut sum_sq_lat = 0.0;
    let mut sum_sq_lon = 0.0;
    let mut sum_meters = 0.0;
    let mut max_meters = MAX_ERROR_SENTINEL;

    for gcp in gcps {
        let Some(r) = point_residual(&pixel_to_geo, gcp, geodesic) else {
            return ErrorMetrics::out_of_range();
        };
        sum_sq_lat += r.d_lat * r.d_lat;
        sum_sq_lon += r.d_lon * r.d_lon;
        sum_meters += r.meters;
        if r.meters > max_meters {
            max_meters = r.meters;
        }
    }

    let n = gcps.len() as f64;
    let rmse_lat = (sum_sq_lat / n).sqrt();
    let rmse_lon = (sum_sq_lon / n).sqrt();

    ErrorMetrics {
        rmse: (rmse_lat * rmse_lat + rmse_lon * rmse_lon).sqrt(),
        rmse_meters: (sum_meters / n).sqrt(),
        max_meters_error: max_meters,
    }
}
