//! Polynomial imagery transform
//!
//! An [`ImageryTransform`] maps pixel coordinates to geographic coordinates
//! and back with a pair of independently fitted polynomials of the same
//! order. It keeps the control points it was fitted from and the error
//! metrics measured on them.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};
use crate::fingerprint::fingerprint;
use crate::gcp::{canonicalize, GeoPoint, GroundControlPoint, PixelPoint};
use crate::geodesy::{GeodesicDistance, Vincenty};
use crate::polynomial::{Order, TransformCoefficients};
use crate::residual::{self, ErrorMetrics, PointResidual};
use crate::solve::{self, SolveMethod};

/// Fitted pixel ↔ geo polynomial transform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TransformRecord")]
pub struct ImageryTransform {
    order: Order,
    method: SolveMethod,
    /// (pixel x, pixel y) → (lon, lat)
    pixel_to_geo: TransformCoefficients,
    /// (lon, lat) → (pixel x, pixel y)
    geo_to_pixel: TransformCoefficients,
    /// Canonically ordered copy of the control points
    gcps: Vec<GroundControlPoint>,
    metrics: ErrorMetrics,
    #[serde(skip)]
    fitted: bool,
}

impl ImageryTransform {
    /// Unfitted transform; both directions evaluate to zero until
    /// [`find_transform`](Self::find_transform) succeeds
    pub fn new(order: Order, method: SolveMethod) -> Self {
        Self {
            order,
            method,
            pixel_to_geo: TransformCoefficients::zeroed(order),
            geo_to_pixel: TransformCoefficients::zeroed(order),
            gcps: Vec::new(),
            metrics: ErrorMetrics::empty(),
            fitted: false,
        }
    }

    /// Rebuild a transform from stored coefficients.
    ///
    /// `gcps` may be empty, in which case the metrics stay empty.
    pub fn from_coefficients(
        order: Order,
        pixel_to_geo: TransformCoefficients,
        geo_to_pixel: TransformCoefficients,
        gcps: &[GroundControlPoint],
    ) -> Result<Self> {
        pixel_to_geo.check_len(order)?;
        geo_to_pixel.check_len(order)?;

        let mut transform = Self {
            order,
            method: SolveMethod::default(),
            pixel_to_geo,
            geo_to_pixel,
            gcps: canonicalize(gcps)?,
            metrics: ErrorMetrics::empty(),
            fitted: true,
        };
        transform.metrics = transform.evaluate_metrics(&Vincenty::default());
        Ok(transform)
    }

    /// Fit both directions from `gcps` and measure the result, using
    /// Vincenty distances for the meter metrics
    pub fn find_transform(&mut self, gcps: &[GroundControlPoint]) -> Result<()> {
        self.find_transform_with(gcps, &Vincenty::default())
    }

    /// [`find_transform`](Self::find_transform) with a caller supplied
    /// distance primitive.
    ///
    /// On error the transform is left unchanged.
    pub fn find_transform_with(
        &mut self,
        gcps: &[GroundControlPoint],
        geodesic: &dyn GeodesicDistance,
    ) -> Result<()> {
        let gcps = canonicalize(gcps)?;
        let fitted = solve::fit(&gcps, self.order, self.method)?;

        self.pixel_to_geo = fitted.pixel_to_geo;
        self.geo_to_pixel = fitted.geo_to_pixel;
        self.gcps = gcps;
        self.fitted = true;
        self.metrics = self.evaluate_metrics(geodesic);

        tracing::debug!(
            "Fitted order {} transform ({}) from {} points: rmse {:.3e}°, rmse_meters {:.3}, max {:.3} m",
            self.order,
            self.method,
            self.gcps.len(),
            self.metrics.rmse,
            self.metrics.rmse_meters,
            self.metrics.max_meters_error
        );

        Ok(())
    }

    fn evaluate_metrics(&self, geodesic: &dyn GeodesicDistance) -> ErrorMetrics {
        residual::evaluate(|x, y| self.pixel_to_geo(x, y), &self.gcps, geodesic)
    }

    /// Map a pixel position to geographic coordinates
    #[inline]
    pub fn pixel_to_geo(&self, x: f64, y: f64) -> GeoPoint {
        let (lon, lat) = self.pixel_to_geo.apply(self.order, x, y);
        GeoPoint::new(lon, lat)
    }

    /// Map a geographic position to pixel coordinates
    #[inline]
    pub fn geo_to_pixel(&self, lon: f64, lat: f64) -> PixelPoint {
        let (x, y) = self.geo_to_pixel.apply(self.order, lon, lat);
        PixelPoint::new(x, y)
    }

    /// Batch version of [`pixel_to_geo`](Self::pixel_to_geo), evaluated in parallel
    pub fn pixels_to_geo(&self, pixels: &[PixelPoint]) -> Vec<GeoPoint> {
        pixels
            .par_iter()
            .map(|p| self.pixel_to_geo(p.x, p.y))
            .collect()
    }

    /// Batch version of [`geo_to_pixel`](Self::geo_to_pixel), evaluated in parallel
    pub fn geos_to_pixel(&self, points: &[GeoPoint]) -> Vec<PixelPoint> {
        points
            .par_iter()
            .map(|p| self.geo_to_pixel(p.lon, p.lat))
            .collect()
    }

    /// Per-point residuals; `None` marks predictions off the globe
    pub fn residuals(&self, geodesic: &dyn GeodesicDistance) -> Vec<Option<PointResidual>> {
        self.gcps
            .iter()
            .map(|gcp| residual::point_residual(|x, y| self.pixel_to_geo(x, y), gcp, geodesic))
            .collect()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn order_size(&self) -> usize {
        self.order.size()
    }

    pub fn method(&self) -> SolveMethod {
        self.method
    }

    pub fn gcps(&self) -> &[GroundControlPoint] {
        &self.gcps
    }

    pub fn pixel_to_geo_coefficients(&self) -> &TransformCoefficients {
        &self.pixel_to_geo
    }

    pub fn geo_to_pixel_coefficients(&self) -> &TransformCoefficients {
        &self.geo_to_pixel
    }

    pub fn metrics(&self) -> &ErrorMetrics {
        &self.metrics
    }

    /// Combined RMSE in degrees
    pub fn rmse(&self) -> f64 {
        self.metrics.rmse
    }

    pub fn rmse_meters(&self) -> f64 {
        self.metrics.rmse_meters
    }

    pub fn max_meters_error(&self) -> f64 {
        self.metrics.max_meters_error
    }

    /// Stable identity of `(order, control points)`
    pub fn fingerprint(&self) -> String {
        fingerprint(self.order, &self.gcps)
    }
}

/// Serialized form, validated on the way back in
#[derive(Deserialize)]
struct TransformRecord {
    order: Order,
    #[serde(default)]
    method: SolveMethod,
    pixel_to_geo: TransformCoefficients,
    geo_to_pixel: TransformCoefficients,
    #[serde(default)]
    gcps: Vec<GroundControlPoint>,
}

impl TryFrom<TransformRecord> for ImageryTransform {
    type Error = TransformError;

    fn try_from(record: TransformRecord) -> Result<Self> {
        let mut transform = ImageryTransform::from_coefficients(
            record.order,
            record.pixel_to_geo,
            record.geo_to_pixel,
            &record.gcps,
        )?;
        transform.method = record.method;
        Ok(transform)
    }
}
