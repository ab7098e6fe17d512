//! Order selection with backoff
//!
//! The factory picks the highest order the number of control points allows
//! and steps down one order at a time whenever a fit fails, so degenerate
//! point layouts still produce the best transform they can support.

use tracing::{debug, info, warn};

use crate::error::{Result, TransformError};
use crate::gcp::{canonicalize, GroundControlPoint};
use crate::geodesy::{GeodesicDistance, Vincenty};
use crate::polynomial::Order;
use crate::solve::SolveMethod;
use crate::transform::ImageryTransform;

/// Builds transforms, retrying at lower orders on failure
#[derive(Debug, Clone, Copy)]
pub struct TransformFactory {
    method: SolveMethod,
    max_order: Order,
}

impl Default for TransformFactory {
    fn default() -> Self {
        Self {
            method: SolveMethod::default(),
            max_order: Order::MAX,
        }
    }
}

impl TransformFactory {
    pub fn new(method: SolveMethod, max_order: Order) -> Self {
        Self { method, max_order }
    }

    pub fn method(&self) -> SolveMethod {
        self.method
    }

    pub fn max_order(&self) -> Order {
        self.max_order
    }

    /// Fit at the highest order the point count supports
    pub fn best_fit(&self, gcps: &[GroundControlPoint]) -> Result<Option<ImageryTransform>> {
        self.best_fit_with(gcps, &Vincenty::default())
    }

    pub fn best_fit_with(
        &self,
        gcps: &[GroundControlPoint],
        geodesic: &dyn GeodesicDistance,
    ) -> Result<Option<ImageryTransform>> {
        self.create_highest_feasible_with(gcps, self.max_order, geodesic)
    }

    /// Fit at `requested`, stepping down when the solve fails.
    ///
    /// Returns `Ok(None)` when even order 1 cannot be fitted (for example
    /// when every point is collinear). Fewer than three distinct points is
    /// an error. A fit whose predictions leave the valid lon/lat range is
    /// still returned; its metrics carry the out-of-range sentinel.
    pub fn create_highest_feasible(
        &self,
        gcps: &[GroundControlPoint],
        requested: Order,
    ) -> Result<Option<ImageryTransform>> {
        self.create_highest_feasible_with(gcps, requested, &Vincenty::default())
    }

    pub fn create_highest_feasible_with(
        &self,
        gcps: &[GroundControlPoint],
        requested: Order,
        geodesic: &dyn GeodesicDistance,
    ) -> Result<Option<ImageryTransform>> {
        let points = canonicalize(gcps)?;
        let feasible =
            Order::for_point_count(points.len()).ok_or(TransformError::InsufficientPoints {
                required: Order::MIN.size(),
                actual: points.len(),
            })?;

        let start = requested.min(feasible).min(self.max_order);
        if start < requested {
            debug!(
                "Order {} requested, {} points allow at most order {}",
                requested,
                points.len(),
                start
            );
        }

        let mut order = start;
        loop {
            let mut transform = ImageryTransform::new(order, self.method);
            let failure = match transform.find_transform_with(&points, geodesic) {
                Ok(()) => {
                    if order < start {
                        info!("Fitted order {} transform after backing off from order {}", order, start);
                    }
                    if transform.metrics().is_out_of_range() {
                        warn!(
                            "Order {} transform maps a control point outside the valid lon/lat range",
                            order
                        );
                    }
                    return Ok(Some(transform));
                }
                Err(e) if e.is_retryable() => e.to_string(),
                Err(e) => return Err(e),
            };

            match order.lower() {
                Some(lower) => {
                    debug!("Order {} fit rejected ({}), trying order {}", order, failure, lower);
                    order = lower;
                }
                None => {
                    warn!(
                        "No transform could be fitted from {} points: {}",
                        points.len(),
                        failure
                    );
                    return Ok(None);
                }
            }
        }
    }
}
