//! JSON report of a fit
//!
//! The `transform` field is the serialized [`ImageryTransform`] and can be
//! loaded back with `serde_json`.

use serde::Serialize;

use crate::gcp::{GeoPoint, GroundControlPoint, PixelPoint};
use crate::genetic::GeneticFit;
use crate::geodesy::GeodesicDistance;
use crate::residual::{ErrorMetrics, PointResidual};
use crate::transform::ImageryTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Solver {
    LeastSquares,
    Genetic,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResidualEntry {
    pub gcp: GroundControlPoint,
    /// False when the prediction left the valid lon/lat range
    pub in_range: bool,
    #[serde(flatten)]
    pub residual: Option<PointResidual>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeEntry {
    pub pixel: PixelPoint,
    pub geo: GeoPoint,
    /// `geo` mapped back through geo → pixel
    pub round_trip: PixelPoint,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub solver: Solver,
    pub fingerprint: String,
    pub metrics: ErrorMetrics,
    pub transform: ImageryTransform,
    pub residuals: Vec<ResidualEntry>,
    pub probes: Vec<ProbeEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genetic: Option<GeneticFit>,
}

impl FitReport {
    pub fn new(
        transform: &ImageryTransform,
        solver: Solver,
        probes: &[PixelPoint],
        geodesic: &dyn GeodesicDistance,
    ) -> Self {
        let residuals = transform
            .gcps()
            .iter()
            .zip(transform.residuals(geodesic))
            .map(|(gcp, residual)| ResidualEntry {
                gcp: *gcp,
                in_range: residual.is_some(),
                residual,
            })
            .collect();

        let geos = transform.pixels_to_geo(probes);
        let round_trips = transform.geos_to_pixel(&geos);
        let probes = probes
            .iter()
            .zip(geos)
            .zip(round_trips)
            .map(|((&pixel, geo), round_trip)| ProbeEntry {
                pixel,
                geo,
                round_trip,
            })
            .collect();

        Self {
            solver,
            fingerprint: transform.fingerprint(),
            metrics: *transform.metrics(),
            transform: transform.clone(),
            residuals,
            probes,
            genetic: None,
        }
    }

    pub fn with_genetic(mut self, fit: GeneticFit) -> Self {
        self.genetic = Some(fit);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
