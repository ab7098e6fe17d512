//! Great-circle / geodesic distances used for residuals in meters

/// Distance between two geographic positions in meters (degrees in)
pub trait GeodesicDistance: Send + Sync {
    fn distance_meters(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64;
}

/// Spherical great-circle distance on a sphere of mean Earth radius
#[derive(Debug, Clone, Copy)]
pub struct Haversine {
    pub radius: f64,
}

impl Haversine {
    /// IUGG mean Earth radius
    pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;
}

impl Default for Haversine {
    fn default() -> Self {
        Self {
            radius: Self::MEAN_EARTH_RADIUS,
        }
    }
}

impl GeodesicDistance for Haversine {
    fn distance_meters(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let phi1 = lat1.to_radians();
        let phi2 = lat2.to_radians();
        let dphi = phi2 - phi1;
        let dlambda = (lon2 - lon1).to_radians();

        let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
        2.0 * self.radius * h.sqrt().min(1.0).asin()
    }
}

/// Vincenty's inverse formula on an ellipsoid (WGS84 by default)
///
/// Falls back to [`Haversine`] for nearly antipodal points where the
/// iteration does not converge.
#[derive(Debug, Clone, Copy)]
pub struct Vincenty {
    /// Semi-major axis, meters
    pub a: f64,
    /// Flattening
    pub f: f64,
    pub max_iterations: u32,
    pub tolerance: f64,
}

impl Vincenty {
    pub const WGS84_A: f64 = 6_378_137.0;
    pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

    /// Distance, or `None` if the λ iteration fails to converge
    pub fn try_distance(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Option<f64> {
        let a = self.a;
        let f = self.f;
        let b = (1.0 - f) * a;

        let l = (lon2 - lon1).to_radians();
        let u1 = ((1.0 - f) * lat1.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * lat2.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        for _ in 0..self.max_iterations {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
                + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
            .sqrt();
            if sin_sigma == 0.0 {
                // Coincident points
                return Some(0.0);
            }
            let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            let sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
            // Equatorial lines have cos²α = 0
            let cos_2sigma_m = if cos2_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
            } else {
                0.0
            };
            let c = f / 16.0 * cos2_alpha * (4.0 + f * (4.0 - 3.0 * cos2_alpha));

            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

            if (lambda - previous).abs() < self.tolerance {
                let u_sq = cos2_alpha * (a * a - b * b) / (b * b);
                let big_a =
                    1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
                let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
                let delta_sigma = big_b
                    * sin_sigma
                    * (cos_2sigma_m
                        + big_b / 4.0
                            * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                                - big_b / 6.0
                                    * cos_2sigma_m
                                    * (-3.0 + 4.0 * sin_sigma.powi(2))
                                    * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
                return Some(b * big_a * (sigma - delta_sigma));
            }
        }

        None
    }
}

impl Default for Vincenty {
    fn default() -> Self {
        Self {
            a: Self::WGS84_A,
            f: Self::WGS84_F,
            max_iterations: 200,
            tolerance: 1e-12,
        }
    }
}

impl GeodesicDistance for Vincenty {
    fn distance_meters(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        match self.try_distance(lat1, lon1, lat2, lon2) {
            Some(d) => d,
            None => {
                tracing::debug!(
                    "Vincenty did not converge for ({}, {}) -> ({}, {}), using haversine",
                    lat1,
                    lon1,
                    lat2,
                    lon2
                );
                Haversine::default().distance_meters(lat1, lon1, lat2, lon2)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dms(deg: f64, min: f64, sec: f64) -> f64 {
        deg.signum() * (deg.abs() + min / 60.0 + sec / 3600.0)
    }

    #[test]
    fn test_vincenty_flinders_peak_to_buninyong() {
        // Geoscience Australia reference pair
        let lat1 = dms(-37.0, 57.0, 3.72030);
        let lon1 = dms(144.0, 25.0, 29.52440);
        let lat2 = dms(-37.0, 39.0, 10.15610);
        let lon2 = dms(143.0, 55.0, 35.38390);

        let d = Vincenty::default().distance_meters(lat1, lon1, lat2, lon2);
        assert!((d - 54_972.271).abs() < 0.05, "got {d}");
    }

    #[test]
    fn test_vincenty_equator_degree() {
        let d = Vincenty::default().distance_meters(0.0, 0.0, 0.0, 1.0);
        let expected = Vincenty::WGS84_A * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn test_vincenty_coincident() {
        assert_eq!(Vincenty::default().distance_meters(45.0, 7.0, 45.0, 7.0), 0.0);
    }

    #[test]
    fn test_vincenty_antipodal_falls_back() {
        let v = Vincenty::default();
        let d = v.distance_meters(0.0, 0.0, 0.5, 179.7);
        assert!(d.is_finite());
        assert!(d > 19_000_000.0 && d < 20_100_000.0, "got {d}");
    }

    #[test]
    fn test_haversine_quarter_meridian() {
        let h = Haversine::default();
        let d = h.distance_meters(0.0, 0.0, 90.0, 0.0);
        let expected = std::f64::consts::FRAC_PI_2 * Haversine::MEAN_EARTH_RADIUS;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_haversine_close_to_vincenty() {
        let h = Haversine::default().distance_meters(10.0, 20.0, 10.5, 20.5);
        let v = Vincenty::default().distance_meters(10.0, 20.0, 10.5, 20.5);
        assert!((h - v).abs() / v < 0.005);
    }
}
