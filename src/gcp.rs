//! Ground control points and their canonical ordering

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{Result, TransformError};

/// A known pairing of an image position with a geographic position
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GroundControlPoint {
    /// Pixel sample (column)
    pub pixel_x: f64,
    /// Pixel line (row)
    pub pixel_y: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl GroundControlPoint {
    pub fn new(pixel_x: f64, pixel_y: f64, lon: f64, lat: f64) -> Self {
        Self {
            pixel_x,
            pixel_y,
            lon,
            lat,
        }
    }

    pub fn pixel(&self) -> PixelPoint {
        PixelPoint::new(self.pixel_x, self.pixel_y)
    }

    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }

    fn is_finite(&self) -> bool {
        self.pixel_x.is_finite()
            && self.pixel_y.is_finite()
            && self.lon.is_finite()
            && self.lat.is_finite()
    }

    /// Canonical order: latitude, longitude, pixel line, pixel sample
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.lat
            .total_cmp(&other.lat)
            .then_with(|| self.lon.total_cmp(&other.lon))
            .then_with(|| self.pixel_y.total_cmp(&other.pixel_y))
            .then_with(|| self.pixel_x.total_cmp(&other.pixel_x))
    }
}

/// A position in image space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A position in geographic space, degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether the point lies within lon [-180, 180] and lat [-90, 90]
    pub fn in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.lon) && (-90.0..=90.0).contains(&self.lat)
    }
}

/// Sorted, deduplicated copy of `points`.
///
/// Repeated fits over the same set of points see them in the same order no
/// matter how the caller supplied them.
pub fn canonicalize(points: &[GroundControlPoint]) -> Result<Vec<GroundControlPoint>> {
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(TransformError::InvalidPoint { index });
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(GroundControlPoint::canonical_cmp);
    sorted.dedup_by(|a, b| a.canonical_cmp(b) == Ordering::Equal);

    if sorted.len() < points.len() {
        tracing::debug!(
            "Dropped {} duplicate ground control points",
            points.len() - sorted.len()
        );
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let points = vec![
            GroundControlPoint::new(5.0, 0.0, 10.0, 2.0),
            GroundControlPoint::new(1.0, 0.0, 10.0, 1.0),
            GroundControlPoint::new(9.0, 4.0, 5.0, 1.0),
            GroundControlPoint::new(3.0, 4.0, 5.0, 1.0),
            GroundControlPoint::new(3.0, 2.0, 5.0, 1.0),
        ];

        let sorted = canonicalize(&points).unwrap();
        let pixels: Vec<(f64, f64)> = sorted.iter().map(|p| (p.pixel_x, p.pixel_y)).collect();
        assert_eq!(
            pixels,
            vec![(3.0, 2.0), (3.0, 4.0), (9.0, 4.0), (1.0, 0.0), (5.0, 0.0)]
        );
    }

    #[test]
    fn test_duplicates_removed() {
        let p = GroundControlPoint::new(1.0, 2.0, 3.0, 4.0);
        let q = GroundControlPoint::new(1.0, 2.0, 3.0, 5.0);
        let sorted = canonicalize(&[p, q, p, p]).unwrap();
        assert_eq!(sorted, vec![p, q]);
    }

    #[test]
    fn test_input_order_irrelevant() {
        let a = GroundControlPoint::new(0.0, 0.0, 1.0, 1.0);
        let b = GroundControlPoint::new(1.0, 0.0, 2.0, 1.0);
        let c = GroundControlPoint::new(0.0, 1.0, 1.0, 2.0);
        assert_eq!(
            canonicalize(&[a, b, c]).unwrap(),
            canonicalize(&[c, a, b]).unwrap()
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let points = [
            GroundControlPoint::new(0.0, 0.0, 1.0, 1.0),
            GroundControlPoint::new(f64::NAN, 0.0, 1.0, 1.0),
        ];
        assert_eq!(
            canonicalize(&points),
            Err(TransformError::InvalidPoint { index: 1 })
        );
    }

    #[test]
    fn test_geo_range() {
        assert!(GeoPoint::new(180.0, -90.0).in_range());
        assert!(!GeoPoint::new(180.5, 0.0).in_range());
        assert!(!GeoPoint::new(0.0, f64::NAN).in_range());
    }
}
