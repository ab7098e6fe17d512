//! geowarp - polynomial georeferencing from ground control points
//!
//! Fits N-th order polynomial transforms (orders 1 to 8) between image pixel
//! coordinates and geographic longitude/latitude by least squares, backing
//! off to lower orders when the control points cannot support a fit. A
//! genetic search over first-order coefficients is available as a last
//! resort.

pub mod config;
pub mod error;
pub mod factory;
pub mod fingerprint;
pub mod gcp;
pub mod genetic;
pub mod geodesy;
pub mod live;
pub mod polynomial;
pub mod report;
pub mod residual;
pub mod solve;
pub mod transform;

pub use error::{Result, TransformError};
pub use factory::TransformFactory;
pub use gcp::{GeoPoint, GroundControlPoint, PixelPoint};
pub use geodesy::{GeodesicDistance, Haversine, Vincenty};
pub use live::LiveTransform;
pub use polynomial::{Order, TransformCoefficients};
pub use residual::ErrorMetrics;
pub use solve::SolveMethod;
pub use transform::ImageryTransform;
