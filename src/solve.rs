//! Least-squares fitting of polynomial transforms
//!
//! Each direction (pixel → geo, geo → pixel) gets its own `N × size` design
//! matrix whose rows are the monomial terms of the input coordinates. Both
//! output axes are solved against that matrix. Columns are scaled to unit
//! norm before solving and the scale is folded back into the coefficients,
//! so the stored coefficients always multiply the raw monomials.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, TransformError};
use crate::gcp::GroundControlPoint;
use crate::polynomial::{monomials, Order, TransformCoefficients};

/// Relative singular value (or R diagonal) below which the design matrix is
/// treated as rank deficient
const RANK_TOLERANCE: f64 = 1e-13;

/// Smallest usable pivot of the unit-diagonal normal matrix
const PIVOT_TOLERANCE: f64 = 1e-14;

/// Linear least-squares strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveMethod {
    /// Singular value decomposition, rank revealing
    #[default]
    Svd,
    /// Householder QR and back substitution
    Qr,
    /// AᵀA x = Aᵀb by Gaussian elimination with partial pivoting
    NormalEquations,
    /// x = (AᵀA)⁻¹ Aᵀb with an explicit inverse
    NormalInverse,
}

impl SolveMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveMethod::Svd => "svd",
            SolveMethod::Qr => "qr",
            SolveMethod::NormalEquations => "normal-equations",
            SolveMethod::NormalInverse => "normal-inverse",
        }
    }

    pub fn all() -> &'static [SolveMethod] {
        &[
            SolveMethod::Svd,
            SolveMethod::Qr,
            SolveMethod::NormalEquations,
            SolveMethod::NormalInverse,
        ]
    }
}

impl FromStr for SolveMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SolveMethod::all()
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = SolveMethod::all().iter().map(|m| m.as_str()).collect();
                format!("unknown solve method '{}', expected one of {}", s, names.join(", "))
            })
    }
}

impl std::fmt::Display for SolveMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coefficients for both transform directions
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCoefficients {
    /// Inputs (lon, lat), outputs (pixel x, pixel y)
    pub geo_to_pixel: TransformCoefficients,
    /// Inputs (pixel x, pixel y), outputs (lon, lat)
    pub pixel_to_geo: TransformCoefficients,
}

/// Fit both transform directions at `order`.
///
/// `gcps` must hold at least `order.size()` points.
pub fn fit(
    gcps: &[GroundControlPoint],
    order: Order,
    method: SolveMethod,
) -> Result<FittedCoefficients> {
    if gcps.len() < order.size() {
        return Err(TransformError::InsufficientPoints {
            required: order.size(),
            actual: gcps.len(),
        });
    }

    let pixel_to_geo = fit_direction(
        gcps.iter().map(|p| ((p.pixel_x, p.pixel_y), (p.lon, p.lat))),
        gcps.len(),
        order,
        method,
    )?;
    let geo_to_pixel = fit_direction(
        gcps.iter().map(|p| ((p.lon, p.lat), (p.pixel_x, p.pixel_y))),
        gcps.len(),
        order,
        method,
    )?;

    Ok(FittedCoefficients {
        geo_to_pixel,
        pixel_to_geo,
    })
}

/// Solve one direction from `(input, output)` coordinate pairs
fn fit_direction(
    samples: impl Iterator<Item = ((f64, f64), (f64, f64))>,
    n: usize,
    order: Order,
    method: SolveMethod,
) -> Result<TransformCoefficients> {
    let size = order.size();
    let mut a = DMatrix::<f64>::zeros(n, size);
    let mut b = DMatrix::<f64>::zeros(n, 2);
    let mut row = vec![0.0f64; size];

    for (i, ((u, v), (out_x, out_y))) in samples.enumerate() {
        monomials(order, u, v, &mut row);
        for (j, &term) in row.iter().enumerate() {
            a[(i, j)] = term;
        }
        b[(i, 0)] = out_x;
        b[(i, 1)] = out_y;
    }

    let scales = equilibrate(&mut a).map_err(|reason| TransformError::solve(order.get(), reason))?;
    let solution =
        least_squares(a, b, method).map_err(|reason| TransformError::solve(order.get(), reason))?;

    let mut x = Vec::with_capacity(size);
    let mut y = Vec::with_capacity(size);
    for j in 0..size {
        x.push(solution[(j, 0)] / scales[j]);
        y.push(solution[(j, 1)] / scales[j]);
    }

    if x.iter().chain(&y).any(|c| !c.is_finite()) {
        return Err(TransformError::solve(order.get(), "non-finite coefficients"));
    }

    Ok(TransformCoefficients::new(x, y))
}

/// Scale every column to unit norm, returning the original norms
fn equilibrate(a: &mut DMatrix<f64>) -> std::result::Result<Vec<f64>, String> {
    let mut scales = Vec::with_capacity(a.ncols());
    for j in 0..a.ncols() {
        let norm = a.column(j).norm();
        if norm == 0.0 || !norm.is_finite() {
            return Err(format!("design matrix column {} is degenerate", j));
        }
        a.column_mut(j).scale_mut(1.0 / norm);
        scales.push(norm);
    }
    Ok(scales)
}

/// Solve `a x = b` in the least-squares sense for every column of `b`
fn least_squares(
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    method: SolveMethod,
) -> std::result::Result<DMatrix<f64>, String> {
    match method {
        SolveMethod::Svd => {
            let svd = a.svd(true, true);
            let max = svd.singular_values.max();
            let min = svd.singular_values.min();
            if !(max > 0.0) || min / max < RANK_TOLERANCE {
                return Err(format!(
                    "design matrix is rank deficient (singular value ratio {:e})",
                    min / max
                ));
            }
            svd.solve(&b, max * f64::EPSILON).map_err(|e| e.to_string())
        }
        SolveMethod::Qr => {
            let qr = a.qr();
            let r = qr.r();
            let diag = r.diagonal().map(f64::abs);
            let max = diag.max();
            if !(max > 0.0) || diag.min() / max < RANK_TOLERANCE {
                return Err("design matrix is rank deficient (QR)".to_string());
            }
            let qtb = qr.q().transpose() * b;
            r.solve_upper_triangular(&qtb)
                .ok_or_else(|| "upper triangular solve failed".to_string())
        }
        SolveMethod::NormalEquations => {
            let at = a.transpose();
            let mut normal = &at * &a;
            let mut rhs = &at * b;
            solve_linear_system(&mut normal, &mut rhs)
        }
        SolveMethod::NormalInverse => {
            let at = a.transpose();
            let normal = &at * &a;
            let inverse = normal
                .clone()
                .try_inverse()
                .ok_or_else(|| "normal matrix is singular".to_string())?;
            if !(inverse.amax() * PIVOT_TOLERANCE < 1.0) {
                return Err("normal matrix is numerically singular".to_string());
            }
            let identity = DMatrix::<f64>::identity(normal.nrows(), normal.ncols());
            let drift = (&normal * &inverse - identity).amax();
            if !drift.is_finite() || drift > 1e-6 {
                return Err(format!("normal matrix inverse is inaccurate (drift {:e})", drift));
            }
            Ok(inverse * (at * b))
        }
    }
}

/// Solve a square system using Gaussian elimination with partial pivoting.
/// `a` and `b` are overwritten.
fn solve_linear_system(
    a: &mut DMatrix<f64>,
    b: &mut DMatrix<f64>,
) -> std::result::Result<DMatrix<f64>, String> {
    let n = a.nrows();

    // Forward elimination with partial pivoting
    for col in 0..n {
        // Find pivot
        let mut max_row = col;
        let mut max_val = a[(col, col)].abs();
        for row in (col + 1)..n {
            if a[(row, col)].abs() > max_val {
                max_val = a[(row, col)].abs();
                max_row = row;
            }
        }

        // Swap rows
        if max_row != col {
            a.swap_rows(col, max_row);
            b.swap_rows(col, max_row);
        }

        // Eliminate column
        let pivot = a[(col, col)];
        if !(pivot.abs() >= PIVOT_TOLERANCE) {
            return Err(format!("normal matrix is singular at column {}", col));
        }

        for row in (col + 1)..n {
            let factor = a[(row, col)] / pivot;
            for j in col..n {
                a[(row, j)] -= factor * a[(col, j)];
            }
            for k in 0..b.ncols() {
                b[(row, k)] -= factor * b[(col, k)];
            }
        }
    }

    // Back substitution
    let mut x = DMatrix::<f64>::zeros(n, b.ncols());
    for k in 0..b.ncols() {
        for i in (0..n).rev() {
            let mut sum = b[(i, k)];
            for j in (i + 1)..n {
                sum -= a[(i, j)] * x[(j, k)];
            }
            x[(i, k)] = sum / a[(i, i)];
        }
    }

    Ok(x)
}
