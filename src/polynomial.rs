//! Bivariate polynomial terms and coefficient storage
//!
//! A transform of order N is a pair of polynomials in (x, y) with every
//! monomial up to total degree N. Terms are laid out degree by degree:
//!
//! ```text
//! degree 0: 1
//! degree 1: x, y
//! degree 2: x², y², xy
//! degree 3: x³, y³, x²y, xy²
//! degree d: x^d, y^d, x^(d-1)y, x^(d-2)y², ..., xy^(d-1)
//! ```
//!
//! Persisted coefficient sets depend on this layout. The design matrix rows
//! used by the solver come from [`monomials`], the same generator that
//! [`evaluate`] uses.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// Polynomial order (maximum total degree), 1..=8
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Order(u8);

impl Order {
    pub const MIN: Order = Order(1);
    pub const MAX: Order = Order(8);

    pub fn new(order: u8) -> Result<Self> {
        if (Self::MIN.0..=Self::MAX.0).contains(&order) {
            Ok(Order(order))
        } else {
            Err(TransformError::InvalidOrder(order))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Number of monomial terms, `(order + 1)(order + 2) / 2`
    pub fn size(self) -> usize {
        let n = self.0 as usize;
        (n + 1) * (n + 2) / 2
    }

    /// Highest order that `count` points can determine, capped at [`Order::MAX`]
    pub fn for_point_count(count: usize) -> Option<Order> {
        Self::all().rev().find(|order| order.size() <= count)
    }

    /// The next lower order, or `None` at order 1
    pub fn lower(self) -> Option<Order> {
        (self.0 > Self::MIN.0).then(|| Order(self.0 - 1))
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Order> {
        (Self::MIN.0..=Self::MAX.0).map(Order)
    }
}

impl TryFrom<u8> for Order {
    type Error = TransformError;

    fn try_from(value: u8) -> Result<Self> {
        Order::new(value)
    }
}

impl From<Order> for u8 {
    fn from(order: Order) -> u8 {
        order.0
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write the monomial terms of `order` at (x, y) into `out`.
///
/// Only `out.len()` terms are produced, so a short slice yields the leading
/// terms of the layout. Returns the number of terms written.
pub fn monomials(order: Order, x: f64, y: f64, out: &mut [f64]) -> usize {
    let limit = out.len().min(order.size());
    if limit == 0 {
        return 0;
    }

    // Powers 0..=order of each variable
    let mut xp = [1.0f64; 9];
    let mut yp = [1.0f64; 9];
    for d in 1..=order.get() as usize {
        xp[d] = xp[d - 1] * x;
        yp[d] = yp[d - 1] * y;
    }

    let mut k = 0;
    out[k] = 1.0;
    k += 1;

    for d in 1..=order.get() as usize {
        if k < limit {
            out[k] = xp[d];
            k += 1;
        }
        if k < limit {
            out[k] = yp[d];
            k += 1;
        }
        for p in (1..d).rev() {
            if k < limit {
                out[k] = xp[p] * yp[d - p];
                k += 1;
            }
        }
    }

    k
}

/// Evaluate `Σ coefficients[k] · monomial_k(x, y)`.
///
/// Terms beyond the length of `coefficients` are skipped.
pub fn evaluate(coefficients: &[f64], order: Order, x: f64, y: f64) -> f64 {
    let mut terms = [0.0f64; 45];
    let n = monomials(order, x, y, &mut terms[..coefficients.len().min(45)]);
    coefficients[..n]
        .iter()
        .zip(&terms[..n])
        .map(|(c, t)| c * t)
        .sum()
}

/// Coefficients for one transform direction: `x` drives the first output
/// axis and `y` the second.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformCoefficients {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TransformCoefficients {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { x, y }
    }

    /// Zero vectors sized for `order`
    pub fn zeroed(order: Order) -> Self {
        Self {
            x: vec![0.0; order.size()],
            y: vec![0.0; order.size()],
        }
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn set_x(&mut self, x: Vec<f64>) {
        self.x = x;
    }

    pub fn set_y(&mut self, y: Vec<f64>) {
        self.y = y;
    }

    /// Evaluate both output axes at (u, v)
    #[inline]
    pub fn apply(&self, order: Order, u: f64, v: f64) -> (f64, f64) {
        (
            evaluate(&self.x, order, u, v),
            evaluate(&self.y, order, u, v),
        )
    }

    /// Check both vectors hold exactly `order.size()` terms
    pub(crate) fn check_len(&self, order: Order) -> Result<()> {
        for len in [self.x.len(), self.y.len()] {
            if len != order.size() {
                return Err(TransformError::CoefficientLength {
                    expected: order.size(),
                    actual: len,
                });
            }
        }
        Ok(())
    }
}
