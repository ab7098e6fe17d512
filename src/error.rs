//! Error types for transform fitting

use thiserror::Error;

use crate::genetic::GeneticConfigError;

/// Errors raised while building or restoring an imagery transform
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformError {
    /// Not enough distinct control points for the requested order
    #[error("need at least {required} ground control points, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },

    /// Polynomial order outside 1..=8
    #[error("polynomial order {0} is outside the supported range 1..=8")]
    InvalidOrder(u8),

    /// A control point carries a NaN or infinite coordinate
    #[error("ground control point {index} has a non-finite coordinate")]
    InvalidPoint { index: usize },

    /// The design matrix was singular, rank deficient or produced non-finite coefficients
    #[error("order {order} solve failed: {reason}")]
    Solve { order: u8, reason: String },

    /// A coefficient vector does not match the order's term count
    #[error("expected {expected} coefficients, got {actual}")]
    CoefficientLength { expected: usize, actual: usize },

    /// Evaluation or metrics requested before a successful fit
    #[error("transform has not been fitted")]
    NotFitted,

    /// Genetic search parameters that cannot be sampled from
    #[error(transparent)]
    GeneticConfig(#[from] GeneticConfigError),
}

impl TransformError {
    pub(crate) fn solve(order: u8, reason: impl Into<String>) -> Self {
        TransformError::Solve {
            order,
            reason: reason.into(),
        }
    }

    /// Whether the order backoff loop may retry at a lower order
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransformError::Solve { .. } | TransformError::InsufficientPoints { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
