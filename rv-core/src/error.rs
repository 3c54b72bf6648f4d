use thiserror::Error;

/// Result type used by the fallible constructors in the robot-vision crates.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur while ingesting measurements or configuration.
///
/// Evaluating residuals and Jacobians never fails; these only come up when
/// building the immutable inputs those evaluations consume.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A measurement covariance could not be inverted into an information matrix.
    #[error("covariance of dimension {dimension} is singular")]
    SingularCovariance { dimension: usize },

    /// Camera focal lengths must be strictly positive and finite.
    #[error("invalid camera intrinsics: focals ({fx}, {fy}) must be positive and finite")]
    InvalidIntrinsics { fx: f64, fy: f64 },

    /// A similarity transform must have a strictly positive scale to have a logarithm.
    #[error("similarity scale {0} is not strictly positive")]
    NonPositiveScale(f64),
}
