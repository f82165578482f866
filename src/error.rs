//! Errors reported by the opt-in parameter validation.

use thiserror::Error;

/// A tuning parameter that would corrupt the orientation estimate.
///
/// Only produced by [`MadgwickParameters::validate`] and
/// [`Madgwick::try_from_parameters`]. The infallible constructors and setters
/// accept any value.
///
/// [`MadgwickParameters::validate`]: crate::MadgwickParameters::validate
/// [`Madgwick::try_from_parameters`]: crate::Madgwick::try_from_parameters
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParameterError {
    /// The sample period is NaN or infinite.
    #[error("sample period must be finite, got {0}")]
    NonFiniteSamplePeriod(f32),
    /// The sample period is zero or negative.
    #[error("sample period must be strictly positive, got {0} s")]
    NonPositiveSamplePeriod(f32),
    /// The gain is NaN or infinite.
    #[error("beta must be finite, got {0}")]
    NonFiniteBeta(f32),
    /// The gain is negative.
    #[error("beta must not be negative, got {0}")]
    NegativeBeta(f32),
}
