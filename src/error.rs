//! # Errors
//!
//! $$
//! \text{validate}(\text{inputs}) \Rightarrow \text{compute} \Rightarrow \text{result}
//! $$
//!
//! Every validation failure is raised before any numerical work starts, so a caller never
//! sees a partially populated result.

/// Errors raised by the risk and portfolio engines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskError {
  /// Weights do not sum to one within tolerance, are negative, or do not match the asset count.
  #[error("invalid weights: {0}")]
  InvalidWeights(String),

  /// Confidence level outside the open interval (0, 1).
  #[error("invalid confidence level {0}: must lie strictly between 0 and 1")]
  InvalidConfidence(f64),

  /// Too few aligned observations for the requested statistic or percentile.
  #[error("insufficient data: {0}")]
  InsufficientData(String),

  /// Return series cannot be aligned by length or timestamp.
  #[error("misaligned series: {0}")]
  MisalignedSeries(String),

  /// Covariance matrix is not positive definite (e.g. |rho| = 1 in the 2x2 case).
  #[error("covariance matrix is not positive definite: {0}")]
  NonPositiveDefinite(String),

  /// Optimization needs at least two assets.
  #[error("at least 2 assets are required, got {0}")]
  InsufficientAssets(usize),

  /// Any other malformed argument (portfolio value, horizon, trial count, period).
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The return-series collaborator failed to deliver data.
  #[error("data source error: {0}")]
  DataSource(String),

  /// The request exceeded its wall-clock budget.
  #[error("request exceeded its time budget of {0} ms")]
  Timeout(u64),

  /// Configuration could not be read or parsed.
  #[error("configuration error: {0}")]
  Config(String),
}

impl RiskError {
  /// Stable identifier used in wire error envelopes.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InvalidWeights(_) => "InvalidWeightsError",
      Self::InvalidConfidence(_) => "InvalidConfidenceError",
      Self::InsufficientData(_) => "InsufficientDataError",
      Self::MisalignedSeries(_) => "MisalignedSeriesError",
      Self::NonPositiveDefinite(_) => "NonPositiveDefiniteError",
      Self::InsufficientAssets(_) => "InsufficientAssetsError",
      Self::InvalidInput(_) => "InvalidInputError",
      Self::DataSource(_) => "DataSourceError",
      Self::Timeout(_) => "TimeoutError",
      Self::Config(_) => "ConfigError",
    }
  }

  /// Whether the failure came from input validation rather than from computation or I/O.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::InvalidWeights(_)
        | Self::InvalidConfidence(_)
        | Self::InsufficientData(_)
        | Self::MisalignedSeries(_)
        | Self::InsufficientAssets(_)
        | Self::InvalidInput(_)
    )
  }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RiskError>;

/// Reject confidence levels outside (0, 1).
pub(crate) fn check_confidence(confidence: f64) -> Result<()> {
  if confidence.is_finite() && confidence > 0.0 && confidence < 1.0 {
    Ok(())
  } else {
    Err(RiskError::InvalidConfidence(confidence))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn confidence_bounds_are_open() {
    assert!(check_confidence(0.95).is_ok());
    assert_eq!(check_confidence(0.0), Err(RiskError::InvalidConfidence(0.0)));
    assert_eq!(check_confidence(1.0), Err(RiskError::InvalidConfidence(1.0)));
    assert!(check_confidence(f64::NAN).is_err());
  }

  #[test]
  fn kinds_are_stable() {
    assert_eq!(
      RiskError::InvalidWeights("x".into()).kind(),
      "InvalidWeightsError"
    );
    assert_eq!(RiskError::InsufficientAssets(1).kind(), "InsufficientAssetsError");
    assert!(RiskError::InvalidConfidence(2.0).is_validation());
    assert!(!RiskError::Timeout(10).is_validation());
  }
}
