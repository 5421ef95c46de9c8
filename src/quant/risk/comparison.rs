//! # Method Agreement
//!
//! $$
//! d=\frac{\max_m \text{VaR}_m-\min_m \text{VaR}_m}{\min_m \text{VaR}_m}
//! $$
//!
//! Relative spread between the VaR estimators, bucketed by configurable thresholds.

use serde::Deserialize;
use serde::Serialize;

/// Spread cut-offs between the agreement buckets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgreementThresholds {
  /// Spreads below this are labelled [`Agreement::Good`].
  pub good: f64,
  /// Spreads below this (and at or above `good`) are [`Agreement::Moderate`].
  pub moderate: f64,
}

impl Default for AgreementThresholds {
  fn default() -> Self {
    Self {
      good: 0.10,
      moderate: 0.20,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
  Good,
  Moderate,
  High,
  /// The smallest estimate is zero, so no relative spread exists.
  Undefined,
}

/// Relative spread and its bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MethodAgreement {
  pub spread: Option<f64>,
  pub label: Agreement,
}

impl AgreementThresholds {
  pub fn classify(&self, estimates: &[f64]) -> MethodAgreement {
    let spread = relative_spread(estimates);
    let label = match spread {
      None => Agreement::Undefined,
      Some(d) if d < self.good => Agreement::Good,
      Some(d) if d < self.moderate => Agreement::Moderate,
      Some(_) => Agreement::High,
    };
    MethodAgreement { spread, label }
  }
}

/// `(max - min) / min`, or `None` for an empty slice or a non-positive minimum.
pub fn relative_spread(estimates: &[f64]) -> Option<f64> {
  let min = estimates.iter().copied().fold(f64::INFINITY, f64::min);
  let max = estimates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  if estimates.is_empty() || min.is_nan() || min <= 0.0 || !max.is_finite() {
    return None;
  }
  Some((max - min) / min)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn buckets_follow_thresholds() {
    let t = AgreementThresholds::default();
    assert_eq!(t.classify(&[0.020, 0.021, 0.0205]).label, Agreement::Good);
    assert_eq!(t.classify(&[0.020, 0.023, 0.021]).label, Agreement::Moderate);
    assert_eq!(t.classify(&[0.020, 0.030, 0.021]).label, Agreement::High);
  }

  #[test]
  fn spread_is_relative_to_smallest() {
    assert_abs_diff_eq!(relative_spread(&[0.02, 0.03]).unwrap(), 0.5, epsilon = 1e-12);
  }

  #[test]
  fn zero_minimum_is_undefined() {
    let m = AgreementThresholds::default().classify(&[0.0, 0.01, 0.02]);
    assert_eq!(m.label, Agreement::Undefined);
    assert!(m.spread.is_none());
    assert!(relative_spread(&[]).is_none());
  }

  #[test]
  fn custom_thresholds_are_respected() {
    let strict = AgreementThresholds {
      good: 0.01,
      moderate: 0.05,
    };
    assert_eq!(strict.classify(&[0.020, 0.0205]).label, Agreement::Moderate);
  }
}
