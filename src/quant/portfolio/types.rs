//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta^{N-1}} \frac{\mathbf w^\top\mu-r_f}{\sqrt{\mathbf w^\top\Sigma\mathbf w}}
//! $$
//!
//! Shared enums and result containers for portfolio optimization.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use nalgebra::DVector;
use serde::Deserialize;
use serde::Serialize;

use crate::error::check_confidence;
use crate::error::Result;
use crate::error::RiskError;

/// Supported max-Sharpe search strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerMethod {
  /// Nelder-Mead on a softmax parameterization of the long-only simplex.
  #[default]
  NelderMead,
  /// Best of uniformly drawn simplex weights.
  RandomSearch,
}

impl FromStr for OptimizerMethod {
  type Err = RiskError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "nelder-mead" | "neldermead" | "nelder_mead" | "nm" => Ok(Self::NelderMead),
      "random" | "random-search" | "random_search" | "monte-carlo" => Ok(Self::RandomSearch),
      other => Err(RiskError::InvalidInput(format!("unknown optimizer '{other}'"))),
    }
  }
}

impl fmt::Display for OptimizerMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NelderMead => write!(f, "nelder_mead"),
      Self::RandomSearch => write!(f, "random_search"),
    }
  }
}

/// One holding of a portfolio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetWeight {
  pub ticker: String,
  pub weight: f64,
}

impl AssetWeight {
  pub fn new(ticker: impl Into<String>, weight: f64) -> Self {
    Self {
      ticker: ticker.into(),
      weight,
    }
  }
}

/// Holdings plus the valuation parameters of a VaR request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSpec {
  pub assets: Vec<AssetWeight>,
  pub portfolio_value: f64,
  pub confidence_level: f64,
  /// Horizon in trading periods.
  pub horizon: u32,
}

impl PortfolioSpec {
  pub fn new(assets: Vec<AssetWeight>, portfolio_value: f64, confidence_level: f64) -> Self {
    Self {
      assets,
      portfolio_value,
      confidence_level,
      horizon: 1,
    }
  }

  pub fn with_horizon(mut self, horizon: u32) -> Self {
    self.horizon = horizon;
    self
  }

  pub fn tickers(&self) -> Vec<&str> {
    self.assets.iter().map(|a| a.ticker.as_str()).collect()
  }

  pub fn weights(&self) -> Vec<f64> {
    self.assets.iter().map(|a| a.weight).collect()
  }

  /// Weights in `[0, 1]` summing to one within `tolerance`, then the valuation terms.
  pub fn validate(&self, tolerance: f64) -> Result<()> {
    check_weights(&self.weights(), tolerance)?;
    check_valuation(self.portfolio_value, self.confidence_level, self.horizon)
  }
}

/// A confidence in `(0, 1)`, a positive finite value and a non-zero horizon.
pub fn check_valuation(portfolio_value: f64, confidence: f64, horizon: u32) -> Result<()> {
  check_confidence(confidence)?;
  if !portfolio_value.is_finite() || portfolio_value <= 0.0 {
    return Err(RiskError::InvalidInput(format!(
      "portfolio value must be positive, got {portfolio_value}"
    )));
  }
  if horizon == 0 {
    return Err(RiskError::InvalidInput("horizon must be at least 1 period".to_string()));
  }
  Ok(())
}

/// Reject empty, negative or non-finite weights, or a sum away from one by more than `tolerance`.
pub fn check_weights(weights: &[f64], tolerance: f64) -> Result<()> {
  if weights.is_empty() {
    return Err(RiskError::InvalidWeights("no weights supplied".to_string()));
  }
  if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0 || **w > 1.0) {
    return Err(RiskError::InvalidWeights(format!(
      "weight {w} outside [0, 1]"
    )));
  }
  let sum: f64 = weights.iter().sum();
  if (sum - 1.0).abs() > tolerance {
    return Err(RiskError::InvalidWeights(format!(
      "weights sum to {sum}, expected 1 within {tolerance}"
    )));
  }
  Ok(())
}

/// Output of a portfolio optimization run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OptimizationResult {
  pub tickers: Vec<String>,
  /// Final portfolio weights, aligned with `tickers`.
  pub weights: Vec<f64>,
  /// Annualized model expected return.
  pub expected_return: f64,
  /// Annualized model volatility.
  pub volatility: f64,
  /// `(expected_return - risk_free) / volatility`.
  pub sharpe_ratio: f64,
  pub method: OptimizerMethod,
}

impl OptimizationResult {
  /// Ticker to weight mapping.
  pub fn allocation(&self) -> BTreeMap<String, f64> {
    self
      .tickers
      .iter()
      .cloned()
      .zip(self.weights.iter().copied())
      .collect()
  }
}

/// Return, volatility and Sharpe ratio of `weights` under `(mu, cov)`.
pub fn evaluate(
  weights: &[f64],
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
  risk_free: f64,
) -> (f64, f64, f64) {
  let w = DVector::from_column_slice(weights);
  let expected_return = w.dot(mu);
  let volatility = (cov * &w).dot(&w).max(0.0).sqrt();
  let sharpe = if volatility > 1e-15 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  };
  (expected_return, volatility, sharpe)
}

/// Clip negatives and rescale so the weights sum to exactly one.
pub(crate) fn normalize(mut weights: Vec<f64>) -> Vec<f64> {
  let n = weights.len();
  for w in weights.iter_mut() {
    if !w.is_finite() || *w < 0.0 {
      *w = 0.0;
    }
  }
  let sum: f64 = weights.iter().sum();
  if sum < 1e-15 {
    return vec![1.0 / n as f64; n];
  }
  weights.iter().map(|w| w / sum).collect()
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn weights_must_sum_to_one_within_tolerance() {
    assert!(check_weights(&[0.5, 0.5], 0.01).is_ok());
    assert!(check_weights(&[0.5, 0.505], 0.01).is_ok());
    assert!(matches!(
      check_weights(&[0.5, 0.6], 0.01),
      Err(RiskError::InvalidWeights(_))
    ));
    assert!(matches!(
      check_weights(&[1.1, -0.1], 0.01),
      Err(RiskError::InvalidWeights(_))
    ));
    assert!(check_weights(&[], 0.01).is_err());
  }

  #[test]
  fn spec_validation_covers_value_and_confidence() {
    let assets = vec![AssetWeight::new("AAA", 0.5), AssetWeight::new("BBB", 0.5)];
    let spec = PortfolioSpec::new(assets.clone(), 100_000.0, 0.95);
    assert!(spec.validate(0.01).is_ok());
    assert_eq!(spec.tickers(), vec!["AAA", "BBB"]);

    let bad_value = PortfolioSpec::new(assets.clone(), -1.0, 0.95);
    assert!(matches!(bad_value.validate(0.01), Err(RiskError::InvalidInput(_))));

    let bad_conf = PortfolioSpec::new(assets.clone(), 1.0, 0.0);
    assert!(matches!(bad_conf.validate(0.01), Err(RiskError::InvalidConfidence(_))));

    let no_horizon = PortfolioSpec::new(assets, 1.0, 0.95).with_horizon(0);
    assert!(matches!(no_horizon.validate(0.01), Err(RiskError::InvalidInput(_))));

    // each weight stays within [0, 1] even when the sum is within tolerance
    let over = PortfolioSpec::new(
      vec![AssetWeight::new("AAA", 1.005), AssetWeight::new("BBB", 0.0)],
      1.0,
      0.95,
    );
    assert!(matches!(over.validate(0.01), Err(RiskError::InvalidWeights(_))));
  }

  #[test]
  fn evaluate_matches_quadratic_form() {
    let mu = DVector::from_vec(vec![0.08, 0.12]);
    let cov = DMatrix::from_row_slice(2, 2, &[0.04, 0.006, 0.006, 0.09]);
    let (r, v, s) = evaluate(&[0.6, 0.4], &mu, &cov, 0.02);

    assert_relative_eq!(r, 0.096, epsilon = 1e-12);
    let var: f64 = 0.36 * 0.04 + 0.16 * 0.09 + 2.0 * 0.24 * 0.006;
    assert_relative_eq!(v, var.sqrt(), epsilon = 1e-12);
    assert_relative_eq!(s, (0.096 - 0.02) / var.sqrt(), epsilon = 1e-12);
  }

  #[test]
  fn normalize_clips_and_rescales() {
    let w = normalize(vec![2.0, -1.0, 2.0]);
    assert_abs_diff_eq!(w[0], 0.5);
    assert_abs_diff_eq!(w[1], 0.0);
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-15);
    assert_eq!(normalize(vec![0.0, 0.0]), vec![0.5, 0.5]);
  }

  #[test]
  fn optimizer_method_parses() {
    assert_eq!("nelder-mead".parse::<OptimizerMethod>().unwrap(), OptimizerMethod::NelderMead);
    assert_eq!("random".parse::<OptimizerMethod>().unwrap(), OptimizerMethod::RandomSearch);
    assert!("slsqp".parse::<OptimizerMethod>().is_err());
  }
}
