//! # Covariance Model
//!
//! $$
//! \Sigma_{ij} = \sigma_i \sigma_j \rho_{ij},\qquad
//! L=\begin{pmatrix}1&0\\ \rho&\sqrt{1-\rho^2}\end{pmatrix}
//! $$
//!
//! Mean vector, volatilities, correlation and covariance of N aligned return series.

use nalgebra::DMatrix;
use nalgebra::DVector;

use crate::error::Result;
use crate::error::RiskError;
use crate::stats::descriptive::pearson_unchecked;
use crate::stats::descriptive::sample_mean;
use crate::stats::descriptive::sample_variance;
use crate::stats::descriptive::SampleFrequency;

/// Sample moments of N aligned series, in native periods.
#[derive(Clone, Debug, PartialEq)]
pub struct CovarianceModel {
  means: DVector<f64>,
  std_devs: DVector<f64>,
  correlation: DMatrix<f64>,
  covariance: DMatrix<f64>,
  observations: usize,
  frequency: SampleFrequency,
}

impl CovarianceModel {
  /// Estimate from equal-length columns, one per asset.
  pub fn estimate(columns: &[Vec<f64>], frequency: SampleFrequency) -> Result<Self> {
    let n = columns.len();
    if n == 0 {
      return Err(RiskError::InsufficientData("no series supplied".to_string()));
    }

    let len = columns[0].len();
    if let Some(bad) = columns.iter().position(|c| c.len() != len) {
      return Err(RiskError::MisalignedSeries(format!(
        "series {bad} has {} observations, expected {len}",
        columns[bad].len()
      )));
    }
    if len < 2 {
      return Err(RiskError::InsufficientData(format!(
        "need at least 2 aligned observations, got {len}"
      )));
    }
    if columns.iter().flatten().any(|x| !x.is_finite()) {
      return Err(RiskError::InvalidInput(
        "series contains non-finite values".to_string(),
      ));
    }

    let means = DVector::from_iterator(n, columns.iter().map(|c| sample_mean(c)));
    let std_devs = DVector::from_iterator(
      n,
      columns
        .iter()
        .zip(means.iter())
        .map(|(c, &m)| sample_variance(c, m).sqrt()),
    );

    let mut correlation = DMatrix::<f64>::identity(n, n);
    for i in 0..n {
      for j in (i + 1)..n {
        let r = pearson_unchecked(&columns[i], &columns[j]);
        correlation[(i, j)] = r;
        correlation[(j, i)] = r;
      }
    }

    let covariance = DMatrix::from_fn(n, n, |i, j| std_devs[i] * std_devs[j] * correlation[(i, j)]);

    Ok(Self {
      means,
      std_devs,
      correlation,
      covariance,
      observations: len,
      frequency,
    })
  }

  pub fn assets(&self) -> usize {
    self.means.len()
  }

  pub fn observations(&self) -> usize {
    self.observations
  }

  pub fn frequency(&self) -> SampleFrequency {
    self.frequency
  }

  pub fn means(&self) -> &DVector<f64> {
    &self.means
  }

  pub fn std_devs(&self) -> &DVector<f64> {
    &self.std_devs
  }

  pub fn correlation(&self) -> &DMatrix<f64> {
    &self.correlation
  }

  pub fn covariance(&self) -> &DMatrix<f64> {
    &self.covariance
  }

  /// Mean vector and covariance matrix scaled to one year.
  pub fn annualized(&self) -> (DVector<f64>, DMatrix<f64>) {
    let p = self.frequency.periods_per_year();
    (&self.means * p, &self.covariance * p)
  }

  /// Native-period mean and volatility of the portfolio holding `weights`.
  pub fn portfolio_moments(&self, weights: &[f64]) -> Result<(f64, f64)> {
    if weights.len() != self.assets() {
      return Err(RiskError::InvalidWeights(format!(
        "{} weights for {} assets",
        weights.len(),
        self.assets()
      )));
    }
    let w = DVector::from_column_slice(weights);
    let mean = w.dot(&self.means);
    let variance = (&self.covariance * &w).dot(&w).max(0.0);
    Ok((mean, variance.sqrt()))
  }

  /// Whether the covariance matrix admits a Cholesky factorization.
  pub fn is_positive_definite(&self) -> bool {
    self.covariance.clone().cholesky().is_some()
  }

  /// Two-asset view used by the VaR estimators.
  pub fn bivariate(&self) -> Result<BivariateMoments> {
    if self.assets() != 2 {
      return Err(RiskError::InvalidInput(format!(
        "bivariate moments need exactly 2 assets, got {}",
        self.assets()
      )));
    }
    Ok(BivariateMoments {
      mu: [self.means[0], self.means[1]],
      sigma: [self.std_devs[0], self.std_devs[1]],
      rho: self.correlation[(0, 1)],
    })
  }
}

/// Means, volatilities and correlation of a two-asset portfolio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BivariateMoments {
  pub mu: [f64; 2],
  pub sigma: [f64; 2],
  pub rho: f64,
}

impl BivariateMoments {
  /// `w1 μ1 + w2 μ2`.
  pub fn portfolio_mean(&self, w: [f64; 2]) -> f64 {
    w[0] * self.mu[0] + w[1] * self.mu[1]
  }

  /// `sqrt(w1² σ1² + w2² σ2² + 2 w1 w2 ρ σ1 σ2)`.
  pub fn portfolio_volatility(&self, w: [f64; 2]) -> f64 {
    let [s1, s2] = self.sigma;
    let var =
      w[0] * w[0] * s1 * s1 + w[1] * w[1] * s2 * s2 + 2.0 * w[0] * w[1] * self.rho * s1 * s2;
    var.max(0.0).sqrt()
  }

  /// Lower Cholesky row of the 2x2 correlation matrix, `(ρ, sqrt(1 - ρ²))`.
  pub fn cholesky(&self) -> Result<(f64, f64)> {
    cholesky_2x2(self.rho)
  }
}

const DEGENERATE_EPS: f64 = 1e-12;

/// Factor the correlation matrix `[[1, ρ], [ρ, 1]]`.
///
/// Fails when `|ρ|` reaches one up to rounding (or is not a number), where the matrix is
/// only semi-definite.
pub fn cholesky_2x2(rho: f64) -> Result<(f64, f64)> {
  if !rho.is_finite() || rho.abs() >= 1.0 - DEGENERATE_EPS {
    return Err(RiskError::NonPositiveDefinite(format!(
      "degenerate correlation {rho}"
    )));
  }
  Ok((rho, (1.0 - rho * rho).sqrt()))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;
  use crate::stats::descriptive::covariance;

  fn columns() -> Vec<Vec<f64>> {
    vec![
      vec![0.01, -0.02, 0.015, -0.01, 0.02],
      vec![0.005, -0.01, 0.008, -0.005, 0.012],
      vec![-0.003, 0.004, 0.001, 0.002, -0.006],
    ]
  }

  #[test]
  fn covariance_matches_pairwise_sample_covariance() {
    let cols = columns();
    let model = CovarianceModel::estimate(&cols, SampleFrequency::Daily).unwrap();

    for i in 0..3 {
      assert_abs_diff_eq!(model.correlation()[(i, i)], 1.0);
      for j in 0..3 {
        let expected = covariance(&cols[i], &cols[j]).unwrap();
        assert_relative_eq!(model.covariance()[(i, j)], expected, epsilon = 1e-14);
        assert_abs_diff_eq!(
          model.correlation()[(i, j)],
          model.correlation()[(j, i)]
        );
      }
    }
    assert!(model.is_positive_definite());
  }

  #[test]
  fn annualized_view_scales_by_periods() {
    let model = CovarianceModel::estimate(&columns(), SampleFrequency::Daily).unwrap();
    let (mu, cov) = model.annualized();
    assert_relative_eq!(mu[0], model.means()[0] * 252.0, epsilon = 1e-15);
    assert_relative_eq!(cov[(1, 2)], model.covariance()[(1, 2)] * 252.0, epsilon = 1e-15);
  }

  #[test]
  fn portfolio_moments_agree_with_bivariate_formula() {
    let cols = columns();
    let model = CovarianceModel::estimate(&cols[..2], SampleFrequency::Daily).unwrap();
    let bi = model.bivariate().unwrap();
    let (m, v) = model.portfolio_moments(&[0.3, 0.7]).unwrap();

    assert_relative_eq!(m, bi.portfolio_mean([0.3, 0.7]), epsilon = 1e-15);
    assert_relative_eq!(v, bi.portfolio_volatility([0.3, 0.7]), epsilon = 1e-14);
  }

  #[test]
  fn cholesky_rejects_degenerate_correlation() {
    assert!(matches!(cholesky_2x2(1.0), Err(RiskError::NonPositiveDefinite(_))));
    assert!(matches!(cholesky_2x2(-1.0), Err(RiskError::NonPositiveDefinite(_))));
    let (a, b) = cholesky_2x2(0.6).unwrap();
    assert_abs_diff_eq!(a, 0.6);
    assert_abs_diff_eq!(b, 0.8, epsilon = 1e-15);
  }

  #[test]
  fn covariance_is_symmetric_with_variance_diagonal() {
    let cols = columns();
    let model = CovarianceModel::estimate(&cols, SampleFrequency::Weekly).unwrap();
    let cov = model.covariance();

    assert_eq!(cov.nrows(), 3);
    for i in 0..3 {
      let sd = model.std_devs()[i];
      assert_relative_eq!(cov[(i, i)], sd * sd, epsilon = 1e-15);
      for j in 0..3 {
        assert_eq!(cov[(i, j)], cov[(j, i)]);
      }
    }
  }

  #[test]
  fn estimate_rejects_bad_shapes() {
    let res = CovarianceModel::estimate(&[vec![0.1, 0.2], vec![0.1]], SampleFrequency::Daily);
    assert!(matches!(res, Err(RiskError::MisalignedSeries(_))));
    let res = CovarianceModel::estimate(&[vec![0.1], vec![0.1]], SampleFrequency::Daily);
    assert!(matches!(res, Err(RiskError::InsufficientData(_))));
  }
}
