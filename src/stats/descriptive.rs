//! # Descriptive Statistics
//!
//! $$
//! \hat\rho_{xy}=\frac{\sum_i (x_i-\bar x)(y_i-\bar y)}{\sqrt{\sum_i (x_i-\bar x)^2\sum_i (y_i-\bar y)^2}},
//! \qquad \sigma_{\text{ann}}=s\sqrt{P}
//! $$
//!
//! Sample moments of return series. Variances use the `n - 1` denominator.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::RiskError;

/// Native sampling period of a return series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFrequency {
  #[default]
  Daily,
  Weekly,
  Monthly,
}

impl SampleFrequency {
  /// Number of native periods in one year.
  pub fn periods_per_year(self) -> f64 {
    match self {
      Self::Daily => 252.0,
      Self::Weekly => 52.0,
      Self::Monthly => 12.0,
    }
  }
}

impl FromStr for SampleFrequency {
  type Err = RiskError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "d" | "1d" | "daily" => Ok(Self::Daily),
      "w" | "1wk" | "weekly" => Ok(Self::Weekly),
      "m" | "1mo" | "monthly" => Ok(Self::Monthly),
      other => Err(RiskError::InvalidInput(format!(
        "unknown sampling frequency '{other}'"
      ))),
    }
  }
}

impl fmt::Display for SampleFrequency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Daily => write!(f, "daily"),
      Self::Weekly => write!(f, "weekly"),
      Self::Monthly => write!(f, "monthly"),
    }
  }
}

/// Native and annualized moments of one series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesSummary {
  pub observations: usize,
  pub mean: f64,
  pub std_dev: f64,
  pub annualized_mean: f64,
  pub annualized_volatility: f64,
}

pub(crate) fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

pub(crate) fn sample_variance(xs: &[f64], mean: f64) -> f64 {
  if xs.len() < 2 {
    return 0.0;
  }

  let mut acc = 0.0;
  for &x in xs {
    let d = x - mean;
    acc += d * d;
  }
  acc / (xs.len() - 1) as f64
}

fn require_observations(xs: &[f64], min: usize) -> Result<()> {
  if xs.len() < min {
    return Err(RiskError::InsufficientData(format!(
      "need at least {min} observations, got {}",
      xs.len()
    )));
  }
  if xs.iter().any(|x| !x.is_finite()) {
    return Err(RiskError::InvalidInput(
      "series contains non-finite values".to_string(),
    ));
  }
  Ok(())
}

fn require_aligned(x: &[f64], y: &[f64]) -> Result<()> {
  if x.len() != y.len() {
    return Err(RiskError::MisalignedSeries(format!(
      "series lengths differ ({} vs {})",
      x.len(),
      y.len()
    )));
  }
  Ok(())
}

/// Sample mean.
pub fn mean(xs: &[f64]) -> Result<f64> {
  require_observations(xs, 1)?;
  Ok(sample_mean(xs))
}

/// Sample variance with the `n - 1` denominator.
pub fn variance(xs: &[f64]) -> Result<f64> {
  require_observations(xs, 2)?;
  Ok(sample_variance(xs, sample_mean(xs)))
}

/// Sample standard deviation with the `n - 1` denominator.
pub fn std_dev(xs: &[f64]) -> Result<f64> {
  variance(xs).map(f64::sqrt)
}

/// Native standard deviation scaled by `sqrt(periods per year)`.
pub fn annualized_volatility(xs: &[f64], frequency: SampleFrequency) -> Result<f64> {
  Ok(std_dev(xs)? * frequency.periods_per_year().sqrt())
}

/// Sample covariance of two aligned series.
pub fn covariance(x: &[f64], y: &[f64]) -> Result<f64> {
  require_aligned(x, y)?;
  require_observations(x, 2)?;
  require_observations(y, 2)?;

  let mx = sample_mean(x);
  let my = sample_mean(y);
  let acc = x
    .iter()
    .zip(y.iter())
    .map(|(a, b)| (a - mx) * (b - my))
    .sum::<f64>();
  Ok(acc / (x.len() - 1) as f64)
}

/// Pearson correlation of two aligned series.
///
/// A constant series has no defined correlation; it is reported as `0`.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
  require_aligned(x, y)?;
  require_observations(x, 2)?;
  require_observations(y, 2)?;
  Ok(pearson_unchecked(x, y))
}

pub(crate) fn pearson_unchecked(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = sample_mean(&x[..n]);
  let my = sample_mean(&y[..n]);

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for i in 0..n {
    let dx = x[i] - mx;
    let dy = y[i] - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 {
    0.0
  } else {
    (cov / denom).clamp(-1.0, 1.0)
  }
}

/// Native and annualized moments of a series.
pub fn summarize(xs: &[f64], frequency: SampleFrequency) -> Result<SeriesSummary> {
  require_observations(xs, 2)?;
  let m = sample_mean(xs);
  let sd = sample_variance(xs, m).sqrt();
  let periods = frequency.periods_per_year();

  Ok(SeriesSummary {
    observations: xs.len(),
    mean: m,
    std_dev: sd,
    annualized_mean: m * periods,
    annualized_volatility: sd * periods.sqrt(),
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;

  const A: [f64; 5] = [0.01, -0.02, 0.015, -0.01, 0.02];
  const B: [f64; 5] = [0.005, -0.01, 0.008, -0.005, 0.012];

  #[test]
  fn moments_use_bessel_correction() {
    assert_relative_eq!(mean(&A).unwrap(), 0.003, epsilon = 1e-12);
    // sum of squared deviations = 0.00118, divided by n - 1 = 4
    assert_relative_eq!(variance(&A).unwrap(), 0.000_295, epsilon = 1e-12);
    assert_relative_eq!(std_dev(&A).unwrap(), 0.000_295_f64.sqrt(), epsilon = 1e-12);
  }

  #[test]
  fn identical_series_are_perfectly_correlated() {
    assert_abs_diff_eq!(pearson(&A, &A).unwrap(), 1.0, epsilon = 1e-12);
    let neg: Vec<f64> = A.iter().map(|x| -x).collect();
    assert_abs_diff_eq!(pearson(&A, &neg).unwrap(), -1.0, epsilon = 1e-12);
  }

  #[test]
  fn correlation_stays_in_unit_interval() {
    let rho = pearson(&A, &B).unwrap();
    assert!((-1.0..=1.0).contains(&rho));
    assert!(rho > 0.9);
  }

  #[test]
  fn constant_series_has_zero_correlation() {
    let flat = [0.01; 5];
    assert_eq!(pearson(&flat, &A).unwrap(), 0.0);
    assert_abs_diff_eq!(std_dev(&flat).unwrap(), 0.0, epsilon = 1e-15);
  }

  #[test]
  fn covariance_matches_correlation_times_vols() {
    let cov = covariance(&A, &B).unwrap();
    let rho = pearson(&A, &B).unwrap();
    let expected = rho * std_dev(&A).unwrap() * std_dev(&B).unwrap();
    assert_relative_eq!(cov, expected, epsilon = 1e-15);
  }

  #[test]
  fn rejects_short_and_misaligned_input() {
    assert!(matches!(std_dev(&[0.01]), Err(RiskError::InsufficientData(_))));
    assert!(matches!(
      pearson(&A, &B[..4]),
      Err(RiskError::MisalignedSeries(_))
    ));
    assert!(matches!(mean(&[]), Err(RiskError::InsufficientData(_))));
  }

  #[test]
  fn annualization_scales_by_root_periods() {
    let daily = std_dev(&A).unwrap();
    let annual = annualized_volatility(&A, SampleFrequency::Daily).unwrap();
    assert_relative_eq!(annual, daily * 252.0_f64.sqrt(), epsilon = 1e-15);

    let summary = summarize(&A, SampleFrequency::Monthly).unwrap();
    assert_relative_eq!(summary.annualized_mean, 0.036, epsilon = 1e-12);
    assert_eq!(summary.observations, 5);
  }

  #[test]
  fn frequency_parses_common_spellings() {
    assert_eq!("daily".parse::<SampleFrequency>().unwrap(), SampleFrequency::Daily);
    assert_eq!("1wk".parse::<SampleFrequency>().unwrap(), SampleFrequency::Weekly);
    assert!("hourly".parse::<SampleFrequency>().is_err());
  }
}
