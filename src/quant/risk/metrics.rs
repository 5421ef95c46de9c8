//! # Performance Metrics
//!
//! $$
//! S=\frac{\bar r-r_f/P}{s}\sqrt P,\qquad
//! \text{So}=\frac{\bar r-r_f/P}{\sqrt{\frac{1}{|D|-1}\sum_{r\in D}(r-\bar r_D)^2}}\sqrt P,\qquad
//! \beta=\frac{\operatorname{cov}(r,b)}{\operatorname{var}(b)}
//! $$
//!
//! `D` is the set of negative-return periods and `P` the periods per year. With fewer than
//! two losing periods the downside deviation is zero. Zero risk in the denominator yields a
//! signed infinity, or zero when the excess return is zero as well.

use serde::Serialize;

use crate::error::Result;
use crate::error::RiskError;
use crate::stats::descriptive::covariance;
use crate::stats::descriptive::mean;
use crate::stats::descriptive::sample_mean;
use crate::stats::descriptive::sample_variance;
use crate::stats::descriptive::std_dev;
use crate::stats::descriptive::summarize;
use crate::stats::descriptive::variance;
use crate::stats::descriptive::SampleFrequency;

fn risk_adjusted(excess: f64, risk: f64, periods: f64) -> f64 {
  if risk > 0.0 {
    excess / risk * periods.sqrt()
  } else if excess == 0.0 {
    0.0
  } else {
    excess.signum() * f64::INFINITY
  }
}

/// Annualized Sharpe ratio of a native-period return series; `risk_free` is annual.
pub fn sharpe_ratio(returns: &[f64], risk_free: f64, frequency: SampleFrequency) -> Result<f64> {
  let periods = frequency.periods_per_year();
  let excess = mean(returns)? - risk_free / periods;
  Ok(risk_adjusted(excess, std_dev(returns)?, periods))
}

/// Sample standard deviation of the negative periods, `0` with fewer than two of them.
pub fn downside_deviation(returns: &[f64]) -> f64 {
  let losses = returns.iter().copied().filter(|&r| r < 0.0).collect::<Vec<_>>();
  if losses.len() < 2 {
    return 0.0;
  }
  sample_variance(&losses, sample_mean(&losses)).sqrt()
}

/// Annualized Sortino ratio; only losing periods count as risk.
pub fn sortino_ratio(returns: &[f64], risk_free: f64, frequency: SampleFrequency) -> Result<f64> {
  let periods = frequency.periods_per_year();
  let excess = mean(returns)? - risk_free / periods;
  Ok(risk_adjusted(excess, downside_deviation(returns), periods))
}

/// Wealth curve `V_0 = 1, V_t = V_{t-1} (1 + r_t)`.
pub fn cumulative_curve(returns: &[f64]) -> Vec<f64> {
  let mut curve = Vec::with_capacity(returns.len() + 1);
  let mut value = 1.0;
  curve.push(value);
  for r in returns {
    value *= 1.0 + r;
    curve.push(value);
  }
  curve
}

/// Largest peak-to-trough decline of the compounded curve, as a positive fraction.
pub fn max_drawdown(returns: &[f64]) -> f64 {
  let mut peak = f64::NEG_INFINITY;
  let mut worst = 0.0_f64;
  for v in cumulative_curve(returns) {
    peak = peak.max(v);
    if peak > 0.0 {
      worst = worst.max((peak - v) / peak);
    }
  }
  worst
}

/// Sensitivity of `returns` to an aligned `benchmark` series.
pub fn beta(returns: &[f64], benchmark: &[f64]) -> Result<f64> {
  let cov = covariance(returns, benchmark)?;
  let var = variance(benchmark)?;
  if var <= 0.0 {
    return Err(RiskError::InsufficientData(
      "benchmark series has zero variance".to_string(),
    ));
  }
  Ok(cov / var)
}

/// Annualized performance of one portfolio return series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PerformanceReport {
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe_ratio: f64,
  pub sortino_ratio: f64,
  pub max_drawdown: f64,
  pub beta: Option<f64>,
  pub observations: usize,
}

/// Build a [`PerformanceReport`]; `benchmark` must be aligned with `returns`.
pub fn performance_report(
  returns: &[f64],
  risk_free: f64,
  frequency: SampleFrequency,
  benchmark: Option<&[f64]>,
) -> Result<PerformanceReport> {
  let summary = summarize(returns, frequency)?;

  Ok(PerformanceReport {
    expected_return: summary.annualized_mean,
    volatility: summary.annualized_volatility,
    sharpe_ratio: sharpe_ratio(returns, risk_free, frequency)?,
    sortino_ratio: sortino_ratio(returns, risk_free, frequency)?,
    max_drawdown: max_drawdown(returns),
    beta: benchmark.map(|b| beta(returns, b)).transpose()?,
    observations: summary.observations,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;

  const R: [f64; 5] = [0.01, -0.02, 0.015, -0.01, 0.02];

  #[test]
  fn sharpe_annualizes_daily_ratio() {
    let s = sharpe_ratio(&R, 0.0, SampleFrequency::Daily).unwrap();
    let expected = 0.003 / 0.000_295_f64.sqrt() * 252.0_f64.sqrt();
    assert_relative_eq!(s, expected, epsilon = 1e-10);

    let with_rf = sharpe_ratio(&R, 0.0252, SampleFrequency::Daily).unwrap();
    let expected = (0.003 - 0.0001) / 0.000_295_f64.sqrt() * 252.0_f64.sqrt();
    assert_relative_eq!(with_rf, expected, epsilon = 1e-10);
  }

  #[test]
  fn sortino_uses_losing_periods_only() {
    // losses -0.02, -0.01: mean -0.015, deviations +-0.005, n - 1 = 1
    let dd = 0.005_f64 * 2.0_f64.sqrt();
    assert_relative_eq!(downside_deviation(&R), dd, epsilon = 1e-15);
    let s = sortino_ratio(&R, 0.0, SampleFrequency::Daily).unwrap();
    assert_relative_eq!(s, 0.003 / dd * 252.0_f64.sqrt(), epsilon = 1e-10);
    assert_relative_eq!(s, 6.735, max_relative = 1e-3);
  }

  #[test]
  fn sortino_without_losses_is_infinite() {
    let s = sortino_ratio(&[0.01, 0.02, 0.005], 0.0, SampleFrequency::Daily).unwrap();
    assert!(s.is_infinite() && s > 0.0);
  }

  #[test]
  fn single_loss_has_no_downside_deviation() {
    let r = [0.01, -0.02, 0.03];
    assert_eq!(downside_deviation(&r), 0.0);
    let s = sortino_ratio(&r, 0.0, SampleFrequency::Daily).unwrap();
    assert!(s.is_infinite() && s > 0.0);

    let flat_losses = [-0.5, -0.5, -0.5];
    assert_eq!(downside_deviation(&flat_losses), 0.0);
    let s = sortino_ratio(&flat_losses, 0.0, SampleFrequency::Daily).unwrap();
    assert!(s.is_infinite() && s < 0.0);
  }

  #[test]
  fn drawdown_compounds_returns() {
    // 1.0 -> 1.1 -> 0.88 -> 0.968
    let dd = max_drawdown(&[0.1, -0.2, 0.1]);
    assert_abs_diff_eq!(dd, 0.2, epsilon = 1e-12);
    assert_eq!(max_drawdown(&[0.01, 0.02, 0.03]), 0.0);
    assert_abs_diff_eq!(max_drawdown(&[-0.5]), 0.5, epsilon = 1e-12);
  }

  #[test]
  fn drawdown_spans_consecutive_losses() {
    // peak 1.0, trough 0.9 * 0.9 = 0.81
    assert_abs_diff_eq!(max_drawdown(&[-0.1, -0.1, 0.05]), 0.19, epsilon = 1e-12);
  }

  #[test]
  fn beta_of_scaled_series() {
    let doubled: Vec<f64> = R.iter().map(|r| 2.0 * r).collect();
    assert_relative_eq!(beta(&doubled, &R).unwrap(), 2.0, epsilon = 1e-12);
    assert_relative_eq!(beta(&R, &R).unwrap(), 1.0, epsilon = 1e-12);
    assert!(beta(&R, &[0.01; 5]).is_err());
  }

  #[test]
  fn report_collects_everything() {
    let report = performance_report(&R, 0.0, SampleFrequency::Daily, Some(&R)).unwrap();
    assert_relative_eq!(report.expected_return, 0.003 * 252.0, epsilon = 1e-12);
    assert_relative_eq!(report.beta.unwrap(), 1.0, epsilon = 1e-12);
    assert_eq!(report.observations, 5);
    assert!(report.max_drawdown > 0.0);

    let no_bench = performance_report(&R, 0.0, SampleFrequency::Daily, None).unwrap();
    assert!(no_bench.beta.is_none());
  }

  #[test]
  fn flat_series_has_zero_sharpe() {
    let s = sharpe_ratio(&[0.0; 10], 0.0, SampleFrequency::Daily).unwrap();
    assert_eq!(s, 0.0);
  }
}
