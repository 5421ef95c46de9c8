//! # Value at Risk
//!
//! $$
//! \text{VaR}_c=-\left(\mu_p h+\sigma_p\sqrt{h}\,\Phi^{-1}(1-c)\right),\qquad
//! \text{ES}_c=-\mathbb E\left[R_p \mid R_p\le -\text{VaR}_c\right]
//! $$
//!
//! Historical, parametric and Monte Carlo estimators for a two-asset portfolio.
//! All figures are positive loss fractions of portfolio value; a tail quantile that is
//! still a gain is reported as a zero loss.

use impl_new_derive::ImplNew;
use rand_distr::Distribution;
use rand_distr::StandardNormal;
use serde::Deserialize;
use serde::Serialize;

use crate::error::check_confidence;
use crate::error::Result;
use crate::error::RiskError;
use crate::quant::budget::Deadline;
use crate::quant::covariance::BivariateMoments;
use crate::quant::covariance::CovarianceModel;
use crate::quant::sampling::sample_chunks;
use crate::stats::descriptive::sample_mean;
use crate::stats::descriptive::sample_variance;
use crate::stats::descriptive::SampleFrequency;
use crate::stats::normal;

/// Closed set of VaR estimators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaRMethod {
  /// Empirical percentile of reweighted historical portfolio returns.
  Historical,
  /// Variance-covariance closed form under joint normality.
  Parametric,
  /// Percentile of correlated bivariate normal draws.
  MonteCarlo,
}

impl VaRMethod {
  pub const ALL: [VaRMethod; 3] = [Self::Historical, Self::Parametric, Self::MonteCarlo];

  /// Run this estimator on `input` at confidence `confidence`.
  pub fn compute(self, input: &VaRInput<'_>, confidence: f64) -> Result<VaREstimate> {
    check_confidence(confidence)?;
    input.validate()?;

    match self {
      Self::Historical => {
        let blended = input.portfolio_returns();
        historical_var(&blended, confidence, input.horizon)
      }
      Self::Parametric => {
        let m = input.moments()?;
        parametric_var(
          m.portfolio_mean(input.weights),
          m.portfolio_volatility(input.weights),
          confidence,
          input.horizon,
        )
      }
      Self::MonteCarlo => {
        let m = input.moments()?;
        monte_carlo_var(
          &m,
          input.weights,
          confidence,
          input.horizon,
          &input.simulation,
          &input.deadline,
        )
        .map(|mc| mc.estimate)
      }
    }
  }
}

/// Monte Carlo trial configuration.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
  /// Number of simulated portfolio returns.
  pub trials: usize,
  /// Base seed; chunk RNGs are derived from it.
  pub seed: u64,
  /// Trials drawn per parallel work unit.
  pub chunk_size: usize,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      trials: 10_000,
      seed: 42,
      chunk_size: 2_048,
    }
  }
}

/// Two aligned return series with the weights held in each.
#[derive(Clone, Debug)]
pub struct VaRInput<'a> {
  pub series: [&'a [f64]; 2],
  pub weights: [f64; 2],
  /// Horizon in native periods.
  pub horizon: u32,
  pub simulation: SimulationConfig,
  pub deadline: Deadline,
}

impl<'a> VaRInput<'a> {
  pub fn new(first: &'a [f64], second: &'a [f64], weights: [f64; 2]) -> Self {
    Self {
      series: [first, second],
      weights,
      horizon: 1,
      simulation: SimulationConfig::default(),
      deadline: Deadline::unbounded(),
    }
  }

  pub fn with_horizon(mut self, horizon: u32) -> Self {
    self.horizon = horizon;
    self
  }

  pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
    self.simulation = simulation;
    self
  }

  pub fn with_deadline(mut self, deadline: Deadline) -> Self {
    self.deadline = deadline;
    self
  }

  fn validate(&self) -> Result<()> {
    let [a, b] = self.series;
    if a.len() != b.len() {
      return Err(RiskError::MisalignedSeries(format!(
        "series lengths differ ({} vs {})",
        a.len(),
        b.len()
      )));
    }
    if self.weights.iter().any(|w| !w.is_finite()) {
      return Err(RiskError::InvalidWeights("weights must be finite".to_string()));
    }
    if self.horizon == 0 {
      return Err(RiskError::InvalidInput("horizon must be at least 1 period".to_string()));
    }
    Ok(())
  }

  /// Per-period portfolio return `w1 r1 + w2 r2`.
  pub fn portfolio_returns(&self) -> Vec<f64> {
    let [a, b] = self.series;
    let [w1, w2] = self.weights;
    a.iter().zip(b.iter()).map(|(x, y)| w1 * x + w2 * y).collect()
  }

  /// Sample means, volatilities and correlation of the two series.
  pub fn moments(&self) -> Result<BivariateMoments> {
    bivariate_moments(self.series[0], self.series[1])
  }
}

/// Sample moments of two aligned series.
pub fn bivariate_moments(a: &[f64], b: &[f64]) -> Result<BivariateMoments> {
  CovarianceModel::estimate(&[a.to_vec(), b.to_vec()], SampleFrequency::Daily)?.bivariate()
}

/// One estimator's output.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VaREstimate {
  pub method: VaRMethod,
  /// Loss at the confidence level, as a fraction of portfolio value.
  pub var: f64,
  /// Average loss beyond the VaR threshold.
  pub expected_shortfall: f64,
  /// Observations or simulated trials behind the estimate (0 for the closed form).
  pub samples: usize,
}

/// Monte Carlo estimate plus the moments of the simulated distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MonteCarloEstimate {
  pub estimate: VaREstimate,
  pub simulated_mean: f64,
  pub simulated_std: f64,
}

/// Smallest sample able to resolve the `1 - c` percentile, `ceil(1 / (1 - c))`.
///
/// 20 observations at 95%, 100 at 99%.
pub fn min_observations(confidence: f64) -> usize {
  ((1.0 / (1.0 - confidence)) - 1e-9).ceil().max(2.0) as usize
}

/// Percentile of ascending `sorted` data with linear interpolation between closest ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
  match sorted.len() {
    0 => f64::NAN,
    1 => sorted[0],
    n => {
      let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
      let lo = rank.floor() as usize;
      let hi = (lo + 1).min(n - 1);
      let frac = rank - lo as f64;
      sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
  }
}

/// Mean of the sorted observations at or below `threshold`.
fn tail_mean(sorted: &[f64], threshold: f64) -> f64 {
  let cut = sorted.partition_point(|&x| x <= threshold);
  if cut == 0 {
    threshold
  } else {
    sample_mean(&sorted[..cut])
  }
}

fn as_loss(quantile: f64) -> f64 {
  if quantile < 0.0 {
    -quantile
  } else {
    0.0
  }
}

fn sort_ascending(xs: &mut [f64]) {
  xs.sort_by(f64::total_cmp);
}

/// Historical-simulation VaR of a per-period portfolio return series.
///
/// Multi-period horizons scale the one-period quantile by `sqrt(h)`.
pub fn historical_var(
  portfolio_returns: &[f64],
  confidence: f64,
  horizon: u32,
) -> Result<VaREstimate> {
  check_confidence(confidence)?;
  let required = min_observations(confidence);
  if portfolio_returns.len() < required {
    return Err(RiskError::InsufficientData(format!(
      "historical VaR at {:.1}% needs {required} observations, got {}",
      confidence * 100.0,
      portfolio_returns.len()
    )));
  }

  let mut sorted = portfolio_returns.to_vec();
  sort_ascending(&mut sorted);
  let q = percentile(&sorted, 1.0 - confidence);
  let es = tail_mean(&sorted, q);
  let scale = (horizon.max(1) as f64).sqrt();

  Ok(VaREstimate {
    method: VaRMethod::Historical,
    var: as_loss(q * scale),
    expected_shortfall: as_loss(es * scale),
    samples: sorted.len(),
  })
}

/// Variance-covariance VaR and its closed-form expected shortfall.
///
/// `mean` and `volatility` are per native period; the horizon scales them by `h` and `sqrt(h)`.
pub fn parametric_var(
  mean: f64,
  volatility: f64,
  confidence: f64,
  horizon: u32,
) -> Result<VaREstimate> {
  check_confidence(confidence)?;
  let h = horizon.max(1) as f64;
  let mu = mean * h;
  let sigma = volatility.max(0.0) * h.sqrt();
  let z = normal::tail_z_score(confidence);

  let q = mu + sigma * z;
  let es_quantile = mu - sigma * normal::pdf(z) / (1.0 - confidence);

  Ok(VaREstimate {
    method: VaRMethod::Parametric,
    var: as_loss(q),
    expected_shortfall: as_loss(es_quantile),
    samples: 0,
  })
}

/// Simulate `sim.trials` portfolio returns from correlated bivariate normal draws.
///
/// `r1 = μ1 + σ1 z1`, `r2 = μ2 + σ2 (ρ z1 + sqrt(1 - ρ²) z2)`, each scaled to the horizon.
pub fn simulate_portfolio_returns(
  moments: &BivariateMoments,
  weights: [f64; 2],
  horizon: u32,
  sim: &SimulationConfig,
  deadline: &Deadline,
) -> Result<Vec<f64>> {
  if sim.trials == 0 {
    return Err(RiskError::InvalidInput("Monte Carlo needs at least one trial".to_string()));
  }
  let (l21, l22) = moments.cholesky()?;
  let h = horizon.max(1) as f64;
  let mu = [moments.mu[0] * h, moments.mu[1] * h];
  let sigma = [moments.sigma[0] * h.sqrt(), moments.sigma[1] * h.sqrt()];

  sample_chunks(sim.trials, sim.chunk_size, sim.seed, deadline, |rng| {
    let z1: f64 = StandardNormal.sample(rng);
    let z2: f64 = StandardNormal.sample(rng);
    let r1 = mu[0] + sigma[0] * z1;
    let r2 = mu[1] + sigma[1] * (l21 * z1 + l22 * z2);
    weights[0] * r1 + weights[1] * r2
  })
}

/// Monte Carlo VaR. Fails with [`RiskError::NonPositiveDefinite`] when `|ρ| = 1`.
pub fn monte_carlo_var(
  moments: &BivariateMoments,
  weights: [f64; 2],
  confidence: f64,
  horizon: u32,
  sim: &SimulationConfig,
  deadline: &Deadline,
) -> Result<MonteCarloEstimate> {
  check_confidence(confidence)?;
  let mut simulated = simulate_portfolio_returns(moments, weights, horizon, sim, deadline)?;
  let simulated_mean = sample_mean(&simulated);
  let simulated_std = sample_variance(&simulated, simulated_mean).sqrt();

  sort_ascending(&mut simulated);
  let q = percentile(&simulated, 1.0 - confidence);
  let es = tail_mean(&simulated, q);

  Ok(MonteCarloEstimate {
    estimate: VaREstimate {
      method: VaRMethod::MonteCarlo,
      var: as_loss(q),
      expected_shortfall: as_loss(es),
      samples: simulated.len(),
    },
    simulated_mean,
    simulated_std,
  })
}
