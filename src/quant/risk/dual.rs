//! # Dual-Asset VaR
//!
//! $$
//! \mu_p=w_1\mu_1+w_2\mu_2,\qquad
//! \sigma_p^2=w_1^2\sigma_1^2+w_2^2\sigma_2^2+2w_1w_2\rho\sigma_1\sigma_2
//! $$
//!
//! Validates a two-asset position, then runs the historical, parametric and Monte Carlo
//! estimators side by side. A degenerate correlation makes the Monte Carlo branch fall
//! back to the parametric closed form and the result carries a `degraded` flag.

use std::time::Instant;

use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::comparison::AgreementThresholds;
use super::comparison::MethodAgreement;
use super::var::historical_var;
use super::var::min_observations;
use super::var::monte_carlo_var;
use super::var::parametric_var;
use super::var::VaREstimate;
use super::var::VaRInput;
use crate::error::Result;
use crate::error::RiskError;
use crate::quant::portfolio::types::check_valuation;
use crate::quant::portfolio::types::check_weights;
use crate::quant::portfolio::types::PortfolioSpec;

fn check_trials(trials: usize) -> Result<()> {
  if trials == 0 {
    return Err(RiskError::InvalidInput("Monte Carlo needs at least one trial".to_string()));
  }
  Ok(())
}

/// Validation policy and comparison thresholds for dual-asset requests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualAssetVaR {
  /// Allowed deviation of `w1 + w2` from one.
  pub weight_tolerance: f64,
  pub agreement: AgreementThresholds,
}

impl Default for DualAssetVaR {
  fn default() -> Self {
    Self {
      weight_tolerance: 0.01,
      agreement: AgreementThresholds::default(),
    }
  }
}

/// Loss amounts in the portfolio's base currency.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VaRAmounts {
  pub historical: f64,
  pub parametric: f64,
  pub monte_carlo: f64,
  pub expected_shortfall: f64,
}

/// Moments of the simulated portfolio distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MonteCarloSummary {
  pub trials: usize,
  pub mean: f64,
  pub std: f64,
  /// Set when the simulation could not run and the parametric figures were substituted.
  pub degraded: bool,
}

/// Everything computed for one dual-asset request. Loss figures are positive fractions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VaRResult {
  pub portfolio_value: f64,
  pub confidence_level: f64,
  pub horizon: u32,
  pub observations: usize,
  /// Mean per-period portfolio return.
  pub portfolio_return: f64,
  /// Per-period portfolio volatility.
  pub portfolio_volatility: f64,
  pub correlation: f64,
  pub var_historical: f64,
  pub var_parametric: f64,
  pub var_monte_carlo: f64,
  /// Historical tail average beyond the VaR threshold.
  pub expected_shortfall: f64,
  pub expected_shortfall_parametric: f64,
  pub expected_shortfall_monte_carlo: f64,
  pub amounts: VaRAmounts,
  pub monte_carlo: MonteCarloSummary,
  pub agreement: MethodAgreement,
  pub beta: Option<f64>,
}

impl VaRResult {
  /// Attach the portfolio beta against an aligned benchmark series.
  pub fn with_beta(mut self, beta: Option<f64>) -> Self {
    self.beta = beta;
    self
  }
}

impl DualAssetVaR {
  pub fn new(weight_tolerance: f64, agreement: AgreementThresholds) -> Self {
    Self {
      weight_tolerance,
      agreement,
    }
  }

  /// Check a two-holding position and the trial count, before any data is touched.
  ///
  /// Returns the weights in holding order.
  pub fn validate_spec(&self, spec: &PortfolioSpec, trials: usize) -> Result<[f64; 2]> {
    let [first, second] = spec.assets.as_slice() else {
      return Err(RiskError::InvalidInput(format!(
        "dual-asset VaR takes exactly 2 holdings, got {}",
        spec.assets.len()
      )));
    };
    spec.validate(self.weight_tolerance)?;
    check_trials(trials)?;
    Ok([first.weight, second.weight])
  }

  /// Check every input; nothing is computed unless this passes.
  pub fn validate(
    &self,
    input: &VaRInput<'_>,
    portfolio_value: f64,
    confidence: f64,
  ) -> Result<()> {
    check_weights(&input.weights, self.weight_tolerance)?;
    check_valuation(portfolio_value, confidence, input.horizon)?;
    check_trials(input.simulation.trials)?;

    let [a, b] = input.series;
    if a.len() != b.len() {
      return Err(RiskError::MisalignedSeries(format!(
        "series lengths differ ({} vs {})",
        a.len(),
        b.len()
      )));
    }
    let required = min_observations(confidence);
    if a.len() < required {
      return Err(RiskError::InsufficientData(format!(
        "{} aligned observations, {required} needed at {:.1}% confidence",
        a.len(),
        confidence * 100.0
      )));
    }
    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
      return Err(RiskError::InvalidInput("series contains non-finite values".to_string()));
    }
    Ok(())
  }

  /// Run all three estimators concurrently and assemble a [`VaRResult`].
  pub fn compute(
    &self,
    input: &VaRInput<'_>,
    portfolio_value: f64,
    confidence: f64,
  ) -> Result<VaRResult> {
    self.validate(input, portfolio_value, confidence)?;
    input.deadline.check()?;

    let start = Instant::now();
    let moments = input.moments()?;
    let weights = input.weights;
    let mu_p = moments.portfolio_mean(weights);
    let sigma_p = moments.portfolio_volatility(weights);
    let blended = input.portfolio_returns();

    let (historical, (parametric, simulated)) = rayon::join(
      || historical_var(&blended, confidence, input.horizon),
      || {
        rayon::join(
          || parametric_var(mu_p, sigma_p, confidence, input.horizon),
          || {
            monte_carlo_var(
              &moments,
              weights,
              confidence,
              input.horizon,
              &input.simulation,
              &input.deadline,
            )
          },
        )
      },
    );
    let historical = historical?;
    let parametric = parametric?;

    let (monte_carlo, summary) = match simulated {
      Ok(mc) => (
        mc.estimate,
        MonteCarloSummary {
          trials: mc.estimate.samples,
          mean: mc.simulated_mean,
          std: mc.simulated_std,
          degraded: false,
        },
      ),
      Err(RiskError::NonPositiveDefinite(reason)) => {
        warn!(%reason, rho = moments.rho, "Monte Carlo VaR degraded to the parametric closed form");
        let h = input.horizon as f64;
        (
          VaREstimate {
            samples: 0,
            ..parametric
          },
          MonteCarloSummary {
            trials: 0,
            mean: mu_p * h,
            std: sigma_p * h.sqrt(),
            degraded: true,
          },
        )
      }
      Err(e) => return Err(e),
    };
    input.deadline.check()?;

    debug!(
      elapsed_ms = start.elapsed().as_millis() as u64,
      historical = historical.var,
      parametric = parametric.var,
      monte_carlo = monte_carlo.var,
      "dual-asset VaR computed"
    );

    let agreement = self
      .agreement
      .classify(&[historical.var, parametric.var, monte_carlo.var]);

    Ok(VaRResult {
      portfolio_value,
      confidence_level: confidence,
      horizon: input.horizon,
      observations: blended.len(),
      portfolio_return: mu_p,
      portfolio_volatility: sigma_p,
      correlation: moments.rho,
      var_historical: historical.var,
      var_parametric: parametric.var,
      var_monte_carlo: monte_carlo.var,
      expected_shortfall: historical.expected_shortfall,
      expected_shortfall_parametric: parametric.expected_shortfall,
      expected_shortfall_monte_carlo: monte_carlo.expected_shortfall,
      amounts: VaRAmounts {
        historical: historical.var * portfolio_value,
        parametric: parametric.var * portfolio_value,
        monte_carlo: monte_carlo.var * portfolio_value,
        expected_shortfall: historical.expected_shortfall * portfolio_value,
      },
      monte_carlo: summary,
      agreement,
      beta: None,
    })
  }
}
