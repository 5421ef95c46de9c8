//! # Engine Configuration
//!
//! $$
//! \theta=\theta_{\text{default}}\oplus\theta_{\text{toml}}\oplus\theta_{\text{request}}
//! $$
//!
//! Tunables for every engine. Missing TOML keys keep their defaults and request fields
//! override both.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::RiskError;
use crate::quant::budget::Deadline;
use crate::quant::portfolio::FrontierConfig;
use crate::quant::portfolio::OptimizerMethod;
use crate::quant::portfolio::PortfolioEngineConfig;
use crate::quant::risk::comparison::AgreementThresholds;
use crate::quant::risk::dual::DualAssetVaR;
use crate::quant::risk::var::SimulationConfig;
use crate::stats::descriptive::SampleFrequency;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub monte_carlo_trials: usize,
  pub frontier_samples: usize,
  /// Fixed seed for reproducible simulations; a fresh one is drawn per request when unset.
  pub seed: Option<u64>,
  pub weight_tolerance: f64,
  /// Annual rate.
  pub risk_free_rate: f64,
  pub frequency: SampleFrequency,
  /// VaR horizon in native periods.
  pub horizon: u32,
  /// Wall-clock budget per request.
  pub time_budget_ms: Option<u64>,
  pub agreement: AgreementThresholds,
  /// Ticker used for beta when a request names none.
  pub benchmark: Option<String>,
  pub optimizer: OptimizerMethod,
  pub max_iters: u64,
  /// Trials or samples per rayon work unit.
  pub chunk_size: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      monte_carlo_trials: 10_000,
      frontier_samples: 1_000,
      seed: None,
      weight_tolerance: 0.01,
      risk_free_rate: 0.0,
      frequency: SampleFrequency::Daily,
      horizon: 1,
      time_budget_ms: None,
      agreement: AgreementThresholds::default(),
      benchmark: None,
      optimizer: OptimizerMethod::NelderMead,
      max_iters: 5_000,
      chunk_size: 1_024,
    }
  }
}

impl EngineConfig {
  pub fn from_toml_str(s: &str) -> Result<Self> {
    let config: Self = toml::from_str(s).map_err(|e| RiskError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
      .map_err(|e| RiskError::Config(format!("{}: {e}", path.display())))?;
    Self::from_toml_str(&raw)
  }

  pub fn validate(&self) -> Result<()> {
    if self.monte_carlo_trials == 0 {
      return Err(RiskError::Config("monte_carlo_trials must be positive".to_string()));
    }
    if self.frontier_samples == 0 {
      return Err(RiskError::Config("frontier_samples must be positive".to_string()));
    }
    if !(self.weight_tolerance.is_finite() && self.weight_tolerance > 0.0) {
      return Err(RiskError::Config("weight_tolerance must be positive".to_string()));
    }
    if !self.risk_free_rate.is_finite() {
      return Err(RiskError::Config("risk_free_rate must be finite".to_string()));
    }
    if self.horizon == 0 {
      return Err(RiskError::Config("horizon must be at least 1".to_string()));
    }
    if self.chunk_size == 0 {
      return Err(RiskError::Config("chunk_size must be positive".to_string()));
    }
    let AgreementThresholds { good, moderate } = self.agreement;
    if !(good > 0.0 && good <= moderate) {
      return Err(RiskError::Config(format!(
        "agreement thresholds must satisfy 0 < good <= moderate, got {good} and {moderate}"
      )));
    }
    Ok(())
  }

  /// Configured seed, or a fresh random one.
  pub fn resolved_seed(&self) -> u64 {
    self.seed.unwrap_or_else(rand::random)
  }

  pub fn deadline(&self) -> Deadline {
    Deadline::from_millis(self.time_budget_ms)
  }

  pub fn simulation(&self, seed: u64) -> SimulationConfig {
    SimulationConfig::new(self.monte_carlo_trials, seed, self.chunk_size)
  }

  pub fn dual_var(&self) -> DualAssetVaR {
    DualAssetVaR::new(self.weight_tolerance, self.agreement)
  }

  pub fn portfolio_engine(&self, seed: u64) -> PortfolioEngineConfig {
    PortfolioEngineConfig {
      optimizer: self.optimizer,
      risk_free: self.risk_free_rate,
      frequency: self.frequency,
      max_iters: self.max_iters,
      frontier: FrontierConfig::new(self.frontier_samples, seed, self.chunk_size),
      search_samples: self.monte_carlo_trials,
      weight_tolerance: self.weight_tolerance,
    }
  }
}
