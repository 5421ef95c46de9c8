//! # Portfolio Engine
//!
//! $$
//! (\mu,\Sigma)=P\cdot(\hat\mu,\hat\Sigma),\qquad \mathbf{w}^\* = \operatorname{Optimize}(\mu, \Sigma, r_f)
//! $$
//!
//! High-level orchestration over aligned return series: max-Sharpe optimization, frontier
//! sampling and performance of a given allocation. Expected returns and covariances are
//! annualized before any search.

use tracing::debug;
use tracing::warn;

use super::frontier::sample_frontier;
use super::frontier::EfficientFrontier;
use super::frontier::FrontierConfig;
use super::optimizers::optimize_max_sharpe;
use super::optimizers::SearchConfig;
use super::types::check_weights;
use super::types::evaluate;
use super::types::OptimizationResult;
use super::types::OptimizerMethod;
use crate::error::Result;
use crate::error::RiskError;
use crate::quant::budget::Deadline;
use crate::quant::covariance::CovarianceModel;
use crate::quant::risk::metrics::performance_report;
use crate::quant::risk::metrics::PerformanceReport;
use crate::quant::series::AlignedReturns;
use crate::stats::descriptive::SampleFrequency;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioEngineConfig {
  /// Optimizer used by [`PortfolioEngine::optimize`].
  pub optimizer: OptimizerMethod,
  /// Annual risk-free rate used in Sharpe computations.
  pub risk_free: f64,
  /// Native period of the input returns.
  pub frequency: SampleFrequency,
  /// Nelder-Mead iteration cap.
  pub max_iters: u64,
  /// Frontier sampling; its seed also drives random-search optimization.
  pub frontier: FrontierConfig,
  /// Draws used when `optimizer` is random search.
  pub search_samples: usize,
  /// Allowed deviation of supplied weights from a unit sum.
  pub weight_tolerance: f64,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      optimizer: OptimizerMethod::NelderMead,
      risk_free: 0.0,
      frequency: SampleFrequency::Daily,
      max_iters: 5_000,
      frontier: FrontierConfig::default(),
      search_samples: 10_000,
      weight_tolerance: 0.01,
    }
  }
}

/// Single entry-point engine for portfolio workflows.
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: PortfolioEngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  /// Sample moments of the aligned series; needs at least two assets.
  pub fn model(&self, returns: &AlignedReturns) -> Result<CovarianceModel> {
    if returns.assets() < 2 {
      return Err(RiskError::InsufficientAssets(returns.assets()));
    }
    let model = CovarianceModel::estimate(returns.columns(), self.config.frequency)?;
    if !model.is_positive_definite() {
      warn!(
        assets = model.assets(),
        "covariance matrix is singular, the optimal allocation may not be unique"
      );
    }
    Ok(model)
  }

  fn search_config(&self) -> SearchConfig {
    SearchConfig {
      method: self.config.optimizer,
      risk_free: self.config.risk_free,
      max_iters: self.config.max_iters,
      sampling: FrontierConfig {
        samples: self.config.search_samples,
        ..self.config.frontier
      },
    }
  }

  /// Maximum-Sharpe long-only allocation.
  pub fn optimize(
    &self,
    returns: &AlignedReturns,
    deadline: &Deadline,
  ) -> Result<OptimizationResult> {
    let model = self.model(returns)?;
    let (mu, cov) = model.annualized();

    let weights = optimize_max_sharpe(&mu, &cov, &self.search_config(), deadline)?;
    let (expected_return, volatility, sharpe_ratio) =
      evaluate(&weights, &mu, &cov, self.config.risk_free);
    debug!(
      assets = returns.assets(),
      observations = returns.observations(),
      method = %self.config.optimizer,
      sharpe_ratio,
      "portfolio optimized"
    );

    Ok(OptimizationResult {
      tickers: returns.tickers().to_vec(),
      weights,
      expected_return,
      volatility,
      sharpe_ratio,
      method: self.config.optimizer,
    })
  }

  /// Random portfolios in annualized mean-volatility space.
  ///
  /// `samples` overrides the configured count.
  pub fn efficient_frontier(
    &self,
    returns: &AlignedReturns,
    samples: Option<usize>,
    deadline: &Deadline,
  ) -> Result<EfficientFrontier> {
    let model = self.model(returns)?;
    let (mu, cov) = model.annualized();
    let config = FrontierConfig {
      samples: samples.unwrap_or(self.config.frontier.samples),
      ..self.config.frontier
    };
    sample_frontier(&mu, &cov, self.config.risk_free, &config, deadline)
  }

  /// Annualized performance of the portfolio holding `weights`.
  ///
  /// `benchmark`, when given, must be aligned with `returns`.
  pub fn performance(
    &self,
    returns: &AlignedReturns,
    weights: &[f64],
    benchmark: Option<&[f64]>,
  ) -> Result<PerformanceReport> {
    if weights.len() != returns.assets() {
      return Err(RiskError::InvalidWeights(format!(
        "{} weights for {} assets",
        weights.len(),
        returns.assets()
      )));
    }
    check_weights(weights, self.config.weight_tolerance)?;
    let portfolio = returns.weighted(weights)?;
    performance_report(&portfolio, self.config.risk_free, self.config.frequency, benchmark)
  }
}
