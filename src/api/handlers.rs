//! # Request Handlers
//!
//! $$
//! \text{parse}\ \to\ \text{validate}\ \to\ \text{load}\ \to\ \text{align}\ \to\ \text{compute}\ \to\ \text{envelope}
//! $$
//!
//! One method per endpoint. Request terms are validated before any series is loaded; the
//! `*_response` variants wrap the outcome in the endpoint's envelope.

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::debug;
use tracing::warn;

use super::source::ReturnSource;
use super::types::DualStockVaRData;
use super::types::DualStockVaRRequest;
use super::types::FrontierData;
use super::types::FrontierPortfolio;
use super::types::FrontierRequest;
use super::types::OptimizeData;
use super::types::OptimizeRequest;
use super::types::PerformanceData;
use super::types::PerformanceRequest;
use super::types::RebalanceData;
use super::types::RebalanceRequest;
use super::types::StatusEnvelope;
use super::types::SuccessEnvelope;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::error::RiskError;
use crate::quant::budget::Deadline;
use crate::quant::portfolio::rebalance_trades;
use crate::quant::portfolio::types::check_weights;
use crate::quant::portfolio::types::AssetWeight;
use crate::quant::portfolio::types::PortfolioSpec;
use crate::quant::portfolio::PortfolioEngine;
use crate::quant::risk::metrics::beta;
use crate::quant::risk::var::SimulationConfig;
use crate::quant::risk::var::VaRInput;
use crate::quant::series::align;
use crate::quant::series::AlignedReturns;
use crate::quant::series::Period;
use crate::quant::series::ReturnSeries;

/// Stateless request processor over a [`ReturnSource`].
#[derive(Clone, Debug)]
pub struct RiskService<S> {
  source: S,
  config: EngineConfig,
}

fn logged<T>(endpoint: &str, res: Result<T>) -> Result<T> {
  if let Err(e) = &res {
    if e.is_validation() {
      debug!(endpoint, kind = e.kind(), error = %e, "request rejected");
    } else {
      warn!(endpoint, kind = e.kind(), error = %e, "request failed");
    }
  }
  res
}

fn check_tickers(tickers: &[String]) -> Result<()> {
  if tickers.len() < 2 {
    return Err(RiskError::InsufficientAssets(tickers.len()));
  }
  let mut seen = BTreeSet::new();
  for t in tickers {
    if t.trim().is_empty() {
      return Err(RiskError::InvalidInput("empty ticker".to_string()));
    }
    if !seen.insert(t.to_uppercase()) {
      return Err(RiskError::InvalidInput(format!("duplicate ticker {t}")));
    }
  }
  Ok(())
}

fn check_rate(rate: f64) -> Result<f64> {
  if rate.is_finite() {
    Ok(rate)
  } else {
    Err(RiskError::InvalidInput(format!("risk-free rate must be finite, got {rate}")))
  }
}

impl<S: ReturnSource> RiskService<S> {
  pub fn new(source: S, config: EngineConfig) -> Self {
    Self { source, config }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  fn load_aligned(
    &self,
    tickers: &[String],
    period: Period,
    deadline: &Deadline,
  ) -> Result<AlignedReturns> {
    let series = tickers
      .iter()
      .map(|t| self.source.load(t, period))
      .collect::<Result<Vec<ReturnSeries>>>()?;
    deadline.check()?;
    let refs: Vec<&ReturnSeries> = series.iter().collect();
    align(&refs)
  }

  /// Beta of the weighted portfolio against `benchmark`, or `None` with a warning.
  fn portfolio_beta(
    &self,
    returns: &AlignedReturns,
    weights: &[f64],
    benchmark: &str,
    period: Period,
  ) -> Option<f64> {
    let estimate = || -> Result<f64> {
      let portfolio = returns.weighted_series("portfolio", weights)?;
      let bench = self.source.load(benchmark, period)?;
      let pair = align(&[&portfolio, &bench])?;
      beta(pair.column(0), pair.column(1))
    };
    match estimate() {
      Ok(b) => Some(b),
      Err(e) => {
        warn!(benchmark, error = %e, "benchmark unavailable, beta omitted");
        None
      }
    }
  }

  /// `POST /risk/dual-stock-var`
  pub fn dual_stock_var(&self, req: &DualStockVaRRequest) -> Result<DualStockVaRData> {
    let start = Instant::now();
    let calc = self.config.dual_var();
    let horizon = req.horizon.unwrap_or(self.config.horizon);
    let trials = req.num_simulations.unwrap_or(self.config.monte_carlo_trials);

    let spec = PortfolioSpec::new(
      vec![
        AssetWeight::new(req.ticker1.as_str(), req.weight1),
        AssetWeight::new(req.ticker2.as_str(), req.weight2),
      ],
      req.portfolio_value,
      req.confidence_level,
    )
    .with_horizon(horizon);
    let weights = calc.validate_spec(&spec, trials)?;
    let period: Period = req.period.parse()?;
    let tickers = vec![req.ticker1.clone(), req.ticker2.clone()];
    check_tickers(&tickers)?;

    let deadline = self.config.deadline();
    let returns = self.load_aligned(&tickers, period, &deadline)?;

    let seed = req.seed.unwrap_or_else(|| self.config.resolved_seed());
    let simulation = SimulationConfig {
      trials,
      ..self.config.simulation(seed)
    };
    let input = VaRInput::new(returns.column(0), returns.column(1), weights)
      .with_horizon(horizon)
      .with_simulation(simulation)
      .with_deadline(deadline);

    let mut result = calc.compute(&input, spec.portfolio_value, spec.confidence_level)?;
    if let Some(benchmark) = req.benchmark.as_deref().or(self.config.benchmark.as_deref()) {
      result = result.with_beta(self.portfolio_beta(&returns, &weights, benchmark, period));
    }
    deadline.check()?;

    debug!(
      ticker1 = %req.ticker1,
      ticker2 = %req.ticker2,
      observations = result.observations,
      elapsed_ms = start.elapsed().as_millis() as u64,
      "dual-stock VaR handled"
    );

    Ok(DualStockVaRData {
      tickers: [req.ticker1.clone(), req.ticker2.clone()],
      weights,
      result,
    })
  }

  pub fn dual_stock_var_response(
    &self,
    req: &DualStockVaRRequest,
  ) -> SuccessEnvelope<DualStockVaRData> {
    logged("dual_stock_var", self.dual_stock_var(req)).into()
  }

  fn engine(&self, risk_free: Option<f64>, seed: Option<u64>) -> Result<PortfolioEngine> {
    let seed = seed.unwrap_or_else(|| self.config.resolved_seed());
    let mut config = self.config.portfolio_engine(seed);
    if let Some(rf) = risk_free {
      config.risk_free = check_rate(rf)?;
    }
    Ok(PortfolioEngine::new(config))
  }

  /// `POST /portfolio/optimize`
  pub fn optimize(&self, req: &OptimizeRequest) -> Result<OptimizeData> {
    let start = Instant::now();
    check_tickers(&req.tickers)?;
    let period: Period = req.period.parse()?;
    let mut engine = self.engine(req.risk_free_rate, req.seed)?;
    if let Some(method) = req.optimizer {
      let mut config = engine.config().clone();
      config.optimizer = method;
      engine = PortfolioEngine::new(config);
    }

    let deadline = self.config.deadline();
    let returns = self.load_aligned(&req.tickers, period, &deadline)?;
    let result = engine.optimize(&returns, &deadline)?;

    debug!(
      assets = req.tickers.len(),
      elapsed_ms = start.elapsed().as_millis() as u64,
      "optimize handled"
    );
    Ok(result.into())
  }

  pub fn optimize_response(&self, req: &OptimizeRequest) -> StatusEnvelope<OptimizeData> {
    logged("optimize", self.optimize(req)).into()
  }

  /// `POST /portfolio/efficient-frontier`
  pub fn efficient_frontier(&self, req: &FrontierRequest) -> Result<FrontierData> {
    let start = Instant::now();
    check_tickers(&req.tickers)?;
    if req.num_portfolios == Some(0) {
      return Err(RiskError::InvalidInput("num_portfolios must be positive".to_string()));
    }
    let period: Period = req.period.parse()?;
    let engine = self.engine(req.risk_free_rate, req.seed)?;

    let deadline = self.config.deadline();
    let returns = self.load_aligned(&req.tickers, period, &deadline)?;
    let frontier = engine.efficient_frontier(&returns, req.num_portfolios, &deadline)?;

    let tickers = returns.tickers();
    let portfolios: Vec<FrontierPortfolio> = frontier
      .points
      .iter()
      .map(|p| FrontierPortfolio::from_point(tickers, p))
      .collect();

    debug!(
      samples = portfolios.len(),
      elapsed_ms = start.elapsed().as_millis() as u64,
      "efficient frontier handled"
    );
    Ok(FrontierData {
      count: portfolios.len(),
      max_sharpe: frontier.max_sharpe().map(|p| FrontierPortfolio::from_point(tickers, p)),
      min_volatility: frontier
        .min_volatility()
        .map(|p| FrontierPortfolio::from_point(tickers, p)),
      portfolios,
    })
  }

  pub fn efficient_frontier_response(&self, req: &FrontierRequest) -> StatusEnvelope<FrontierData> {
    logged("efficient_frontier", self.efficient_frontier(req)).into()
  }

  /// `POST /portfolio/performance`
  pub fn performance(&self, req: &PerformanceRequest) -> Result<PerformanceData> {
    if req.tickers.is_empty() {
      return Err(RiskError::InsufficientAssets(0));
    }
    if req.weights.len() != req.tickers.len() {
      return Err(RiskError::InvalidWeights(format!(
        "{} weights for {} tickers",
        req.weights.len(),
        req.tickers.len()
      )));
    }
    check_weights(&req.weights, self.config.weight_tolerance)?;
    let period: Period = req.period.parse()?;
    let engine = self.engine(req.risk_free_rate, Some(0))?;

    let deadline = self.config.deadline();
    let returns = self.load_aligned(&req.tickers, period, &deadline)?;

    let mut report = engine.performance(&returns, &req.weights, None)?;
    if let Some(benchmark) = req.benchmark.as_deref().or(self.config.benchmark.as_deref()) {
      report.beta = self.portfolio_beta(&returns, &req.weights, benchmark, period);
    }
    deadline.check()?;
    Ok(report.into())
  }

  pub fn performance_response(&self, req: &PerformanceRequest) -> StatusEnvelope<PerformanceData> {
    logged("performance", self.performance(req)).into()
  }

  /// Trades from the current to the target allocation.
  pub fn rebalance(&self, req: &RebalanceRequest) -> Result<RebalanceData> {
    check_weights(&req.target.values().copied().collect::<Vec<_>>(), self.config.weight_tolerance)?;
    let trades = rebalance_trades(&req.current, &req.target, req.total_value, &req.prices)?;
    Ok(RebalanceData {
      count: trades.len(),
      trades,
    })
  }

  pub fn rebalance_response(&self, req: &RebalanceRequest) -> StatusEnvelope<RebalanceData> {
    logged("rebalance", self.rebalance(req)).into()
  }
}
