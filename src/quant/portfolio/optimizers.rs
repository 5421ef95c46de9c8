//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{x}\in\mathbb R^N}\ -\frac{\mu^\top\mathbf w(\mathbf x)-r_f}{\sqrt{\mathbf w(\mathbf x)^\top\Sigma\,\mathbf w(\mathbf x)}},\qquad
//! w_i(\mathbf x)=\frac{e^{x_i}}{\sum_j e^{x_j}}
//! $$
//!
//! Long-only maximum-Sharpe search. The softmax keeps every Nelder-Mead vertex on the simplex,
//! so the solver runs unconstrained.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::debug;
use tracing::warn;

use super::frontier::check_model;
use super::frontier::sample_frontier;
use super::frontier::FrontierConfig;
use super::types::evaluate;
use super::types::normalize;
use super::types::OptimizerMethod;
use crate::error::Result;
use crate::quant::budget::Deadline;

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Settings shared by both search strategies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
  pub method: OptimizerMethod,
  /// Annual risk-free rate.
  pub risk_free: f64,
  /// Nelder-Mead iteration cap.
  pub max_iters: u64,
  /// Draws used by [`OptimizerMethod::RandomSearch`].
  pub sampling: FrontierConfig,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      method: OptimizerMethod::NelderMead,
      risk_free: 0.0,
      max_iters: 5_000,
      sampling: FrontierConfig::new(10_000, 42, 1_024),
    }
  }
}

struct NegativeSharpe {
  mu: DVector<f64>,
  cov: DMatrix<f64>,
  risk_free: f64,
}

impl CostFunction for NegativeSharpe {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = softmax(x);
    let (_, _, sharpe) = evaluate(&w, &self.mu, &self.cov, self.risk_free);
    Ok(-sharpe)
  }
}

/// Max-Sharpe weights by Nelder-Mead over softmax logits, starting from equal weights.
///
/// Falls back to equal weights if the solver cannot be built or run.
pub fn max_sharpe_nelder_mead(
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
  risk_free: f64,
  max_iters: u64,
) -> Result<Vec<f64>> {
  let n = check_model(mu, cov)?;
  let equal = vec![1.0 / n as f64; n];

  let cost = NegativeSharpe {
    mu: mu.clone(),
    cov: cov.clone(),
    risk_free,
  };

  let x0 = vec![0.0; n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] = 1.0;
    simplex.push(point);
  }

  let w = match NelderMead::new(simplex).with_sd_tolerance(1e-12) {
    Ok(solver) => {
      match Executor::new(cost, solver)
        .configure(|state| state.max_iters(max_iters))
        .run()
      {
        Ok(res) => {
          debug!(iters = res.state.iter, cost = res.state.best_cost, "nelder-mead finished");
          res.state.best_param.map(|x| softmax(&x)).unwrap_or(equal)
        }
        Err(e) => {
          warn!(error = %e, "nelder-mead failed, using equal weights");
          equal
        }
      }
    }
    Err(e) => {
      warn!(error = %e, "nelder-mead setup failed, using equal weights");
      equal
    }
  };

  Ok(normalize(w))
}

/// Max-Sharpe weights as the best of `sampling.samples` random simplex draws.
pub fn max_sharpe_random_search(
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
  risk_free: f64,
  sampling: &FrontierConfig,
  deadline: &Deadline,
) -> Result<Vec<f64>> {
  let frontier = sample_frontier(mu, cov, risk_free, sampling, deadline)?;
  let n = mu.len();
  let best = frontier
    .max_sharpe()
    .map(|p| p.weights.clone())
    .unwrap_or_else(|| vec![1.0 / n as f64; n]);
  Ok(normalize(best))
}

/// Dispatch on `config.method`. Weights are non-negative and sum to one.
pub fn optimize_max_sharpe(
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
  config: &SearchConfig,
  deadline: &Deadline,
) -> Result<Vec<f64>> {
  deadline.check()?;
  let weights = match config.method {
    OptimizerMethod::NelderMead => {
      max_sharpe_nelder_mead(mu, cov, config.risk_free, config.max_iters)?
    }
    OptimizerMethod::RandomSearch => {
      max_sharpe_random_search(mu, cov, config.risk_free, &config.sampling, deadline)?
    }
  };
  deadline.check()?;
  Ok(weights)
}
