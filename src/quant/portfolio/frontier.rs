//! # Efficient Frontier Sampler
//!
//! $$
//! u_i\sim\mathcal U[0,1),\qquad w_i=\frac{u_i}{\sum_j u_j},\qquad
//! (\mu_p,\sigma_p,S)=\left(\mathbf w^\top\mu,\ \sqrt{\mathbf w^\top\Sigma\mathbf w},\ \frac{\mu_p-r_f}{\sigma_p}\right)
//! $$
//!
//! Random long-only portfolios scattered in mean-volatility space. The cloud approximates the
//! frontier from below; it is not the exact Pareto boundary.

use impl_new_derive::ImplNew;
use nalgebra::DMatrix;
use nalgebra::DVector;
use ordered_float::OrderedFloat;
use rand::Rng;
use serde::Serialize;

use super::types::evaluate;
use crate::error::Result;
use crate::error::RiskError;
use crate::quant::budget::Deadline;
use crate::quant::sampling::sample_chunks;

/// Sample count, seed and parallel chunking of the sampler.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontierConfig {
  pub samples: usize,
  pub seed: u64,
  pub chunk_size: usize,
}

impl Default for FrontierConfig {
  fn default() -> Self {
    Self {
      samples: 1_000,
      seed: 42,
      chunk_size: 256,
    }
  }
}

/// One sampled portfolio.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrontierPoint {
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe: f64,
  pub weights: Vec<f64>,
}

/// Sampled portfolios in draw order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EfficientFrontier {
  pub points: Vec<FrontierPoint>,
}

impl EfficientFrontier {
  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Sample with the highest Sharpe ratio.
  pub fn max_sharpe(&self) -> Option<&FrontierPoint> {
    self.points.iter().max_by_key(|p| OrderedFloat(p.sharpe))
  }

  /// Sample with the lowest volatility.
  pub fn min_volatility(&self) -> Option<&FrontierPoint> {
    self.points.iter().min_by_key(|p| OrderedFloat(p.volatility))
  }
}

/// `n` uniform draws normalized to sum to one.
pub fn random_weights<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<f64> {
  let raw: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
  let sum: f64 = raw.iter().sum();
  if sum < 1e-15 {
    vec![1.0 / n as f64; n]
  } else {
    raw.iter().map(|u| u / sum).collect()
  }
}

pub(crate) fn check_model(mu: &DVector<f64>, cov: &DMatrix<f64>) -> Result<usize> {
  let n = mu.len();
  if n < 2 {
    return Err(RiskError::InsufficientAssets(n));
  }
  if cov.nrows() != n || cov.ncols() != n {
    return Err(RiskError::InvalidInput(format!(
      "covariance is {}x{} for {n} assets",
      cov.nrows(),
      cov.ncols()
    )));
  }
  Ok(n)
}

/// Draw `config.samples` random portfolios across the rayon pool.
pub fn sample_frontier(
  mu: &DVector<f64>,
  cov: &DMatrix<f64>,
  risk_free: f64,
  config: &FrontierConfig,
  deadline: &Deadline,
) -> Result<EfficientFrontier> {
  let n = check_model(mu, cov)?;
  if config.samples == 0 {
    return Err(RiskError::InvalidInput(
      "frontier needs at least one portfolio".to_string(),
    ));
  }

  let points = sample_chunks(config.samples, config.chunk_size, config.seed, deadline, |rng| {
    let weights = random_weights(rng, n);
    let (expected_return, volatility, sharpe) = evaluate(&weights, mu, cov, risk_free);
    FrontierPoint {
      expected_return,
      volatility,
      sharpe,
      weights,
    }
  })?;

  Ok(EfficientFrontier { points })
}
