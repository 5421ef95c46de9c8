//! # Wire Types
//!
//! $$
//! \text{request}\xrightarrow{\text{serde}}\text{engine}\xrightarrow{\text{serde}}\text{envelope}
//! $$
//!
//! JSON request bodies, response payloads and the two response envelopes. Fractions stay
//! fractions on the wire; non-finite ratios serialize as `null`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::RiskError;
use crate::quant::portfolio::FrontierPoint;
use crate::quant::portfolio::OptimizationResult;
use crate::quant::portfolio::OptimizerMethod;
use crate::quant::portfolio::RebalanceTrade;
use crate::quant::risk::dual::VaRResult;
use crate::quant::risk::metrics::PerformanceReport;

fn default_portfolio_value() -> f64 {
  100_000.0
}

fn default_confidence() -> f64 {
  0.95
}

fn default_period() -> String {
  "1y".to_string()
}

fn finite(x: f64) -> Option<f64> {
  x.is_finite().then_some(x)
}

/// `POST /risk/dual-stock-var`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DualStockVaRRequest {
  pub ticker1: String,
  pub ticker2: String,
  pub weight1: f64,
  pub weight2: f64,
  #[serde(default = "default_portfolio_value")]
  pub portfolio_value: f64,
  #[serde(default = "default_confidence")]
  pub confidence_level: f64,
  #[serde(default = "default_period")]
  pub period: String,
  /// Horizon in trading periods; the configured default when absent.
  #[serde(default)]
  pub horizon: Option<u32>,
  #[serde(default)]
  pub num_simulations: Option<usize>,
  /// Benchmark ticker for beta.
  #[serde(default)]
  pub benchmark: Option<String>,
  #[serde(default)]
  pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DualStockVaRData {
  pub tickers: [String; 2],
  pub weights: [f64; 2],
  #[serde(flatten)]
  pub result: VaRResult,
}

/// `POST /portfolio/optimize`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
  pub tickers: Vec<String>,
  #[serde(default = "default_period")]
  pub period: String,
  #[serde(default)]
  pub risk_free_rate: Option<f64>,
  #[serde(default)]
  pub optimizer: Option<OptimizerMethod>,
  #[serde(default)]
  pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizeData {
  pub allocation: BTreeMap<String, f64>,
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe_ratio: f64,
  pub tickers: Vec<String>,
  pub method: OptimizerMethod,
}

impl From<OptimizationResult> for OptimizeData {
  fn from(r: OptimizationResult) -> Self {
    Self {
      allocation: r.allocation(),
      expected_return: r.expected_return,
      volatility: r.volatility,
      sharpe_ratio: r.sharpe_ratio,
      tickers: r.tickers,
      method: r.method,
    }
  }
}

/// `POST /portfolio/efficient-frontier`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrontierRequest {
  pub tickers: Vec<String>,
  #[serde(default = "default_period")]
  pub period: String,
  #[serde(default)]
  pub num_portfolios: Option<usize>,
  #[serde(default)]
  pub risk_free_rate: Option<f64>,
  #[serde(default)]
  pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrontierPortfolio {
  #[serde(rename = "return")]
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe: f64,
  pub weights: BTreeMap<String, f64>,
}

impl FrontierPortfolio {
  pub fn from_point(tickers: &[String], p: &FrontierPoint) -> Self {
    Self {
      expected_return: p.expected_return,
      volatility: p.volatility,
      sharpe: p.sharpe,
      weights: tickers.iter().cloned().zip(p.weights.iter().copied()).collect(),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrontierData {
  pub portfolios: Vec<FrontierPortfolio>,
  pub count: usize,
  pub max_sharpe: Option<FrontierPortfolio>,
  pub min_volatility: Option<FrontierPortfolio>,
}

/// `POST /portfolio/performance`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRequest {
  pub tickers: Vec<String>,
  pub weights: Vec<f64>,
  #[serde(default = "default_period")]
  pub period: String,
  #[serde(default)]
  pub risk_free_rate: Option<f64>,
  #[serde(default)]
  pub benchmark: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PerformanceData {
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe_ratio: Option<f64>,
  pub sortino_ratio: Option<f64>,
  pub max_drawdown: f64,
  pub beta: Option<f64>,
  pub observations: usize,
}

impl From<PerformanceReport> for PerformanceData {
  fn from(r: PerformanceReport) -> Self {
    Self {
      expected_return: r.expected_return,
      volatility: r.volatility,
      sharpe_ratio: finite(r.sharpe_ratio),
      sortino_ratio: finite(r.sortino_ratio),
      max_drawdown: r.max_drawdown,
      beta: r.beta,
      observations: r.observations,
    }
  }
}

/// Trades from current to target weights at the given prices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RebalanceRequest {
  pub current: BTreeMap<String, f64>,
  pub target: BTreeMap<String, f64>,
  pub total_value: f64,
  pub prices: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RebalanceData {
  pub trades: Vec<RebalanceTrade>,
  pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
  pub kind: String,
  pub message: String,
}

impl From<&RiskError> for ErrorBody {
  fn from(e: &RiskError) -> Self {
    Self {
      kind: e.kind().to_string(),
      message: e.to_string(),
    }
  }
}

/// `{"success": bool, "data" | "error": ...}`, used by the risk endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuccessEnvelope<T> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<ErrorBody>,
}

impl<T> From<crate::error::Result<T>> for SuccessEnvelope<T> {
  fn from(res: crate::error::Result<T>) -> Self {
    match res {
      Ok(data) => Self {
        success: true,
        data: Some(data),
        error: None,
      },
      Err(e) => Self {
        success: false,
        data: None,
        error: Some(ErrorBody::from(&e)),
      },
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  Success,
  Error,
}

/// `{"status": "success" | "error", "data" | "error": ...}`, used by the portfolio endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusEnvelope<T> {
  pub status: Status,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<ErrorBody>,
}

impl<T> From<crate::error::Result<T>> for StatusEnvelope<T> {
  fn from(res: crate::error::Result<T>) -> Self {
    match res {
      Ok(data) => Self {
        status: Status::Success,
        data: Some(data),
        error: None,
      },
      Err(e) => Self {
        status: Status::Error,
        data: None,
        error: Some(ErrorBody::from(&e)),
      },
    }
  }
}
