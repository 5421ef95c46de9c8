//! # portfolio-risk
//!
//! $$
//! \text{VaR}_c,\ \text{ES}_c,\ \arg\max_{\mathbf w}\ \frac{\mathbf w^\top\mu-r_f}{\sqrt{\mathbf w^\top\Sigma\mathbf w}}
//! $$
//!
//! Tail risk and mean-variance analytics over historical return series.
//!
//! - [`stats`]: sample moments, correlation and the standard normal.
//! - [`quant::series`]: dated return series, look-back windows and alignment.
//! - [`quant::risk`]: historical, parametric and Monte Carlo VaR with expected shortfall,
//!   plus Sharpe, Sortino, drawdown and beta.
//! - [`quant::portfolio`]: maximum-Sharpe search, efficient-frontier sampling, rebalancing.
//! - [`api`]: JSON request/response contracts and the handlers serving them.
//!
//! Every computation is a pure function of its inputs. Randomized routines take an explicit
//! seed and produce the same output for it regardless of the rayon thread count.

pub mod api;
pub mod config;
pub mod error;
pub mod quant;
pub mod stats;

pub use config::EngineConfig;
pub use error::Result;
pub use error::RiskError;
pub use quant::risk::dual::DualAssetVaR;
pub use quant::risk::dual::VaRResult;
pub use quant::risk::var::VaRInput;
pub use quant::risk::var::VaRMethod;
pub use quant::series::ReturnSeries;
