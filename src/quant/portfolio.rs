//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Maximum-Sharpe optimization, efficient-frontier sampling and rebalancing.

pub mod engine;
pub mod frontier;
pub mod optimizers;
pub mod rebalance;
pub mod types;

pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use frontier::sample_frontier;
pub use frontier::EfficientFrontier;
pub use frontier::FrontierConfig;
pub use frontier::FrontierPoint;
pub use optimizers::optimize_max_sharpe;
pub use optimizers::SearchConfig;
pub use rebalance::rebalance_trades;
pub use rebalance::RebalanceTrade;
pub use rebalance::TradeAction;
pub use types::AssetWeight;
pub use types::OptimizationResult;
pub use types::OptimizerMethod;
pub use types::PortfolioSpec;
