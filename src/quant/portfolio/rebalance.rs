//! # Rebalancing
//!
//! $$
//! \Delta V_i = V\,(w_i^{\text{target}}-w_i^{\text{current}}),\qquad \Delta q_i=\frac{\Delta V_i}{P_i}
//! $$
//!
//! Trades that move current holdings to a target allocation at given prices.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::Result;
use crate::error::RiskError;

/// Trades smaller than this many shares are dropped.
pub const MIN_TRADE_SHARES: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
  Buy,
  Sell,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RebalanceTrade {
  pub ticker: String,
  pub action: TradeAction,
  /// Always positive; the direction is in `action`.
  pub shares: f64,
  /// Signed value change, positive for buys.
  pub value: f64,
  pub current_weight: f64,
  pub target_weight: f64,
}

/// Trades per ticker, in ticker order.
///
/// Tickers held but missing from `target` are sold down to zero. Every traded ticker needs a
/// positive price.
pub fn rebalance_trades(
  current: &BTreeMap<String, f64>,
  target: &BTreeMap<String, f64>,
  total_value: f64,
  prices: &BTreeMap<String, f64>,
) -> Result<Vec<RebalanceTrade>> {
  if !total_value.is_finite() || total_value <= 0.0 {
    return Err(RiskError::InvalidInput(format!(
      "total value must be positive, got {total_value}"
    )));
  }

  let tickers: BTreeSet<&String> = current.keys().chain(target.keys()).collect();
  let mut trades = Vec::new();

  for ticker in tickers {
    let current_weight = current.get(ticker).copied().unwrap_or(0.0);
    let target_weight = target.get(ticker).copied().unwrap_or(0.0);
    let value = total_value * (target_weight - current_weight);
    if value == 0.0 {
      continue;
    }

    let price = match prices.get(ticker) {
      Some(&p) if p.is_finite() && p > 0.0 => p,
      Some(&p) => {
        return Err(RiskError::InvalidInput(format!(
          "price for {ticker} must be positive, got {p}"
        )))
      }
      None => return Err(RiskError::DataSource(format!("no price for {ticker}"))),
    };

    let shares = value / price;
    if shares.abs() > MIN_TRADE_SHARES {
      trades.push(RebalanceTrade {
        ticker: ticker.clone(),
        action: if shares > 0.0 { TradeAction::Buy } else { TradeAction::Sell },
        shares: shares.abs(),
        value,
        current_weight,
        target_weight,
      });
    }
  }

  Ok(trades)
}
