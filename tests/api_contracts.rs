use std::fs;

use approx::assert_abs_diff_eq;
use approx::assert_relative_eq;
use chrono::Days;
use chrono::NaiveDate;
use portfolio_risk::api::types::DualStockVaRRequest;
use portfolio_risk::api::types::FrontierRequest;
use portfolio_risk::api::types::OptimizeRequest;
use portfolio_risk::api::types::PerformanceRequest;
use portfolio_risk::api::types::RebalanceRequest;
use portfolio_risk::api::CsvDirectorySource;
use portfolio_risk::api::InMemorySource;
use portfolio_risk::api::RiskService;
use portfolio_risk::stats::descriptive::mean;
use portfolio_risk::stats::descriptive::std_dev;
use portfolio_risk::EngineConfig;
use portfolio_risk::ReturnSeries;
use portfolio_risk::VaRInput;
use portfolio_risk::VaRMethod;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use serde_json::json;
use serde_json::Value;

fn dates(n: usize) -> Vec<NaiveDate> {
  let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
  (0..n).map(|i| start + Days::new(i as u64)).collect()
}

fn series(ticker: &str, n: usize, mu: f64, sigma: f64, seed: u64) -> ReturnSeries {
  let mut rng = StdRng::seed_from_u64(seed);
  let d = Normal::new(mu, sigma).unwrap();
  ReturnSeries::new(ticker, dates(n), (0..n).map(|_| d.sample(&mut rng)).collect()).unwrap()
}

fn service() -> RiskService<InMemorySource> {
  let source = InMemorySource::new()
    .with_series(series("AAPL", 300, 0.0008, 0.015, 1))
    .with_series(series("MSFT", 300, 0.0006, 0.012, 2))
    .with_series(series("XOM", 300, 0.0003, 0.018, 3))
    .with_series(series("SPY", 300, 0.0004, 0.009, 4));
  let config = EngineConfig {
    seed: Some(11),
    ..EngineConfig::default()
  };
  RiskService::new(source, config)
}

fn to_json<T: serde::Serialize>(v: &T) -> Value {
  serde_json::to_value(v).unwrap()
}

#[test]
fn dual_stock_var_reports_every_contract_field() {
  let req: DualStockVaRRequest = serde_json::from_value(json!({
    "ticker1": "AAPL",
    "ticker2": "MSFT",
    "weight1": 0.6,
    "weight2": 0.4,
    "period": "max",
    "benchmark": "SPY"
  }))
  .unwrap();

  let v = to_json(&service().dual_stock_var_response(&req));
  assert_eq!(v["success"], json!(true));

  let data = &v["data"];
  for key in [
    "portfolio_value",
    "portfolio_return",
    "portfolio_volatility",
    "correlation",
    "var_historical",
    "var_parametric",
    "var_monte_carlo",
    "expected_shortfall",
    "beta",
  ] {
    assert!(data.get(key).is_some(), "missing {key}");
  }
  assert_eq!(data["portfolio_value"], json!(100_000.0));
  assert!(data["var_historical"].as_f64().unwrap() >= 0.0);
  assert!(data["var_monte_carlo"].as_f64().unwrap() >= 0.0);
  assert!(data["beta"].is_number());
  assert_eq!(data["monte_carlo"]["trials"], json!(10_000));
}

#[test]
fn weights_summing_past_tolerance_fail_before_loading() {
  let req: DualStockVaRRequest = serde_json::from_value(json!({
    "ticker1": "NOT_LOADED",
    "ticker2": "ALSO_MISSING",
    "weight1": 0.5,
    "weight2": 0.6
  }))
  .unwrap();

  let v = to_json(&service().dual_stock_var_response(&req));
  assert_eq!(v["success"], json!(false));
  assert_eq!(v["error"]["kind"], json!("InvalidWeightsError"));
}

#[test]
fn weight_above_one_is_rejected_within_tolerance() {
  let req: DualStockVaRRequest = serde_json::from_value(json!({
    "ticker1": "AAPL",
    "ticker2": "MSFT",
    "weight1": 1.005,
    "weight2": 0.0
  }))
  .unwrap();

  let v = to_json(&service().dual_stock_var_response(&req));
  assert_eq!(v["success"], json!(false));
  assert_eq!(v["error"]["kind"], json!("InvalidWeightsError"));
}

#[test]
fn bad_confidence_is_reported() {
  let req: DualStockVaRRequest = serde_json::from_value(json!({
    "ticker1": "AAPL",
    "ticker2": "MSFT",
    "weight1": 0.5,
    "weight2": 0.5,
    "confidence_level": 1.2
  }))
  .unwrap();
  let v = to_json(&service().dual_stock_var_response(&req));
  assert_eq!(v["error"]["kind"], json!("InvalidConfidenceError"));
}

#[test]
fn five_day_scenario() {
  let a = [0.01, -0.02, 0.015, -0.01, 0.02];
  let b = [0.005, -0.01, 0.008, -0.005, 0.012];

  let input = VaRInput::new(&a, &b, [0.5, 0.5]);
  let parametric = VaRMethod::Parametric.compute(&input, 0.95).unwrap();
  let blended = input.portfolio_returns();
  let closed_form = -(mean(&blended).unwrap() + std_dev(&blended).unwrap() * -1.645);
  assert_relative_eq!(parametric.var, closed_form, max_relative = 1e-3);
  assert_relative_eq!(parametric.var * 100_000.0, closed_form * 100_000.0, max_relative = 1e-3);

  // five observations cannot resolve the 5% tail historically
  let source = InMemorySource::new()
    .with_series(ReturnSeries::new("A", dates(5), a.to_vec()).unwrap())
    .with_series(ReturnSeries::new("B", dates(5), b.to_vec()).unwrap());
  let service = RiskService::new(source, EngineConfig::default());
  let req: DualStockVaRRequest = serde_json::from_value(json!({
    "ticker1": "A", "ticker2": "B", "weight1": 0.5, "weight2": 0.5, "period": "max"
  }))
  .unwrap();
  let v = to_json(&service.dual_stock_var_response(&req));
  assert_eq!(v["error"]["kind"], json!("InsufficientDataError"));
}

#[test]
fn unknown_ticker_is_a_data_source_error() {
  let req: DualStockVaRRequest = serde_json::from_value(json!({
    "ticker1": "AAPL", "ticker2": "ZZZZ", "weight1": 0.5, "weight2": 0.5
  }))
  .unwrap();
  let v = to_json(&service().dual_stock_var_response(&req));
  assert_eq!(v["error"]["kind"], json!("DataSourceError"));
}

#[test]
fn oversized_period_is_an_input_error() {
  for period in ["400000000y", "700000000wk"] {
    let req: DualStockVaRRequest = serde_json::from_value(json!({
      "ticker1": "AAPL", "ticker2": "MSFT", "weight1": 0.5, "weight2": 0.5, "period": period
    }))
    .unwrap();
    let v = to_json(&service().dual_stock_var_response(&req));
    assert_eq!(v["success"], json!(false), "{period}");
    assert_eq!(v["error"]["kind"], json!("InvalidInputError"), "{period}");
  }
}

#[test]
fn optimize_returns_allocation_summing_to_one() {
  let req: OptimizeRequest = serde_json::from_value(json!({
    "tickers": ["AAPL", "MSFT", "XOM"],
    "period": "max"
  }))
  .unwrap();

  let v = to_json(&service().optimize_response(&req));
  assert_eq!(v["status"], json!("success"));
  let allocation = v["data"]["allocation"].as_object().unwrap();
  assert_eq!(allocation.len(), 3);
  let total: f64 = allocation.values().map(|w| w.as_f64().unwrap()).sum();
  assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
  assert!(allocation.values().all(|w| w.as_f64().unwrap() >= 0.0));
  for key in ["expected_return", "volatility", "sharpe_ratio"] {
    assert!(v["data"][key].is_number());
  }
}

#[test]
fn optimize_needs_two_assets() {
  let req: OptimizeRequest = serde_json::from_value(json!({ "tickers": ["AAPL"] })).unwrap();
  let v = to_json(&service().optimize_response(&req));
  assert_eq!(v["status"], json!("error"));
  assert_eq!(v["error"]["kind"], json!("InsufficientAssetsError"));
}

#[test]
fn frontier_returns_exactly_the_requested_samples() {
  let req: FrontierRequest = serde_json::from_value(json!({
    "tickers": ["AAPL", "MSFT", "XOM"],
    "period": "max",
    "num_portfolios": 1000
  }))
  .unwrap();

  let data = service().efficient_frontier(&req).unwrap();
  assert_eq!(data.portfolios.len(), 1000);
  assert_eq!(data.count, 1000);
  for p in &data.portfolios {
    assert_abs_diff_eq!(p.weights.values().sum::<f64>(), 1.0, epsilon = 1e-9);
  }
  let best = data.max_sharpe.as_ref().unwrap();
  assert!(data.portfolios.iter().all(|p| p.sharpe <= best.sharpe));

  let v = to_json(&service().efficient_frontier_response(&req));
  assert!(v["data"]["portfolios"][0]["return"].is_number());
}

#[test]
fn frontier_is_reproducible_for_a_seed() {
  let req: FrontierRequest = serde_json::from_value(json!({
    "tickers": ["AAPL", "MSFT"],
    "num_portfolios": 50,
    "seed": 3
  }))
  .unwrap();
  let svc = service();
  assert_eq!(svc.efficient_frontier(&req).unwrap(), svc.efficient_frontier(&req).unwrap());
}

#[test]
fn performance_reports_ratios_and_drawdown() {
  let req: PerformanceRequest = serde_json::from_value(json!({
    "tickers": ["AAPL", "MSFT"],
    "weights": [0.7, 0.3],
    "period": "max",
    "benchmark": "SPY"
  }))
  .unwrap();

  let v = to_json(&service().performance_response(&req));
  assert_eq!(v["status"], json!("success"));
  for key in ["sharpe_ratio", "sortino_ratio", "max_drawdown", "beta"] {
    assert!(v["data"][key].is_number(), "{key}");
  }
  let dd = v["data"]["max_drawdown"].as_f64().unwrap();
  assert!((0.0..1.0).contains(&dd));
}

#[test]
fn missing_benchmark_leaves_beta_null() {
  let req: PerformanceRequest = serde_json::from_value(json!({
    "tickers": ["AAPL", "MSFT"],
    "weights": [0.5, 0.5],
    "benchmark": "NOPE"
  }))
  .unwrap();
  let v = to_json(&service().performance_response(&req));
  assert_eq!(v["status"], json!("success"));
  assert!(v["data"]["beta"].is_null());
}

#[test]
fn rebalance_lists_trades() {
  let req: RebalanceRequest = serde_json::from_value(json!({
    "current": {"AAPL": 0.8, "MSFT": 0.2},
    "target": {"AAPL": 0.5, "MSFT": 0.5},
    "total_value": 10000.0,
    "prices": {"AAPL": 150.0, "MSFT": 300.0}
  }))
  .unwrap();
  let v = to_json(&service().rebalance_response(&req));
  assert_eq!(v["data"]["count"], json!(2));
  assert_eq!(v["data"]["trades"][0]["action"], json!("sell"));
  assert_eq!(v["data"]["trades"][1]["action"], json!("buy"));
}

#[test]
fn exhausted_time_budget_is_a_timeout() {
  let source = InMemorySource::new()
    .with_series(series("AAPL", 300, 0.0008, 0.015, 1))
    .with_series(series("MSFT", 300, 0.0006, 0.012, 2));
  let config = EngineConfig {
    time_budget_ms: Some(0),
    ..EngineConfig::default()
  };
  let svc = RiskService::new(source, config);
  let req: DualStockVaRRequest = serde_json::from_value(json!({
    "ticker1": "AAPL", "ticker2": "MSFT", "weight1": 0.5, "weight2": 0.5,
    "num_simulations": 2000000
  }))
  .unwrap();
  let v = to_json(&svc.dual_stock_var_response(&req));
  assert_eq!(v["error"]["kind"], json!("TimeoutError"));
  assert!(v.get("data").is_none());
}

#[test]
fn csv_directory_end_to_end() {
  let dir = tempfile::tempdir().unwrap();
  let mut rng = StdRng::seed_from_u64(99);
  let shock = Normal::new(0.0005, 0.01).unwrap();

  for ticker in ["AAA", "BBB"] {
    let mut price = 100.0;
    let mut body = String::from("date,close\n");
    for d in dates(120) {
      price *= 1.0 + shock.sample(&mut rng);
      body.push_str(&format!("{d},{price:.4}\n"));
    }
    fs::write(dir.path().join(format!("{ticker}.csv")), body).unwrap();
  }

  let svc = RiskService::new(CsvDirectorySource::new(dir.path()), EngineConfig::default());
  let req: DualStockVaRRequest = serde_json::from_value(json!({
    "ticker1": "AAA", "ticker2": "BBB", "weight1": 0.5, "weight2": 0.5, "seed": 1
  }))
  .unwrap();
  let data = svc.dual_stock_var(&req).unwrap();

  assert_eq!(data.result.observations, 119);
  assert!(data.result.var_parametric > 0.0);
  assert!(data.result.var_parametric < 0.1);
}
