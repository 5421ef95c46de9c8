use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use portfolio_risk::api::types::DualStockVaRRequest;
use portfolio_risk::api::types::FrontierRequest;
use portfolio_risk::api::types::OptimizeRequest;
use portfolio_risk::api::types::PerformanceRequest;
use portfolio_risk::api::types::RebalanceRequest;
use portfolio_risk::api::CsvDirectorySource;
use portfolio_risk::api::RiskService;
use portfolio_risk::quant::series::ReturnKind;
use portfolio_risk::EngineConfig;
use prettytable::row;
use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portfolio-risk", version)]
#[command(about = "Two-asset VaR, max-Sharpe optimization and frontier sampling over CSV prices")]
struct Cli {
  #[command(subcommand)]
  command: Command,

  /// Directory holding one `<TICKER>.csv` per asset
  #[arg(long, global = true, default_value = "data")]
  data_dir: PathBuf,

  /// Engine configuration (TOML)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[arg(long, global = true, value_enum, default_value_t = Format::Json)]
  format: Format,

  /// Derive log instead of simple returns from close prices
  #[arg(long, global = true)]
  log_returns: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
  Json,
  Table,
}

#[derive(Args)]
struct RequestArgs {
  /// JSON request body, `-` reads stdin
  #[arg(short, long, default_value = "-")]
  request: String,
}

#[derive(Subcommand)]
enum Command {
  /// Dual-asset VaR and expected shortfall
  Var(RequestArgs),
  /// Maximum-Sharpe allocation
  Optimize(RequestArgs),
  /// Random efficient-frontier samples
  Frontier(RequestArgs),
  /// Sharpe, Sortino and drawdown of given weights
  Performance(RequestArgs),
  /// Trades from current to target weights
  Rebalance(RequestArgs),
}

fn read_request<T: DeserializeOwned>(args: &RequestArgs) -> anyhow::Result<T> {
  let raw = if args.request == "-" {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .context("failed to read request from stdin")?;
    buf
  } else {
    fs::read_to_string(&args.request).with_context(|| format!("failed to read {}", args.request))?
  };
  serde_json::from_str(&raw).context("request is not valid JSON for this command")
}

fn scalar(v: &Value) -> String {
  match v {
    Value::Null => "-".to_string(),
    Value::Number(n) => n
      .as_f64()
      .map(|x| format!("{x:.6}"))
      .unwrap_or_else(|| n.to_string()),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn print_table(data: &Value) {
  let Value::Object(fields) = data else {
    println!("{}", scalar(data));
    return;
  };

  let mut summary = Table::new();
  let mut lists = Vec::new();
  for (key, value) in fields {
    match value {
      Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
        lists.push((key, items))
      }
      Value::Object(inner) => {
        for (k, v) in inner {
          summary.add_row(row![format!("{key}.{k}"), scalar(v)]);
        }
      }
      _ => {
        summary.add_row(row![key, scalar(value)]);
      }
    }
  }
  summary.printstd();

  for (key, items) in lists {
    println!("\n{key}");
    let mut table = Table::new();
    if let Some(Value::Object(first)) = items.first() {
      table.set_titles(Row::new(first.keys().map(|k| Cell::new(k)).collect()));
    }
    for item in items {
      if let Value::Object(obj) = item {
        table.add_row(Row::new(obj.values().map(|v| Cell::new(&scalar(v))).collect()));
      }
    }
    table.printstd();
  }
}

fn emit<T: Serialize>(envelope: &T, format: Format) -> anyhow::Result<ExitCode> {
  let value = serde_json::to_value(envelope).context("failed to encode response")?;
  let ok = value.get("success") == Some(&Value::Bool(true))
    || value.get("status").and_then(Value::as_str) == Some("success");

  match format {
    Format::Json => println!("{}", serde_json::to_string_pretty(&value)?),
    Format::Table => match (value.get("data"), value.get("error")) {
      (Some(data), _) => print_table(data),
      (None, Some(error)) => print_table(error),
      _ => println!("{value}"),
    },
  }
  Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();

  let config = match &cli.config {
    Some(path) => {
      EngineConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?
    }
    None => EngineConfig::default(),
  };
  let kind = if cli.log_returns { ReturnKind::Log } else { ReturnKind::Simple };
  let source = CsvDirectorySource::new(&cli.data_dir).with_return_kind(kind);
  let service = RiskService::new(source, config);

  match &cli.command {
    Command::Var(args) => {
      let req: DualStockVaRRequest = read_request(args)?;
      emit(&service.dual_stock_var_response(&req), cli.format)
    }
    Command::Optimize(args) => {
      let req: OptimizeRequest = read_request(args)?;
      emit(&service.optimize_response(&req), cli.format)
    }
    Command::Frontier(args) => {
      let req: FrontierRequest = read_request(args)?;
      emit(&service.efficient_frontier_response(&req), cli.format)
    }
    Command::Performance(args) => {
      let req: PerformanceRequest = read_request(args)?;
      emit(&service.performance_response(&req), cli.format)
    }
    Command::Rebalance(args) => {
      let req: RebalanceRequest = read_request(args)?;
      emit(&service.rebalance_response(&req), cli.format)
    }
  }
}
