//! # Return Sources
//!
//! $$
//! (\text{ticker},\ \text{period}) \mapsto \{(t_k, r_k)\}_{k=1}^{n}
//! $$
//!
//! Collaborators that supply return series to the request handlers.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;
use crate::error::RiskError;
use crate::quant::series::Period;
use crate::quant::series::ReturnKind;
use crate::quant::series::ReturnSeries;

/// Supplies the return history of one ticker over a look-back period.
pub trait ReturnSource: Send + Sync {
  fn load(&self, ticker: &str, period: Period) -> Result<ReturnSeries>;
}

/// Series held in memory, keyed by upper-case ticker.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
  series: HashMap<String, ReturnSeries>,
}

impl InMemorySource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, series: ReturnSeries) {
    self.series.insert(series.ticker().to_uppercase(), series);
  }

  pub fn with_series(mut self, series: ReturnSeries) -> Self {
    self.insert(series);
    self
  }
}

impl ReturnSource for InMemorySource {
  fn load(&self, ticker: &str, period: Period) -> Result<ReturnSeries> {
    self
      .series
      .get(&ticker.to_uppercase())
      .map(|s| s.trailing(period))
      .ok_or_else(|| RiskError::DataSource(format!("no data for ticker {ticker}")))
  }
}

/// Reads `<dir>/<TICKER>.csv` files with a `date` column and either a `close` (or
/// `adj close`) column or a `return` column.
#[derive(Clone, Debug)]
pub struct CsvDirectorySource {
  root: PathBuf,
  kind: ReturnKind,
}

enum ValueColumn {
  Close(usize),
  Return(usize),
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
  let raw = raw.trim();
  let day = raw.get(..10).unwrap_or(raw);
  NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl CsvDirectorySource {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      kind: ReturnKind::Simple,
    }
  }

  /// Use log instead of simple returns for price files.
  pub fn with_return_kind(mut self, kind: ReturnKind) -> Self {
    self.kind = kind;
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, ticker: &str) -> Result<PathBuf> {
    let valid = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '_');
    if ticker.is_empty() || !ticker.chars().all(valid) {
      return Err(RiskError::InvalidInput(format!("invalid ticker '{ticker}'")));
    }
    let upper = self.root.join(format!("{}.csv", ticker.to_uppercase()));
    if upper.exists() {
      return Ok(upper);
    }
    Ok(self.root.join(format!("{ticker}.csv")))
  }

  fn read(&self, ticker: &str) -> Result<ReturnSeries> {
    let path = self.path_for(ticker)?;
    let source_err =
      |e: &dyn std::fmt::Display| RiskError::DataSource(format!("{}: {e}", path.display()));

    let mut reader = csv::ReaderBuilder::new()
      .trim(csv::Trim::All)
      .flexible(true)
      .from_path(&path)
      .map_err(|e| source_err(&e))?;

    let headers: Vec<String> = reader
      .headers()
      .map_err(|e| source_err(&e))?
      .iter()
      .map(|h| h.to_lowercase())
      .collect();
    let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

    let date_col = find(&["date", "datetime", "timestamp"])
      .ok_or_else(|| RiskError::DataSource(format!("{}: no date column", path.display())))?;
    let close = find(&["adj close", "adj_close", "close"]);
    let value_col = match (close, find(&["return", "returns"])) {
      (_, Some(i)) => ValueColumn::Return(i),
      (Some(i), None) => ValueColumn::Close(i),
      (None, None) => {
        return Err(RiskError::DataSource(format!(
          "{}: needs a close or return column",
          path.display()
        )))
      }
    };
    let value_idx = match value_col {
      ValueColumn::Close(i) | ValueColumn::Return(i) => i,
    };

    let mut rows: Vec<(NaiveDate, f64)> = Vec::new();
    for (line, record) in reader.records().enumerate() {
      let record = record.map_err(|e| source_err(&e))?;
      let (Some(raw_date), Some(raw_value)) = (record.get(date_col), record.get(value_idx)) else {
        continue;
      };
      if raw_value.is_empty() {
        continue;
      }
      let date = parse_date(raw_date).ok_or_else(|| {
        RiskError::DataSource(format!(
          "{}: bad date '{raw_date}' on row {}",
          path.display(),
          line + 2
        ))
      })?;
      let value: f64 = raw_value.parse().map_err(|_| {
        RiskError::DataSource(format!(
          "{}: bad number '{raw_value}' on row {}",
          path.display(),
          line + 2
        ))
      })?;
      rows.push((date, value));
    }
    rows.sort_by_key(|(d, _)| *d);
    debug!(ticker, rows = rows.len(), path = %path.display(), "csv loaded");

    let (dates, values): (Vec<NaiveDate>, Vec<f64>) = rows.into_iter().unzip();
    match value_col {
      ValueColumn::Return(_) => ReturnSeries::new(ticker, dates, values),
      ValueColumn::Close(_) => ReturnSeries::from_prices(ticker, dates, &values, self.kind),
    }
  }
}

impl ReturnSource for CsvDirectorySource {
  fn load(&self, ticker: &str, period: Period) -> Result<ReturnSeries> {
    Ok(self.read(ticker)?.trailing(period))
  }
}
