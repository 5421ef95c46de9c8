//! # Return Series
//!
//! $$
//! r_t=\frac{P_t}{P_{t-1}}-1\quad\text{or}\quad r_t=\ln\frac{P_t}{P_{t-1}}
//! $$
//!
//! Ordered per-asset return observations, look-back windows and timestamp alignment.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::Datelike;
use chrono::Months;
use chrono::NaiveDate;

use crate::error::Result;
use crate::error::RiskError;

/// How returns are derived from close prices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReturnKind {
  /// `P_t / P_{t-1} - 1`.
  #[default]
  Simple,
  /// `ln(P_t / P_{t-1})`.
  Log,
}

/// Historical look-back window such as `"6mo"` or `"1y"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Period {
  Days(u32),
  Months(u32),
  Years(u32),
  YearToDate,
  Max,
}

impl Default for Period {
  fn default() -> Self {
    Self::Years(1)
  }
}

impl Period {
  /// First date (inclusive) of the window ending at `last`.
  fn start_date(self, last: NaiveDate) -> Option<NaiveDate> {
    match self {
      Self::Days(d) => last.checked_sub_days(chrono::Days::new(d as u64)),
      Self::Months(m) => last.checked_sub_months(Months::new(m)),
      Self::Years(y) => y
        .checked_mul(12)
        .and_then(|m| last.checked_sub_months(Months::new(m))),
      Self::YearToDate => NaiveDate::from_ymd_opt(last.year(), 1, 1),
      Self::Max => None,
    }
  }

  /// Approximate number of trading periods, used when a series carries no dates.
  fn trading_periods(self) -> Option<usize> {
    match self {
      Self::Days(d) => Some(d as usize),
      Self::Months(m) => Some((m as usize).saturating_mul(21)),
      Self::Years(y) => Some((y as usize).saturating_mul(252)),
      Self::YearToDate | Self::Max => None,
    }
  }
}

impl FromStr for Period {
  type Err = RiskError;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
      "ytd" => return Ok(Self::YearToDate),
      "max" => return Ok(Self::Max),
      _ => {}
    }

    let split = s
      .find(|c: char| !c.is_ascii_digit())
      .ok_or_else(|| RiskError::InvalidInput(format!("period '{s}' has no unit")))?;
    let (count, unit) = s.split_at(split);
    let count: u32 = count
      .parse()
      .map_err(|_| RiskError::InvalidInput(format!("period '{s}' has no count")))?;
    if count == 0 {
      return Err(RiskError::InvalidInput(format!("period '{s}' is empty")));
    }

    let too_long = || RiskError::InvalidInput(format!("period '{s}' is too long"));
    match unit {
      "d" => Ok(Self::Days(count)),
      "wk" => count.checked_mul(7).map(Self::Days).ok_or_else(too_long),
      "mo" => Ok(Self::Months(count)),
      "y" => count
        .checked_mul(12)
        .map(|_| Self::Years(count))
        .ok_or_else(too_long),
      _ => Err(RiskError::InvalidInput(format!(
        "period '{s}' has unknown unit '{unit}'"
      ))),
    }
  }
}

/// Ordered historical returns of one asset.
///
/// Dates, when present, are strictly increasing and parallel to `values`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnSeries {
  ticker: String,
  dates: Option<Vec<NaiveDate>>,
  values: Vec<f64>,
}

impl ReturnSeries {
  /// Build a dated series.
  pub fn new(ticker: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
    let ticker = ticker.into();
    if dates.len() != values.len() {
      return Err(RiskError::MisalignedSeries(format!(
        "{ticker}: {} dates for {} returns",
        dates.len(),
        values.len()
      )));
    }
    if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
      return Err(RiskError::MisalignedSeries(format!(
        "{ticker}: timestamps not strictly increasing at {}",
        w[1]
      )));
    }
    check_finite(&ticker, &values)?;

    Ok(Self {
      ticker,
      dates: Some(dates),
      values,
    })
  }

  /// Build an undated series; alignment then relies on equal lengths.
  pub fn from_values(ticker: impl Into<String>, values: Vec<f64>) -> Result<Self> {
    let ticker = ticker.into();
    check_finite(&ticker, &values)?;
    Ok(Self {
      ticker,
      dates: None,
      values,
    })
  }

  /// Derive returns from dated close prices. The first price only anchors the first return.
  pub fn from_prices(
    ticker: impl Into<String>,
    dates: Vec<NaiveDate>,
    closes: &[f64],
    kind: ReturnKind,
  ) -> Result<Self> {
    let ticker = ticker.into();
    if dates.len() != closes.len() {
      return Err(RiskError::MisalignedSeries(format!(
        "{ticker}: {} dates for {} prices",
        dates.len(),
        closes.len()
      )));
    }
    if closes.iter().any(|p| !(p.is_finite() && *p > 0.0)) {
      return Err(RiskError::InvalidInput(format!(
        "{ticker}: prices must be positive and finite"
      )));
    }

    let values = closes
      .windows(2)
      .map(|w| match kind {
        ReturnKind::Simple => w[1] / w[0] - 1.0,
        ReturnKind::Log => (w[1] / w[0]).ln(),
      })
      .collect();
    let dates = dates.into_iter().skip(1).collect();

    Self::new(ticker, dates, values)
  }

  pub fn ticker(&self) -> &str {
    &self.ticker
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn dates(&self) -> Option<&[NaiveDate]> {
    self.dates.as_deref()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Restrict to the trailing look-back window.
  pub fn trailing(&self, period: Period) -> Self {
    let start = match &self.dates {
      Some(dates) => match dates.last().and_then(|&last| period.start_date(last)) {
        Some(first) => dates.partition_point(|d| *d < first),
        None => 0,
      },
      None => period
        .trading_periods()
        .map(|n| self.values.len().saturating_sub(n))
        .unwrap_or(0),
    };

    Self {
      ticker: self.ticker.clone(),
      dates: self.dates.as_ref().map(|d| d[start..].to_vec()),
      values: self.values[start..].to_vec(),
    }
  }
}

fn check_finite(ticker: &str, values: &[f64]) -> Result<()> {
  if values.iter().all(|v| v.is_finite()) {
    Ok(())
  } else {
    Err(RiskError::InvalidInput(format!(
      "{ticker}: returns must be finite"
    )))
  }
}

/// Several return series restricted to their common observations.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedReturns {
  tickers: Vec<String>,
  dates: Option<Vec<NaiveDate>>,
  columns: Vec<Vec<f64>>,
}

impl AlignedReturns {
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn dates(&self) -> Option<&[NaiveDate]> {
    self.dates.as_deref()
  }

  /// One column per asset, all of equal length.
  pub fn columns(&self) -> &[Vec<f64>] {
    &self.columns
  }

  pub fn column(&self, i: usize) -> &[f64] {
    &self.columns[i]
  }

  pub fn assets(&self) -> usize {
    self.columns.len()
  }

  pub fn observations(&self) -> usize {
    self.columns.first().map(Vec::len).unwrap_or(0)
  }

  /// Per-period return of the portfolio holding `weights`.
  pub fn weighted(&self, weights: &[f64]) -> Result<Vec<f64>> {
    if weights.len() != self.columns.len() {
      return Err(RiskError::InvalidWeights(format!(
        "{} weights for {} assets",
        weights.len(),
        self.columns.len()
      )));
    }

    Ok(
      (0..self.observations())
        .map(|t| {
          weights
            .iter()
            .zip(self.columns.iter())
            .map(|(w, col)| w * col[t])
            .sum()
        })
        .collect(),
    )
  }

  /// The weighted portfolio as a series of its own, keeping dates when known.
  pub fn weighted_series(&self, name: &str, weights: &[f64]) -> Result<ReturnSeries> {
    let values = self.weighted(weights)?;
    match &self.dates {
      Some(dates) => ReturnSeries::new(name, dates.clone(), values),
      None => ReturnSeries::from_values(name, values),
    }
  }
}

/// Align series on their common dates, or on equal length when undated.
///
/// Fails with [`RiskError::MisalignedSeries`] when dated and undated series are mixed, when
/// undated lengths differ or when dated series share no dates, and with
/// [`RiskError::InsufficientData`] when fewer than two common observations remain.
pub fn align(series: &[&ReturnSeries]) -> Result<AlignedReturns> {
  if series.is_empty() {
    return Err(RiskError::InsufficientData("no series to align".to_string()));
  }

  let tickers: Vec<String> = series.iter().map(|s| s.ticker.clone()).collect();
  let dated = series.iter().filter(|s| s.dates.is_some()).count();

  let aligned = if dated == 0 {
    let n = series[0].len();
    if let Some(bad) = series.iter().find(|s| s.len() != n) {
      return Err(RiskError::MisalignedSeries(format!(
        "undated series {} has {} observations, expected {n}",
        bad.ticker,
        bad.len()
      )));
    }
    AlignedReturns {
      tickers,
      dates: None,
      columns: series.iter().map(|s| s.values.clone()).collect(),
    }
  } else if dated == series.len() {
    let mut common: BTreeSet<NaiveDate> = series[0]
      .dates()
      .map(|d| d.iter().copied().collect())
      .unwrap_or_default();
    for s in &series[1..] {
      let other: BTreeSet<NaiveDate> = s
        .dates()
        .map(|d| d.iter().copied().collect())
        .unwrap_or_default();
      common = common.intersection(&other).copied().collect();
    }

    if common.is_empty() && series.iter().all(|s| !s.is_empty()) {
      return Err(RiskError::MisalignedSeries(format!(
        "series {} share no dates",
        tickers.join(", ")
      )));
    }

    let columns = series
      .iter()
      .map(|s| {
        let dates = s.dates().unwrap_or_default();
        dates
          .iter()
          .zip(s.values.iter())
          .filter(|(d, _)| common.contains(d))
          .map(|(_, v)| *v)
          .collect()
      })
      .collect();

    AlignedReturns {
      tickers,
      dates: Some(common.into_iter().collect()),
      columns,
    }
  } else {
    return Err(RiskError::MisalignedSeries(
      "cannot align dated with undated series".to_string(),
    ));
  };

  if aligned.observations() < 2 {
    return Err(RiskError::InsufficientData(format!(
      "{} aligned observations for {}, need at least 2",
      aligned.observations(),
      aligned.tickers.join(", ")
    )));
  }

  Ok(aligned)
}
