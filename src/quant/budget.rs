//! # Wall-Clock Budget
//!
//! $$
//! t_{\text{elapsed}} \le T_{\text{budget}}
//! $$
//!
use std::time::Duration;
use std::time::Instant;

use crate::error::Result;
use crate::error::RiskError;

/// Deadline checked between units of work (simulation chunks, estimator phases).
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
  start: Instant,
  budget: Option<Duration>,
}

impl Deadline {
  /// No time limit.
  pub fn unbounded() -> Self {
    Self {
      start: Instant::now(),
      budget: None,
    }
  }

  /// Expire `millis` after now; `None` means unbounded.
  pub fn from_millis(millis: Option<u64>) -> Self {
    Self {
      start: Instant::now(),
      budget: millis.map(Duration::from_millis),
    }
  }

  pub fn is_expired(&self) -> bool {
    self
      .budget
      .map(|b| self.start.elapsed() > b)
      .unwrap_or(false)
  }

  /// Fail with [`RiskError::Timeout`] once the budget is spent.
  pub fn check(&self) -> Result<()> {
    match self.budget {
      Some(b) if self.start.elapsed() > b => Err(RiskError::Timeout(b.as_millis() as u64)),
      _ => Ok(()),
    }
  }
}

impl Default for Deadline {
  fn default() -> Self {
    Self::unbounded()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unbounded_never_expires() {
    let d = Deadline::unbounded();
    assert!(!d.is_expired());
    assert!(d.check().is_ok());
  }

  #[test]
  fn zero_budget_expires() {
    let d = Deadline::from_millis(Some(0));
    std::thread::sleep(Duration::from_millis(2));
    assert!(d.is_expired());
    assert_eq!(d.check(), Err(RiskError::Timeout(0)));
  }
}
