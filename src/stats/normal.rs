//! # Standard Normal
//!
//! $$
//! \varphi(z)=\frac{1}{\sqrt{2\pi}}e^{-z^2/2},\qquad z_\alpha=\Phi^{-1}(\alpha)
//! $$
//!
use std::f64::consts::PI;
use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;
use statrs::function::erf::erfc_inv;

/// Inverse CDF of N(0, 1), `-√2 erfc⁻¹(2p)`.
pub fn inverse_cdf(p: f64) -> f64 {
  -SQRT_2 * erfc_inv(2.0 * p)
}

/// CDF of N(0, 1).
pub fn cdf(x: f64) -> f64 {
  0.5 * erfc(-x / SQRT_2)
}

/// Density of N(0, 1).
pub fn pdf(x: f64) -> f64 {
  (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Lower-tail z-score used by parametric VaR, `Φ⁻¹(1 - c)`.
///
/// Negative for any confidence above one half (≈ -1.645 at 95%, ≈ -2.326 at 99%).
pub fn tail_z_score(confidence: f64) -> f64 {
  inverse_cdf(1.0 - confidence)
}
