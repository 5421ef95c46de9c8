//! # Quant
//!
//! $$
//! R_p=\mathbf{w}^\top\mathbf{r},\qquad \sigma_p^2=\mathbf{w}^\top\Sigma\mathbf{w}
//! $$
//!
//! Return series, covariance estimation, tail-risk estimators and portfolio construction.

pub mod budget;
pub mod covariance;
pub mod portfolio;
pub mod risk;
pub(crate) mod sampling;
pub mod series;
