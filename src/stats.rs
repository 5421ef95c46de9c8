//! # Stats
//!
//! $$
//! \bar x=\frac1n\sum_i x_i,\qquad s^2=\frac{1}{n-1}\sum_i (x_i-\bar x)^2
//! $$
//!
pub mod descriptive;
pub mod normal;
