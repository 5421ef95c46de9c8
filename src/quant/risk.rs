//! # Risk
//!
//! $$
//! \text{VaR}_c(R_p)=-\inf\{x:\ \mathbb P(R_p\le x)>1-c\}
//! $$
//!
pub mod comparison;
pub mod dual;
pub mod metrics;
pub mod var;
