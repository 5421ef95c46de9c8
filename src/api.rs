//! # API
//!
//! $$
//! \texttt{POST /risk/dual-stock-var},\ \texttt{/portfolio/optimize},\ \texttt{/portfolio/efficient-frontier},\ \texttt{/portfolio/performance}
//! $$
//!
//! JSON contracts, return-series collaborators and the request handlers behind them.

pub mod handlers;
pub mod source;
pub mod types;

pub use handlers::RiskService;
pub use source::CsvDirectorySource;
pub use source::InMemorySource;
pub use source::ReturnSource;
