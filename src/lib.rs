//! # Monetary Flow Aggregator
//!
//! A library for reading the period-keyed monetary flows embedded in farm
//! finance records (bank debts, property and land debts, leases, projections)
//! and computing the totals, percentage breakdowns and formatted figures shown
//! next to them.
//!
//! ## Core Concepts
//!
//! - **Flow**: a mapping from a period key (a harvest id or a year) to an amount
//! - **Raw flow**: the flow as persisted, either a JSON object or JSON text
//! - **Normalization**: turning any raw flow into a [`MonetaryFlow`]; malformed
//!   input becomes an empty flow and is reported, never raised
//! - **Currency**: BRL, USD, EUR or SOJA (sacks of soybean), carried by the
//!   parent record rather than the flow
//!
//! ## Example
//!
//! ```rust
//! use monetary_flow_aggregator::*;
//!
//! let aggregator = FlowAggregator::new(AggregatorConfig::default());
//!
//! let flow = aggregator.normalize(r#"{"harvest-1": 1000, "harvest-2": 500}"#);
//! assert_eq!(aggregator.total(&flow), 1500.0);
//!
//! let result = aggregator.breakdown(&flow);
//! assert_eq!(result.by_key["harvest-1"].percent_of_total, 66.7);
//!
//! assert_eq!(
//!     aggregator.format_total(&flow, CurrencyCode::Brl),
//!     "R$ 1.500,00"
//! );
//! ```

pub mod aggregator;
pub mod config;
pub mod consolidation;
pub mod error;
pub mod format;
pub mod normalize;
pub mod schema;
pub mod utils;

pub use aggregator::FlowAggregator;
pub use config::AggregatorConfig;
pub use consolidation::{Consolidator, CurrencyTotals};
pub use error::{FlowError, Result};
pub use format::{format_percent, CurrencyFormatter, LocaleFormatter};
pub use normalize::{
    normalize_flow, read_amount, FlowDiagnostics, LogDiagnostics, RawFlow, SilentDiagnostics,
};
pub use schema::*;
pub use utils::{compare_period_keys, next_year_key, period_year, sort_period_keys};

/// Normalizes `raw` with the strict numeric policy, reporting through `log`.
pub fn normalize(raw: impl Into<RawFlow>) -> MonetaryFlow {
    normalize_flow(&raw.into(), NumericPolicy::Strict, &LogDiagnostics)
}

/// Total of a raw flow under the strict numeric policy.
pub fn flow_total(raw: impl Into<RawFlow>) -> f64 {
    normalize(raw).iter().map(|(_, amount)| amount).sum()
}
