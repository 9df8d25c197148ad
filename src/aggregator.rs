use crate::config::AggregatorConfig;
use crate::format::{CurrencyFormatter, LocaleFormatter};
use crate::normalize::{normalize_flow, FlowDiagnostics, LogDiagnostics, RawFlow};
use crate::schema::{AggregationResult, CurrencyCode, KeyShare, MonetaryFlow, NumericPolicy};
use crate::utils::round_to_tenth;
use std::collections::BTreeMap;

/// Normalizes raw flows and computes the figures shown next to them.
///
/// Stateless apart from its configuration: every call works on the flow it is
/// given and recomputes from scratch.
pub struct FlowAggregator<D = LogDiagnostics, F = LocaleFormatter> {
    config: AggregatorConfig,
    diagnostics: D,
    formatter: F,
}

impl FlowAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self::with_parts(config, LogDiagnostics, LocaleFormatter)
    }
}

impl Default for FlowAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

impl<D: FlowDiagnostics, F: CurrencyFormatter> FlowAggregator<D, F> {
    pub fn with_parts(config: AggregatorConfig, diagnostics: D, formatter: F) -> Self {
        Self {
            config,
            diagnostics,
            formatter,
        }
    }

    pub fn with_diagnostics<D2: FlowDiagnostics>(self, diagnostics: D2) -> FlowAggregator<D2, F> {
        FlowAggregator::with_parts(self.config, diagnostics, self.formatter)
    }

    pub fn with_formatter<F2: CurrencyFormatter>(self, formatter: F2) -> FlowAggregator<D, F2> {
        FlowAggregator::with_parts(self.config, self.diagnostics, formatter)
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn formatter(&self) -> &F {
        &self.formatter
    }

    pub fn numeric_policy(&self) -> NumericPolicy {
        self.config.numeric_policy
    }

    pub fn normalize(&self, raw: impl Into<RawFlow>) -> MonetaryFlow {
        normalize_flow(&raw.into(), self.config.numeric_policy, &self.diagnostics)
    }

    pub fn total(&self, flow: &MonetaryFlow) -> f64 {
        flow.iter().map(|(_, amount)| amount).sum()
    }

    /// Total plus each key's share of it.
    ///
    /// Shares are in percent with one decimal place. When the total is
    /// positive the tenths are distributed by largest remainder, so the
    /// shares always add up to 100.0. When the total is zero, negative or
    /// overflows to infinity, every share is 0.
    pub fn breakdown(&self, flow: &MonetaryFlow) -> AggregationResult {
        let total = self.total(flow);
        let percents = if total.is_finite() && total > 0.0 {
            largest_remainder_tenths(flow, total)
        } else {
            BTreeMap::new()
        };

        let by_key = flow
            .iter()
            .map(|(key, amount)| {
                let percent_of_total = percents.get(key).copied().unwrap_or(0.0);
                (
                    key.to_string(),
                    KeyShare {
                        amount,
                        percent_of_total,
                    },
                )
            })
            .collect();

        AggregationResult { total, by_key }
    }

    /// Hands the flow total and `currency` to the formatter.
    pub fn format_total(&self, flow: &MonetaryFlow, currency: CurrencyCode) -> String {
        self.formatter.format(self.total(flow), currency)
    }

    pub fn format_amount(&self, amount: f64, currency: CurrencyCode) -> String {
        self.formatter.format(amount, currency)
    }

    /// Percent change from the earliest period to the latest, one decimal.
    /// 0 for flows with fewer than two entries or a zero first amount.
    pub fn variation(&self, flow: &MonetaryFlow) -> f64 {
        let keys = flow.keys_chronological();
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            return 0.0;
        };
        if keys.len() < 2 {
            return 0.0;
        }

        let first_value = flow.get(first).unwrap_or(0.0);
        let last_value = flow.get(last).unwrap_or(0.0);
        if first_value == 0.0 {
            return 0.0;
        }

        round_to_tenth((last_value - first_value) / first_value * 100.0)
    }
}

/// Rounds each share to tenths of a percent so that the tenths sum to 1000.
///
/// Units stay in `f64`: offsetting entries far larger than the total give
/// shares well outside any integer range.
fn largest_remainder_tenths(flow: &MonetaryFlow, total: f64) -> BTreeMap<&str, f64> {
    let mut units: Vec<(&str, f64, f64)> = flow
        .iter()
        .map(|(key, amount)| {
            let exact = amount / total * 1000.0;
            let floor = exact.floor();
            (key, floor, exact - floor)
        })
        .collect();

    let assigned: f64 = units.iter().map(|(_, u, _)| *u).sum();
    let missing = (1000.0 - assigned).clamp(0.0, units.len() as f64) as usize;

    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by(|&a, &b| units[b].2.total_cmp(&units[a].2));
    for &idx in order.iter().take(missing) {
        units[idx].1 += 1.0;
    }

    units
        .into_iter()
        .map(|(key, u, _)| (key, u / 10.0))
        .collect()
}
