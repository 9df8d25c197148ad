use crate::aggregator::FlowAggregator;
use crate::config::validate_rate;
use crate::error::{FlowError, Result};
use crate::format::CurrencyFormatter;
use crate::normalize::{FlowDiagnostics, RawFlow};
use crate::schema::{AggregationResult, CurrencyCode, FlowRecord, GroupKey, MonetaryFlow};
use log::debug;
use std::collections::BTreeMap;

pub type CurrencyTotals = BTreeMap<CurrencyCode, f64>;

/// Roll-ups across many parent records (debts, leases, projections).
pub struct Consolidator<'a, D, F> {
    aggregator: &'a FlowAggregator<D, F>,
}

impl<'a, D: FlowDiagnostics, F: CurrencyFormatter> Consolidator<'a, D, F> {
    pub fn new(aggregator: &'a FlowAggregator<D, F>) -> Self {
        Self { aggregator }
    }

    pub fn currency_of(&self, record: &FlowRecord) -> CurrencyCode {
        record
            .currency
            .unwrap_or(self.aggregator.config().default_currency)
    }

    pub fn record_flow(&self, record: &FlowRecord) -> MonetaryFlow {
        self.aggregator.normalize(RawFlow::from(&record.flow))
    }

    pub fn record_total(&self, record: &FlowRecord) -> f64 {
        self.aggregator.total(&self.record_flow(record))
    }

    pub fn totals_by_currency(&self, records: &[FlowRecord]) -> CurrencyTotals {
        let mut totals = CurrencyTotals::new();
        for record in records {
            *totals.entry(self.currency_of(record)).or_insert(0.0) += self.record_total(record);
        }
        totals
    }

    /// Currency totals per harvest. Every record also counts toward
    /// [`GroupKey::All`]; records without a harvest land in
    /// [`GroupKey::Ungrouped`].
    pub fn totals_by_group(&self, records: &[FlowRecord]) -> BTreeMap<GroupKey, CurrencyTotals> {
        let mut groups: BTreeMap<GroupKey, CurrencyTotals> = BTreeMap::new();
        groups.insert(GroupKey::All, CurrencyTotals::new());

        for record in records {
            let currency = self.currency_of(record);
            let total = self.record_total(record);

            let group = match &record.harvest {
                Some(harvest) => GroupKey::Harvest(harvest.clone()),
                None => GroupKey::Ungrouped,
            };

            for key in [GroupKey::All, group] {
                *groups
                    .entry(key)
                    .or_default()
                    .entry(currency)
                    .or_insert(0.0) += total;
            }
        }

        groups
    }

    /// For each currency, the period-by-period sum of every record's flow.
    pub fn period_totals(&self, records: &[FlowRecord]) -> BTreeMap<CurrencyCode, MonetaryFlow> {
        let mut merged: BTreeMap<CurrencyCode, MonetaryFlow> = BTreeMap::new();
        for record in records {
            let target = merged.entry(self.currency_of(record)).or_default();
            for (period, amount) in self.record_flow(record).iter() {
                target.accumulate(period, amount);
            }
        }
        merged
    }

    /// BRL per unit of the record's currency: the record's contract rate,
    /// then `rates`. BRL is always 1.
    pub fn rate_for(&self, record: &FlowRecord, rates: &CurrencyTotals) -> Result<f64> {
        let currency = self.currency_of(record);
        if currency == CurrencyCode::Brl {
            return Ok(1.0);
        }

        let rate = record
            .contract_rate
            .or_else(|| rates.get(&currency).copied())
            .ok_or_else(|| FlowError::MissingExchangeRate {
                currency: currency.to_string(),
            })?;
        validate_rate(currency, rate)?;
        Ok(rate)
    }

    /// Sum of every record's total converted to BRL.
    pub fn total_in_brl(&self, records: &[FlowRecord], rates: &CurrencyTotals) -> Result<f64> {
        Ok(self.brl_by_currency(records, rates)?.values().sum())
    }

    /// Share of each currency in the BRL-converted portfolio total, keyed by
    /// currency code.
    pub fn currency_distribution(
        &self,
        records: &[FlowRecord],
        rates: &CurrencyTotals,
    ) -> Result<AggregationResult> {
        let by_currency: MonetaryFlow = self
            .brl_by_currency(records, rates)?
            .into_iter()
            .map(|(currency, amount)| (currency.code(), amount))
            .collect();
        Ok(self.aggregator.breakdown(&by_currency))
    }

    fn brl_by_currency(
        &self,
        records: &[FlowRecord],
        rates: &CurrencyTotals,
    ) -> Result<CurrencyTotals> {
        let mut converted = CurrencyTotals::new();
        for record in records {
            let rate = self.rate_for(record, rates)?;
            let total = self.record_total(record);
            debug!(
                "Record {} ({:?}): {} {} at rate {}",
                record.id,
                record.kind,
                total,
                self.currency_of(record),
                rate
            );
            *converted.entry(self.currency_of(record)).or_insert(0.0) += total * rate;
        }
        Ok(converted)
    }
}
