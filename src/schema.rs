use crate::error::FlowError;
use crate::utils::sort_period_keys;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[schemars(description = "Brazilian real. Default when a record carries no currency.")]
    #[default]
    Brl,

    #[schemars(description = "United States dollar.")]
    Usd,

    #[schemars(description = "Euro.")]
    Eur,

    #[schemars(
        description = "Quantity of soybean sacks rather than fiat money. Rendered as a plain number with the 'sacas' unit."
    )]
    Soja,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 4] = [
        CurrencyCode::Brl,
        CurrencyCode::Usd,
        CurrencyCode::Eur,
        CurrencyCode::Soja,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            CurrencyCode::Brl => "BRL",
            CurrencyCode::Usd => "USD",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Soja => "SOJA",
        }
    }

    /// `true` for commodity quantities, which have no currency symbol.
    pub fn is_commodity(&self) -> bool {
        matches!(self, CurrencyCode::Soja)
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        CurrencyCode::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| FlowError::UnsupportedCurrency(s.to_string()))
    }
}

/// How entry values that are not JSON numbers are treated during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Only JSON numbers count. Strings, null, booleans and nested values become 0.
    #[default]
    Strict,

    /// Like `Strict`, but strings holding a finite decimal number (e.g. `"150.5"`) are parsed.
    CoerceNumericStrings,
}

/// Amounts distributed across period keys (harvest ids or years).
///
/// Every key holds exactly one finite amount. Iteration follows the map's
/// lexical key order, which is not a chronological guarantee; use
/// [`MonetaryFlow::keys_chronological`] for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MonetaryFlow {
    entries: BTreeMap<String, f64>,
}

impl MonetaryFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `amount` under `key`, replacing any previous amount.
    /// Non-finite amounts are stored as 0.
    pub fn insert(&mut self, key: impl Into<String>, amount: f64) -> Option<f64> {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        self.entries.insert(key.into(), amount)
    }

    /// Adds `amount` to whatever is already stored under `key`.
    pub fn accumulate(&mut self, key: impl Into<String>, amount: f64) {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        *self.entries.entry(key.into()).or_insert(0.0) += amount;
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.get(key).copied()
    }

    pub fn remove(&mut self, key: &str) -> Option<f64> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn entries(&self) -> &BTreeMap<String, f64> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, f64> {
        self.entries
    }

    pub fn keys_chronological(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        sort_period_keys(&mut keys);
        keys
    }

    /// Native JSON mapping, as the persistence layer stores it.
    pub fn to_json_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(*v)))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MonetaryFlow {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut flow = MonetaryFlow::new();
        for (key, amount) in iter {
            flow.insert(key, amount);
        }
        flow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeyShare {
    pub amount: f64,
    /// Share of the flow total in percent, one decimal place. 0 when the total is not positive.
    pub percent_of_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AggregationResult {
    pub total: f64,
    pub by_key: BTreeMap<String, KeyShare>,
}

impl AggregationResult {
    /// Shares ordered year-first for display.
    pub fn chronological(&self) -> Vec<(&str, &KeyShare)> {
        let mut keys: Vec<&str> = self.by_key.keys().map(String::as_str).collect();
        sort_period_keys(&mut keys);
        keys.into_iter()
            .filter_map(|k| self.by_key.get(k).map(|share| (k, share)))
            .collect()
    }

    pub fn percent_sum(&self) -> f64 {
        self.by_key.values().map(|s| s.percent_of_total).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    BankDebt,
    PropertyDebt,
    LandDebt,
    Lease,
    Projection,
    Other,
}

/// A persisted parent record reduced to what aggregation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlowRecord {
    #[schemars(description = "Identifier of the parent record.")]
    pub id: String,

    pub kind: RecordKind,

    #[schemars(description = "Currency of every amount in the flow. Missing means the configured default (BRL).")]
    #[serde(default)]
    pub currency: Option<CurrencyCode>,

    #[schemars(description = "Harvest the record belongs to, used for grouping.")]
    #[serde(default)]
    pub harvest: Option<String>,

    #[schemars(
        description = "Exchange rate to BRL agreed at contract time. Overrides the configured rate table."
    )]
    #[serde(default)]
    pub contract_rate: Option<f64>,

    #[schemars(
        description = "Period-key to amount mapping, either as a JSON object or as JSON text."
    )]
    #[serde(default)]
    pub flow: Value,
}

impl FlowRecord {
    pub fn new(id: impl Into<String>, kind: RecordKind, flow: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            kind,
            currency: None,
            harvest: None,
            contract_rate: None,
            flow: flow.into(),
        }
    }

    pub fn with_currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn with_harvest(mut self, harvest: impl Into<String>) -> Self {
        self.harvest = Some(harvest.into());
        self
    }

    pub fn with_contract_rate(mut self, rate: f64) -> Self {
        self.contract_rate = Some(rate);
        self
    }
}

/// Bucket used when grouping records by harvest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    /// Every record, regardless of harvest.
    All,
    Harvest(String),
    /// Records with no harvest.
    Ungrouped,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => f.write_str("all"),
            GroupKey::Harvest(id) => f.write_str(id),
            GroupKey::Ungrouped => f.write_str("no-harvest"),
        }
    }
}

/// JSON Schema of a persisted [`FlowRecord`].
pub fn flow_record_schema() -> RootSchema {
    schemars::schema_for!(FlowRecord)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_parsing() {
        assert_eq!("brl".parse::<CurrencyCode>().unwrap(), CurrencyCode::Brl);
        assert_eq!(" SOJA ".parse::<CurrencyCode>().unwrap(), CurrencyCode::Soja);
        assert_eq!("Usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::Usd);

        let err = "GBP".parse::<CurrencyCode>().unwrap_err();
        assert!(matches!(err, FlowError::UnsupportedCurrency(ref c) if c == "GBP"));
    }

    #[test]
    fn test_every_code_round_trips_through_parsing() {
        for currency in CurrencyCode::ALL {
            assert_eq!(currency.code().parse::<CurrencyCode>().unwrap(), currency);
        }
        let commodities: Vec<_> = CurrencyCode::ALL
            .into_iter()
            .filter(CurrencyCode::is_commodity)
            .collect();
        assert_eq!(commodities, vec![CurrencyCode::Soja]);
    }

    #[test]
    fn test_currency_code_serde_uses_upper_case_codes() {
        let json = serde_json::to_string(&CurrencyCode::Soja).unwrap();
        assert_eq!(json, "\"SOJA\"");

        let parsed: CurrencyCode = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(parsed, CurrencyCode::Eur);
    }

    #[test]
    fn test_insert_replaces_non_finite_with_zero() {
        let mut flow = MonetaryFlow::new();
        flow.insert("2024", f64::NAN);
        flow.insert("2025", f64::INFINITY);
        flow.insert("2026", 12.5);

        assert_eq!(flow.get("2024"), Some(0.0));
        assert_eq!(flow.get("2025"), Some(0.0));
        assert_eq!(flow.get("2026"), Some(12.5));
    }

    #[test]
    fn test_accumulate_sums_per_key() {
        let mut flow = MonetaryFlow::new();
        flow.accumulate("2024", 100.0);
        flow.accumulate("2024", 50.0);
        flow.accumulate("2025", 10.0);

        assert_eq!(flow.get("2024"), Some(150.0));
        assert_eq!(flow.get("2025"), Some(10.0));
        assert_eq!(flow.len(), 2);
    }

    #[test]
    fn test_remove_drops_the_period() {
        let mut flow: MonetaryFlow = [("2024", 100.0), ("2025", 50.0)].into_iter().collect();
        assert_eq!(flow.remove("2024"), Some(100.0));
        assert_eq!(flow.remove("2024"), None);
        assert_eq!(flow.len(), 1);
        assert_eq!(flow.get("2025"), Some(50.0));
    }

    #[test]
    fn test_flow_serializes_as_plain_object() {
        let flow: MonetaryFlow = [("2024", 100.0), ("2025", 200.5)].into_iter().collect();
        let json = serde_json::to_string(&flow).unwrap();
        assert_eq!(json, r#"{"2024":100.0,"2025":200.5}"#);
        assert_eq!(flow.to_json_value(), serde_json::json!({"2024": 100.0, "2025": 200.5}));
    }

    #[test]
    fn test_flow_record_deserializes_with_defaults() {
        let record: FlowRecord =
            serde_json::from_str(r#"{"id": "d1", "kind": "bank_debt"}"#).unwrap();
        assert_eq!(record.kind, RecordKind::BankDebt);
        assert!(record.currency.is_none());
        assert!(record.harvest.is_none());
        assert!(record.flow.is_null());
    }

    #[test]
    fn test_group_key_ordering_and_labels() {
        let mut keys = vec![
            GroupKey::Ungrouped,
            GroupKey::Harvest("safra-1".to_string()),
            GroupKey::All,
        ];
        keys.sort();
        assert_eq!(keys[0], GroupKey::All);
        assert_eq!(keys[2], GroupKey::Ungrouped);
        assert_eq!(GroupKey::Ungrouped.to_string(), "no-harvest");
    }

    #[test]
    fn test_flow_record_schema_names_fields() {
        let schema = serde_json::to_value(flow_record_schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("flow").is_some());
        assert!(properties.get("currency").is_some());
        assert!(properties.get("contract_rate").is_some());
    }
}
