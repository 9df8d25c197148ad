use crate::error::{FlowError, Result};
use crate::schema::{CurrencyCode, NumericPolicy};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct AggregatorConfig {
    #[schemars(
        description = "How entry values that are not JSON numbers are read. Defaults to strict."
    )]
    #[serde(default)]
    pub numeric_policy: NumericPolicy,

    #[schemars(description = "Currency assumed for records that carry none.")]
    #[serde(default)]
    pub default_currency: CurrencyCode,

    #[schemars(
        description = "BRL per unit of each currency (for SOJA, the price of one sack). BRL is always 1."
    )]
    #[serde(default)]
    pub exchange_rates: BTreeMap<CurrencyCode, f64>,
}

impl AggregatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AggregatorConfig = serde_json::from_str(json)?;
        config.validate()?;
        debug!(
            "Loaded aggregator config: policy {:?}, default currency {}, {} exchange rates",
            config.numeric_policy,
            config.default_currency,
            config.exchange_rates.len()
        );
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn with_rate(mut self, currency: CurrencyCode, rate: f64) -> Self {
        self.exchange_rates.insert(currency, rate);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (currency, rate) in &self.exchange_rates {
            validate_rate(*currency, *rate)?;
            if *currency == CurrencyCode::Brl && *rate != 1.0 {
                return Err(FlowError::InvalidConfig(format!(
                    "BRL exchange rate must be 1.0, got {}",
                    rate
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_rate(currency: CurrencyCode, rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(FlowError::InvalidExchangeRate {
            currency: currency.to_string(),
            rate,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AggregatorConfig::from_json_str("{}").unwrap();
        assert_eq!(config.numeric_policy, NumericPolicy::Strict);
        assert_eq!(config.default_currency, CurrencyCode::Brl);
        assert!(config.exchange_rates.is_empty());
    }

    #[test]
    fn test_full_config_parses() {
        let config = AggregatorConfig::from_json_str(
            r#"{
                "numeric_policy": "coerce_numeric_strings",
                "default_currency": "USD",
                "exchange_rates": {"USD": 5.7, "SOJA": 120.0}
            }"#,
        )
        .unwrap();
        assert_eq!(config.numeric_policy, NumericPolicy::CoerceNumericStrings);
        assert_eq!(config.default_currency, CurrencyCode::Usd);
        assert_eq!(config.exchange_rates.get(&CurrencyCode::Usd), Some(&5.7));
        assert_eq!(config.exchange_rates.get(&CurrencyCode::Soja), Some(&120.0));
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        let err = AggregatorConfig::from_json_str(r#"{"exchange_rates": {"USD": 0.0}}"#)
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidExchangeRate { ref currency, .. } if currency == "USD"));

        let err = AggregatorConfig::from_json_str(r#"{"exchange_rates": {"EUR": -6.1}}"#)
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidExchangeRate { .. }));
    }

    #[test]
    fn test_rejects_brl_rate_other_than_one() {
        let err = AggregatorConfig::from_json_str(r#"{"exchange_rates": {"BRL": 2.0}}"#)
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_currency() {
        let err = AggregatorConfig::from_json_str(r#"{"default_currency": "GBP"}"#).unwrap_err();
        assert!(matches!(err, FlowError::SerializationError(_)));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!(
            "flow-aggregator-config-{}.json",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"exchange_rates": {{"USD": 5.0}}}}"#).unwrap();
        drop(file);

        let config = AggregatorConfig::from_file(&path).unwrap();
        assert_eq!(config.exchange_rates.get(&CurrencyCode::Usd), Some(&5.0));
        std::fs::remove_file(&path).unwrap();

        let missing = AggregatorConfig::from_file(&path).unwrap_err();
        assert!(matches!(missing, FlowError::IoError(_)));
    }
}
