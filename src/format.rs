use crate::schema::CurrencyCode;
use crate::utils::group_thousands;

/// Renders an amount in a currency for display.
pub trait CurrencyFormatter {
    fn format(&self, amount: f64, currency: CurrencyCode) -> String;
}

impl<F: Fn(f64, CurrencyCode) -> String> CurrencyFormatter for F {
    fn format(&self, amount: f64, currency: CurrencyCode) -> String {
        self(amount, currency)
    }
}

/// Locale conventions used by the farm screens: pt-BR grouping for BRL and
/// EUR, en-US grouping for USD, and a plain fixed-point number with the
/// "sacas" unit for SOJA.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleFormatter;

impl LocaleFormatter {
    fn split(amount: f64) -> (bool, String, String) {
        let fixed = format!("{:.2}", amount.abs());
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        // -0.001 renders as 0,00 with no sign
        let negative = amount < 0.0 && fixed != "0.00";
        (negative, int_part.to_string(), frac_part.to_string())
    }
}

impl CurrencyFormatter for LocaleFormatter {
    fn format(&self, amount: f64, currency: CurrencyCode) -> String {
        let (negative, int_part, frac_part) = Self::split(amount);
        let sign = if negative { "-" } else { "" };

        if currency.is_commodity() {
            return format!("{}{}.{} sacas", sign, int_part, frac_part);
        }

        match currency {
            CurrencyCode::Usd => format!(
                "{}${}.{}",
                sign,
                group_thousands(&int_part, ','),
                frac_part
            ),
            CurrencyCode::Eur => format!(
                "{}€ {},{}",
                sign,
                group_thousands(&int_part, '.'),
                frac_part
            ),
            _ => format!(
                "{}R$ {},{}",
                sign,
                group_thousands(&int_part, '.'),
                frac_part
            ),
        }
    }
}

/// Percentage with one decimal place and a decimal comma, e.g. `66,7%`.
pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent).replace('.', ",")
}
