use crate::schema::MonetaryFlow;
use chrono::{Datelike, Local};
use std::cmp::Ordering;

/// Returns the calendar year a period key starts with.
///
/// # Examples
/// - `"2024"` -> `Some(2024)`
/// - `"2024/25"` -> `Some(2024)` (harvest naming)
/// - `"20245"` or `"safra-2024"` -> `None`
pub fn period_year(key: &str) -> Option<i32> {
    let key = key.trim();
    let digits = key.get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // "20245" is not a year followed by a suffix
    if key[4..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn compare_period_keys(a: &str, b: &str) -> Ordering {
    match (period_year(a), period_year(b)) {
        (Some(ya), Some(yb)) => ya.cmp(&yb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Year keys first in ascending year order, then all other keys lexically.
pub fn sort_period_keys(keys: &mut [&str]) {
    keys.sort_by(|a, b| compare_period_keys(a, b));
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// Key for the next year a year/value editor should offer: one past the
/// latest year already in the flow, or the current year for a flow with no
/// year keys.
pub fn next_year_key(flow: &MonetaryFlow) -> String {
    flow.iter()
        .filter_map(|(key, _)| period_year(key))
        .max()
        .map(|year| year + 1)
        .unwrap_or_else(current_year)
        .to_string()
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Inserts `separator` every three digits of an unsigned integer string.
pub fn group_thousands(digits: &str, separator: char) -> String {
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(separator);
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_year() {
        assert_eq!(period_year("2024"), Some(2024));
        assert_eq!(period_year("2024/25"), Some(2024));
        assert_eq!(period_year(" 2023 "), Some(2023));
        assert_eq!(period_year("20245"), None);
        assert_eq!(period_year("safra-2024"), None);
        assert_eq!(period_year("abc"), None);
        assert_eq!(period_year(""), None);
    }

    #[test]
    fn test_sort_period_keys_years_first() {
        let mut keys = vec![
            "b9f1c2e0-uuid",
            "2026",
            "2024/25",
            "2025",
            "a0000000-uuid",
            "2024",
        ];
        sort_period_keys(&mut keys);
        assert_eq!(
            keys,
            vec![
                "2024",
                "2024/25",
                "2025",
                "2026",
                "a0000000-uuid",
                "b9f1c2e0-uuid"
            ]
        );
    }

    #[test]
    fn test_next_year_key() {
        let flow: MonetaryFlow = [("2024", 10.0), ("2027", 5.0), ("safra-x", 1.0)]
            .into_iter()
            .collect();
        assert_eq!(next_year_key(&flow), "2028");

        let no_years: MonetaryFlow = [("safra-x", 1.0)].into_iter().collect();
        assert_eq!(next_year_key(&no_years), current_year().to_string());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("0", '.'), "0");
        assert_eq!(group_thousands("999", '.'), "999");
        assert_eq!(group_thousands("1500", '.'), "1.500");
        assert_eq!(group_thousands("1234567", ','), "1,234,567");
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(66.666), 66.7);
        assert_eq!(round_to_tenth(33.333), 33.3);
        assert_eq!(round_to_tenth(0.0), 0.0);
    }
}
