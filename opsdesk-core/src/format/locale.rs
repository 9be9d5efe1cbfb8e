//! Number and date formatting.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Currency and separator symbols. Defaults are pt-BR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: String,
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: String,
}

fn default_currency_symbol() -> String {
    "R$".to_string()
}

fn default_decimal_separator() -> String {
    ",".to_string()
}

fn default_thousands_separator() -> String {
    ".".to_string()
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            decimal_separator: default_decimal_separator(),
            thousands_separator: default_thousands_separator(),
        }
    }
}

impl Locale {
    /// `R$ 1.234,56`
    pub fn money(&self, value: f64) -> String {
        format!("{} {}", self.currency_symbol, self.decimal(value, 2))
    }

    /// Fixed decimals with grouped thousands: `1.234,5`.
    pub fn decimal(&self, value: f64, decimals: usize) -> String {
        let value = if value.is_finite() { value } else { 0.0 };
        let text = format!("{:.*}", decimals, value.abs());
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (text.as_str(), None),
        };

        let mut grouped = String::new();
        for (i, digit) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push_str(&self.thousands_separator);
            }
            grouped.push(digit);
        }

        let negative = value < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0');
        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&grouped);
        if let Some(frac) = frac_part {
            out.push_str(&self.decimal_separator);
            out.push_str(frac);
        }
        out
    }

    /// Integer with grouped thousands.
    pub fn integer(&self, value: f64) -> String {
        self.decimal(value.round(), 0)
    }

    /// `37,5%`
    pub fn percent(&self, value: f64) -> String {
        format!("{}%", self.decimal(value, 1))
    }

    /// `dd/mm/yyyy` from an ISO date or datetime. Unparseable input is
    /// returned unchanged.
    pub fn date(&self, raw: &str) -> String {
        match parse_date(raw) {
            Some(date) => date.format("%d/%m/%Y").to_string(),
            None => raw.to_string(),
        }
    }

    /// `HH:MM` from an ISO datetime or a bare time.
    pub fn time(&self, raw: &str) -> String {
        match parse_time(raw) {
            Some(time) => time.format("%H:%M").to_string(),
            None => raw.to_string(),
        }
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date()).or_else(|| {
        raw.trim()
            .get(..10)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    })
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    parse_datetime(raw).map(|dt| dt.time()).or_else(|| {
        ["%H:%M:%S", "%H:%M"]
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(raw.trim(), fmt).ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money() {
        let locale = Locale::default();
        assert_eq!(locale.money(1234.56), "R$ 1.234,56");
        assert_eq!(locale.money(0.5), "R$ 0,50");
        assert_eq!(locale.money(1_000_000.0), "R$ 1.000.000,00");
        assert_eq!(locale.money(-42.1), "R$ -42,10");
        assert_eq!(locale.money(-0.001), "R$ 0,00");
    }

    #[test]
    fn test_custom_symbols() {
        let locale = Locale {
            currency_symbol: "US$".into(),
            decimal_separator: ".".into(),
            thousands_separator: ",".into(),
        };
        assert_eq!(locale.money(9876.5), "US$ 9,876.50");
    }

    #[test]
    fn test_percent_and_integer() {
        let locale = Locale::default();
        assert_eq!(locale.percent(37.5), "37,5%");
        assert_eq!(locale.integer(12345.0), "12.345");
    }

    #[test]
    fn test_dates_and_times() {
        let locale = Locale::default();
        assert_eq!(locale.date("2026-10-19"), "19/10/2026");
        assert_eq!(locale.date("2026-10-19T14:30:00"), "19/10/2026");
        assert_eq!(locale.date("2026-10-19T14:30:00-03:00"), "19/10/2026");
        assert_eq!(locale.date("ontem"), "ontem");
        assert_eq!(locale.time("2026-10-19T08:05:00"), "08:05");
        assert_eq!(locale.time("17:45"), "17:45");
    }
}
