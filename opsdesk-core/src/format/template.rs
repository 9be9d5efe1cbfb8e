//! Placeholder interpolation for reply templates.
//!
//! Placeholders are `{name}` or `{name:kind}`:
//! - `{count}`: number of rows
//! - `{pos}`: 1-based position of the current row
//! - `{sum:field}`: money total of `field` over all rows
//! - `{field}`: raw cell text of the current row
//! - `{field:money|int|decimal|percent|date|time}`: formatted cell
//!
//! Missing cells render as `-`. Unterminated braces are copied verbatim.

use super::Locale;
use crate::data::{value_as_f64, value_as_text, Row};

/// What the placeholders of one template can see.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub rows: &'a [Row],
    pub row: Option<&'a Row>,
    pub index: usize,
}

impl<'a> Scope<'a> {
    /// Scope for a header: all rows, no current row.
    pub fn header(rows: &'a [Row]) -> Self {
        Self {
            rows,
            row: None,
            index: 0,
        }
    }

    /// Scope for a single-row figure: the first row is current.
    pub fn figure(rows: &'a [Row]) -> Self {
        Self {
            rows,
            row: rows.first(),
            index: 0,
        }
    }

    /// Scope for the `index`-th item.
    pub fn item(rows: &'a [Row], index: usize) -> Self {
        Self {
            rows,
            row: rows.get(index),
            index,
        }
    }
}

/// Interpolate `template` within `scope`.
pub fn fill(template: &str, scope: Scope<'_>, locale: &Locale) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&resolve(&after[..end], scope, locale));
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve(token: &str, scope: Scope<'_>, locale: &Locale) -> String {
    let (name, kind) = match token.split_once(':') {
        Some((name, kind)) => (name, Some(kind)),
        None => (token, None),
    };

    match (name, kind) {
        ("count", None) => return scope.rows.len().to_string(),
        ("pos", None) => return (scope.index + 1).to_string(),
        ("sum", Some(field)) => {
            let total: f64 = scope
                .rows
                .iter()
                .filter_map(|r| r.get(field).and_then(value_as_f64))
                .sum();
            return locale.money(total);
        }
        _ => {}
    }

    let Some(value) = scope.row.and_then(|r| r.get(name)).filter(|v| !v.is_null()) else {
        return "-".to_string();
    };

    match kind {
        Some("money") => value_as_f64(value).map_or_else(|| value_as_text(value), |v| locale.money(v)),
        Some("int") => value_as_f64(value).map_or_else(|| value_as_text(value), |v| locale.integer(v)),
        Some("decimal") => value_as_f64(value).map_or_else(|| value_as_text(value), |v| locale.decimal(v, 2)),
        Some("percent") => value_as_f64(value).map_or_else(|| value_as_text(value), |v| locale.percent(v)),
        Some("date") => locale.date(&value_as_text(value)),
        Some("time") => locale.time(&value_as_text(value)),
        _ => value_as_text(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            json!({"nome": "Cabo", "valor": 1234.5, "data": "2026-10-19T09:15:00"}),
            json!({"nome": "Fita", "valor": 10}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn test_header_placeholders() {
        let rows = rows();
        let text = fill("{count} itens, total {sum:valor}", Scope::header(&rows), &Locale::default());
        assert_eq!(text, "2 itens, total R$ 1.244,50");
    }

    #[test]
    fn test_item_placeholders() {
        let rows = rows();
        let locale = Locale::default();
        let text = fill(
            "{pos}. {nome} {valor:money} em {data:date} às {data:time}",
            Scope::item(&rows, 0),
            &locale,
        );
        assert_eq!(text, "1. Cabo R$ 1.234,50 em 19/10/2026 às 09:15");

        let text = fill("{nome} {data:date}", Scope::item(&rows, 1), &locale);
        assert_eq!(text, "Fita -");
    }

    #[test]
    fn test_unterminated_brace_is_kept() {
        let rows = rows();
        assert_eq!(fill("oi {nome", Scope::figure(&rows), &Locale::default()), "oi {nome");
    }
}
