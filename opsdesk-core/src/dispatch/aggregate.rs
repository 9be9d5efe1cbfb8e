//! Client-side row predicates and aggregation.
//!
//! Everything here runs over rows already returned by the data layer. The
//! output shapes are what the response formatter expects, so a store able to
//! aggregate server-side only has to return rows of the same shape.
//!
//! Any aggregate over zero input rows yields zero output rows.

use crate::data::{date_prefix, value_as_f64, value_as_text, Row};
use chrono::{Datelike, NaiveDate};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// A numeric quantity read from each row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    /// A single numeric field.
    Field(&'static str),
    /// The product of two numeric fields, e.g. quantity times unit price.
    Product(&'static str, &'static str),
}

impl Measure {
    fn read(&self, row: &Row) -> f64 {
        match self {
            Self::Field(f) => number(row, f),
            Self::Product(a, b) => number(row, a) * number(row, b),
        }
    }
}

/// Predicates that compare fields within a row or against the reference day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// `left <= right`, both numeric fields.
    AtMostField(&'static str, &'static str),
    /// The field's text differs from the value.
    NotEqual(&'static str, &'static str),
    /// The reference day lies within `[start, end]`.
    Ongoing { start: &'static str, end: &'static str },
    /// The date field falls in the reference month of any year.
    SameMonth(&'static str),
}

impl Condition {
    /// True if `row` satisfies the condition on `today`.
    pub fn holds(&self, row: &Row, today: NaiveDate) -> bool {
        match self {
            Self::AtMostField(left, right) => {
                match (field_f64(row, left), field_f64(row, right)) {
                    (Some(l), Some(r)) => l <= r,
                    _ => false,
                }
            }
            Self::NotEqual(field, value) => row
                .get(*field)
                .map_or(true, |v| !value_as_text(v).eq_ignore_ascii_case(value)),
            Self::Ongoing { start, end } => {
                match (field_date(row, start), field_date(row, end)) {
                    (Some(s), Some(e)) => s <= today && today <= e,
                    _ => false,
                }
            }
            Self::SameMonth(field) => {
                field_date(row, field).is_some_and(|d| d.month() == today.month())
            }
        }
    }
}

/// How the rows of an operation are reduced before formatting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Rows as returned.
    Rows,
    /// `{total}`: number of rows.
    Count,
    /// `{total, quantidade}`: sum of a measure.
    Sum(Measure),
    /// `{media, quantidade, total}`: mean of a measure.
    Average(Measure),
    /// `{grupo, quantidade}` per distinct value of a field, largest first.
    GroupCount { by: &'static str, limit: Option<usize> },
    /// `{grupo, total}` per distinct value of a field, largest first.
    GroupSum {
        by: &'static str,
        measure: Measure,
        limit: Option<usize>,
    },
    /// Rows ordered by a numeric field, largest first, truncated.
    TopN { by: &'static str, n: usize },
    /// `{receitas, despesas, saldo}` from rows tagged income or expense.
    NetByKind {
        kind: &'static str,
        amount: &'static str,
        income: &'static str,
        expense: &'static str,
    },
    /// `{total, aprovadas, taxa}` where `taxa` is a percentage.
    ConversionRate {
        status: &'static str,
        approved: &'static str,
    },
}

/// Reduce `rows` according to `shape`.
pub fn aggregate(shape: Shape, rows: Vec<Row>) -> Vec<Row> {
    if rows.is_empty() {
        return rows;
    }

    match shape {
        Shape::Rows => rows,
        Shape::Count => vec![object(json!({ "total": rows.len() }))],
        Shape::Sum(measure) => {
            let total: f64 = rows.iter().map(|r| measure.read(r)).sum();
            vec![object(json!({ "total": round2(total), "quantidade": rows.len() }))]
        }
        Shape::Average(measure) => {
            let total: f64 = rows.iter().map(|r| measure.read(r)).sum();
            let media = total / rows.len() as f64;
            vec![object(json!({
                "media": round2(media),
                "quantidade": rows.len(),
                "total": round2(total),
            }))]
        }
        Shape::GroupCount { by, limit } => {
            let groups = group(&rows, by, |_| 1.0);
            ranked(groups, "quantidade", limit, |n| json!(n as u64))
        }
        Shape::GroupSum { by, measure, limit } => {
            let groups = group(&rows, by, |r| measure.read(r));
            ranked(groups, "total", limit, |v| json!(round2(v)))
        }
        Shape::TopN { by, n } => {
            let mut rows = rows;
            rows.sort_by(|a, b| desc(number(a, by), number(b, by)));
            rows.truncate(n);
            rows
        }
        Shape::NetByKind {
            kind,
            amount,
            income,
            expense,
        } => {
            let sum_of = |tag: &str| -> f64 {
                rows.iter()
                    .filter(|r| r.get(kind).is_some_and(|v| value_as_text(v).eq_ignore_ascii_case(tag)))
                    .map(|r| number(r, amount))
                    .sum()
            };
            let receitas = sum_of(income);
            let despesas = sum_of(expense);
            vec![object(json!({
                "receitas": round2(receitas),
                "despesas": round2(despesas),
                "saldo": round2(receitas - despesas),
            }))]
        }
        Shape::ConversionRate { status, approved } => {
            let total = rows.len();
            let aprovadas = rows
                .iter()
                .filter(|r| r.get(status).is_some_and(|v| value_as_text(v).eq_ignore_ascii_case(approved)))
                .count();
            let taxa = aprovadas as f64 * 100.0 / total as f64;
            vec![object(json!({
                "total": total,
                "aprovadas": aprovadas,
                "taxa": round2(taxa),
            }))]
        }
    }
}

/// Keep the rows satisfying every condition.
pub fn retain(rows: Vec<Row>, conditions: &[Condition], today: NaiveDate) -> Vec<Row> {
    if conditions.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|r| conditions.iter().all(|c| c.holds(r, today)))
        .collect()
}

/// Group totals in first-seen order; the sort afterwards is stable.
fn group(rows: &[Row], by: &str, weight: impl Fn(&Row) -> f64) -> Vec<(String, f64)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, f64)> = Vec::new();

    for row in rows {
        let key = row.get(by).map(value_as_text).unwrap_or_default();
        let key = if key.is_empty() { "(sem valor)".to_string() } else { key };
        match index.get(&key) {
            Some(&i) => groups[i].1 += weight(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, weight(row)));
            }
        }
    }
    groups
}

fn ranked(
    mut groups: Vec<(String, f64)>,
    field: &str,
    limit: Option<usize>,
    encode: impl Fn(f64) -> Value,
) -> Vec<Row> {
    groups.sort_by(|a, b| desc(a.1, b.1));
    if let Some(limit) = limit {
        groups.truncate(limit);
    }
    groups
        .into_iter()
        .map(|(grupo, value)| {
            let mut row = Row::new();
            row.insert("grupo".to_string(), Value::String(grupo));
            row.insert(field.to_string(), encode(value));
            row
        })
        .collect()
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn number(row: &Row, field: &str) -> f64 {
    field_f64(row, field).unwrap_or(0.0)
}

fn field_f64(row: &Row, field: &str) -> Option<f64> {
    row.get(field).and_then(value_as_f64)
}

fn field_date(row: &Row, field: &str) -> Option<NaiveDate> {
    row.get(field)
        .and_then(date_prefix)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
