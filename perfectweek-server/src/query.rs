//! Query-string conventions shared by every collection route:
//! `field=v`, `field_ne`, `field_lt`, `field_lte`, `field_gt`, `field_gte`,
//! `field_contains`, `field_in`, plus `_sort=field:ASC|DESC`, `_start`,
//! `_limit` (`-1` for no limit) and `_q` for search.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    In,
}

// Longer suffixes first so `_lte` is not read as `_lt`.
const SUFFIXES: &[(&str, Op)] = &[
    ("_contains", Op::Contains),
    ("_lte", Op::Lte),
    ("_gte", Op::Gte),
    ("_lt", Op::Lt),
    ("_gt", Op::Gt),
    ("_ne", Op::Ne),
    ("_in", Op::In),
];

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: Op,
    pub value: String,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            field: field.into(),
            op: Op::Eq,
            value: value.to_string(),
        }
    }

    fn parse(key: &str, value: &str) -> Self {
        for (suffix, op) in SUFFIXES {
            if let Some(field) = key.strip_suffix(suffix) {
                if !field.is_empty() {
                    return Self {
                        field: field.to_string(),
                        op: *op,
                        value: value.to_string(),
                    };
                }
            }
        }
        Self::eq(key, value)
    }

    pub fn matches(&self, record: &Value) -> bool {
        let field = record.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            Op::Eq => compare(field, &self.value) == Some(Ordering::Equal),
            Op::Ne => compare(field, &self.value) != Some(Ordering::Equal),
            Op::Lt => compare(field, &self.value) == Some(Ordering::Less),
            Op::Lte => matches!(
                compare(field, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Op::Gt => compare(field, &self.value) == Some(Ordering::Greater),
            Op::Gte => matches!(
                compare(field, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Op::Contains => text_of(field)
                .to_lowercase()
                .contains(&self.value.to_lowercase()),
            Op::In => self
                .value
                .split(',')
                .any(|candidate| compare(field, candidate.trim()) == Some(Ordering::Equal)),
        }
    }
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sort {
    pub field: String,
    pub order: Order,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub start: usize,
    pub limit: Option<usize>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn parse(params: &HashMap<String, String>, default_limit: usize) -> Result<Self> {
        let mut query = ListQuery {
            limit: Some(default_limit),
            ..Default::default()
        };
        for (key, value) in params {
            match key.as_str() {
                "_q" => query.search = Some(value.clone()),
                "_start" | "_skip" => {
                    query.start = value
                        .parse()
                        .map_err(|_| AppError::BadRequest(format!("Invalid {key} value `{value}`")))?
                }
                "_limit" => {
                    let limit: i64 = value
                        .parse()
                        .map_err(|_| AppError::BadRequest(format!("Invalid _limit value `{value}`")))?;
                    query.limit = usize::try_from(limit).ok();
                }
                "_sort" => query.sort = Some(parse_sort(value)?),
                _ => query.filters.push(Filter::parse(key, value)),
            }
        }
        // HashMap iteration order is arbitrary; keep filters deterministic.
        query.filters.sort_by(|a, b| a.field.cmp(&b.field));
        Ok(query)
    }

    /// No filters and no limit: every row of the table.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn where_eq(field: &str, value: impl ToString) -> Self {
        Self {
            filters: vec![Filter::eq(field, value)],
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }

    /// Sorts, offsets and truncates rows whose JSON form has already been
    /// matched against the filters.
    pub fn page<T>(&self, mut rows: Vec<(Value, T)>) -> Vec<T> {
        if let Some(sort) = &self.sort {
            rows.sort_by(|(a, _), (b, _)| {
                let ordering = compare_values(
                    a.get(&sort.field).unwrap_or(&Value::Null),
                    b.get(&sort.field).unwrap_or(&Value::Null),
                );
                match sort.order {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                }
            });
        }
        rows.into_iter()
            .skip(self.start)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|(_, record)| record)
            .collect()
    }
}

fn parse_sort(value: &str) -> Result<Sort> {
    let (field, order) = value.split_once(':').unwrap_or((value, "ASC"));
    if field.is_empty() {
        return Err(AppError::BadRequest("Missing field in _sort".into()));
    }
    let order = match order.to_ascii_uppercase().as_str() {
        "ASC" => Order::Asc,
        "DESC" => Order::Desc,
        other => return Err(AppError::BadRequest(format!("Unknown sort order `{other}`"))),
    };
    Ok(Sort {
        field: field.to_string(),
        order,
    })
}

pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn compare(field: &Value, raw: &str) -> Option<Ordering> {
    match field {
        Value::Number(n) => n.as_f64()?.partial_cmp(&raw.parse::<f64>().ok()?),
        Value::Null => (raw == "null").then_some(Ordering::Equal),
        other => Some(text_of(other).as_str().cmp(raw)),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => text_of(a).cmp(&text_of(b)),
    }
}
