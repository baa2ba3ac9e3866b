//! # Filter Expressions
//!
//! Interprets query parameters for the in-memory backend. A parameter
//! value may carry an operator prefix (`gt.18`, `in.(a,b)`, `is.null`);
//! without one the comparison is equality.

use serde_json::{Number, Value};

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// `%` any run, `_` any single character
    Like,
    In,
    /// `is.null` / `is.notnull`
    Is,
}

impl FilterOperator {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "eq" => Some(FilterOperator::Eq),
            "neq" => Some(FilterOperator::Neq),
            "gt" => Some(FilterOperator::Gt),
            "gte" => Some(FilterOperator::Gte),
            "lt" => Some(FilterOperator::Lt),
            "lte" => Some(FilterOperator::Lte),
            "like" => Some(FilterOperator::Like),
            "in" => Some(FilterOperator::In),
            "is" => Some(FilterOperator::Is),
            _ => None,
        }
    }
}

/// A filter expression
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl FilterExpr {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Parse `field=raw` where `raw` may start with an operator prefix
    pub fn parse(field: &str, raw: &str) -> Self {
        if let Some((prefix, rest)) = raw.split_once('.') {
            if let Some(operator) = FilterOperator::from_prefix(prefix) {
                let value = match operator {
                    FilterOperator::Is => parse_is_value(rest),
                    _ => parse_filter_value(rest),
                };
                return Self::new(field, operator, value);
            }
        }

        Self::new(field, FilterOperator::Eq, parse_filter_value(raw))
    }

    /// Check if a document matches this filter
    pub fn matches(&self, doc: &Value) -> bool {
        let field_value = match doc.get(&self.field) {
            Some(v) => v,
            None => return self.operator == FilterOperator::Is && self.value.is_null(),
        };

        match self.operator {
            FilterOperator::Eq => loosely_equal(field_value, &self.value),
            FilterOperator::Neq => !loosely_equal(field_value, &self.value),
            FilterOperator::Gt => compare_json_values(field_value, &self.value) > 0,
            FilterOperator::Gte => compare_json_values(field_value, &self.value) >= 0,
            FilterOperator::Lt => compare_json_values(field_value, &self.value) < 0,
            FilterOperator::Lte => compare_json_values(field_value, &self.value) <= 0,
            FilterOperator::Like => match (field_value.as_str(), self.value.as_str()) {
                (Some(text), Some(pattern)) => matches_like_pattern(text, pattern),
                _ => false,
            },
            FilterOperator::In => self
                .value
                .as_array()
                .map(|items| items.iter().any(|item| loosely_equal(field_value, item)))
                .unwrap_or(false),
            FilterOperator::Is => {
                if self.value.is_null() {
                    field_value.is_null()
                } else {
                    !field_value.is_null()
                }
            }
        }
    }
}

/// `null` matches missing/null, anything else means "not null"
fn parse_is_value(raw: &str) -> Value {
    if raw == "null" {
        Value::Null
    } else {
        Value::Bool(true)
    }
}

/// Parse a filter value (handles lists for the `in` operator)
fn parse_filter_value(value: &str) -> Value {
    if let Some(inner) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return Value::Array(
            inner
                .split(',')
                .map(|item| parse_scalar(item.trim()))
                .collect(),
        );
    }

    parse_scalar(value)
}

fn parse_scalar(value: &str) -> Value {
    match value {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(num) = value.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(num);
    }

    Value::String(value.to_string())
}

/// Equality that tolerates the string/number split of query strings
fn loosely_equal(field: &Value, wanted: &Value) -> bool {
    if field == wanted {
        return true;
    }
    match (field, wanted) {
        (Value::String(s), other) | (other, Value::String(s)) => match other {
            Value::Number(n) => s == &n.to_string(),
            Value::Bool(b) => s == &b.to_string(),
            _ => false,
        },
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => false,
    }
}

/// Compare two JSON values for ordering
fn compare_json_values(a: &Value, b: &Value) -> i32 {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a_f = a.as_f64().unwrap_or(0.0);
            let b_f = b.as_f64().unwrap_or(0.0);
            if a_f < b_f {
                -1
            } else if a_f > b_f {
                1
            } else {
                0
            }
        }
        (Value::String(a), Value::String(b)) => a.cmp(b) as i32,
        _ => 0,
    }
}

/// SQL LIKE over characters.
///
/// Greedy two-pointer match: on a mismatch, retry from the most recent
/// `%` with one more character consumed. Worst case O(n * m).
fn matches_like_pattern(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut v, mut p) = (0, 0);
    // Pattern index after the last `%`, and the value index it resumed at
    let mut resume: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some(&'%') => {
                while pattern.get(p) == Some(&'%') {
                    p += 1;
                }
                resume = Some((p, v));
            }
            Some(&c) if c == '_' || c == value[v] => {
                p += 1;
                v += 1;
            }
            _ => match resume {
                Some((after_wildcard, start)) => {
                    p = after_wildcard;
                    v = start + 1;
                    resume = Some((after_wildcard, v));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}
