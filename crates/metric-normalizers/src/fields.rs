//! Field readers for untyped provider payloads.
//!
//! Providers disagree on how a value is spelled: a bare number, a numeric
//! string, a `{"raw": .., "fmt": ..}` wrapper, an empty `{}` or `null`. The
//! readers below accept all of those, map the empty forms to `None` and turn
//! anything else into a schema error naming the field.

use chrono::{DateTime, NaiveDate};
use dashboard_core::NormalizeError;
use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// Value under `key`, or `None` when missing, `null` or `{}`.
fn present<'a>(obj: &'a Object, key: &str) -> Option<&'a Value> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(m)) if m.is_empty() => None,
        Some(v) => Some(v),
    }
}

fn type_error(key: &str, expected: &str) -> NormalizeError {
    NormalizeError::schema(format!("field `{key}` is not {expected}"))
}

pub fn parse_number(key: &str, value: &Value) -> Result<Option<f64>, NormalizeError> {
    let n = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim().trim_end_matches('%').replace(',', "");
            if s.is_empty() || s.eq_ignore_ascii_case("none") || s == "-" {
                return Ok(None);
            }
            Some(s.parse::<f64>().map_err(|_| type_error(key, "numeric"))?)
        }
        Value::Object(m) => match m.get("raw") {
            Some(raw) if !raw.is_object() => return parse_number(key, raw),
            None if m.is_empty() => return Ok(None),
            _ => return Err(type_error(key, "numeric")),
        },
        _ => return Err(type_error(key, "numeric")),
    };
    Ok(n.filter(|n| n.is_finite()))
}

pub fn number(obj: &Object, key: &str) -> Result<Option<f64>, NormalizeError> {
    match present(obj, key) {
        Some(v) => parse_number(key, v),
        None => Ok(None),
    }
}

pub fn integer(obj: &Object, key: &str) -> Result<Option<i64>, NormalizeError> {
    Ok(number(obj, key)?.map(|n| n.round() as i64))
}

pub fn unsigned(obj: &Object, key: &str) -> Result<Option<u64>, NormalizeError> {
    match number(obj, key)? {
        Some(n) if n < 0.0 => Err(type_error(key, "a non-negative number")),
        Some(n) => Ok(Some(n.round() as u64)),
        None => Ok(None),
    }
}

pub fn text(obj: &Object, key: &str) -> Result<Option<String>, NormalizeError> {
    let value = match present(obj, key) {
        Some(Value::Object(m)) => match m.get("fmt").or_else(|| m.get("raw")) {
            Some(inner) => inner,
            None => return Err(type_error(key, "text")),
        },
        Some(v) => v,
        None => return Ok(None),
    };

    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(type_error(key, "text")),
    }
}

fn epoch_date(key: &str, secs: i64) -> Result<String, NormalizeError> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .ok_or_else(|| type_error(key, "a valid timestamp"))
}

pub fn parse_date(key: &str, value: &Value) -> Result<Option<String>, NormalizeError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_i64() {
            Some(secs) => epoch_date(key, secs).map(Some),
            None => Err(type_error(key, "a date")),
        },
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Ok(Some(date.format("%Y-%m-%d").to_string()));
            }
            match s.parse::<i64>() {
                Ok(secs) => epoch_date(key, secs).map(Some),
                Err(_) => Err(type_error(key, "a date")),
            }
        }
        Value::Object(m) => match (m.get("raw"), m.get("fmt")) {
            (Some(raw), _) if !raw.is_null() => parse_date(key, raw),
            (_, Some(fmt)) => parse_date(key, fmt),
            _ if m.is_empty() => Ok(None),
            _ => Err(type_error(key, "a date")),
        },
        _ => Err(type_error(key, "a date")),
    }
}

/// Calendar date as `YYYY-MM-DD`, from epoch seconds, an ISO date or a wrapper.
pub fn date(obj: &Object, key: &str) -> Result<Option<String>, NormalizeError> {
    match present(obj, key) {
        Some(v) => parse_date(key, v),
        None => Ok(None),
    }
}

/// Nested object under `key`; absent or empty objects read as `None`.
pub fn object<'a>(obj: &'a Object, key: &str) -> Result<Option<&'a Object>, NormalizeError> {
    match present(obj, key) {
        Some(Value::Object(m)) => Ok(Some(m)),
        Some(_) => Err(type_error(key, "an object")),
        None => Ok(None),
    }
}

/// Array under `key`; absent reads as empty.
pub fn list<'a>(obj: &'a Object, key: &str) -> Result<&'a [Value], NormalizeError> {
    match present(obj, key) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(type_error(key, "a list")),
        None => Ok(&[]),
    }
}

pub fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Object, NormalizeError> {
    value
        .as_object()
        .ok_or_else(|| NormalizeError::schema(format!("{what} is not an object")))
}

/// First entry of a Yahoo-style `{"<root>": {"result": [..], "error": ..}}`
/// envelope. A null or empty result means the ticker has no data.
pub fn first_result<'a>(raw: &'a Value, root: &str) -> Result<&'a Object, NormalizeError> {
    let envelope = as_object(raw, "upstream payload")?;
    let container = object(envelope, root)?
        .ok_or_else(|| NormalizeError::schema(format!("payload has no `{root}` section")))?;

    let first = match container.get("result") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => items.first(),
        Some(_) => return Err(type_error("result", "a list")),
    };

    match first {
        Some(result) => as_object(result, "result entry"),
        None => Err(NormalizeError::Missing),
    }
}
