//! Conversion of raw values to the typed values an attribute accepts.
//!
//! Every check is a pure function of the attribute spec and the value. Class
//! reference checks consult the caller through `is_known_class`, since the
//! set of known types lives above this crate.

use crate::{
    error::ValidationErrorKind,
    schema::{AttributeSpec, AttributeType, Category},
    Error, Result, Value,
};

use chrono::{NaiveDate, NaiveDateTime};

/// Accepted date layouts.
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%y", "%Y-%b-%d"];

/// Accepted date and time layouts.
pub const TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%y %H:%M:%S",
    "%Y-%b-%d %H:%M:%S",
];

/// Coerces `value` for the attribute described by `spec`, owned by `object`.
///
/// Cardinality is checked before any element is converted. `Null` unsets a
/// single-valued attribute.
pub fn coerce(
    spec: &AttributeSpec,
    object: &str,
    value: Value,
    is_known_class: &dyn Fn(&str) -> bool,
) -> Result<Value> {
    if value.is_null() && !spec.multivalue {
        return Ok(Value::Null);
    }

    if value.is_list() != spec.multivalue {
        return Err(Error::validation(
            &spec.name,
            object,
            &value,
            ValidationErrorKind::Cardinality {
                multivalue: spec.multivalue,
            },
        ));
    }

    match value {
        Value::List(items) => items
            .into_iter()
            .map(|item| coerce_scalar(spec, object, item, is_known_class))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        value => coerce_scalar(spec, object, value, is_known_class),
    }
}

fn coerce_scalar(
    spec: &AttributeSpec,
    object: &str,
    value: Value,
    is_known_class: &dyn Fn(&str) -> bool,
) -> Result<Value> {
    let reject = |kind| Err(Error::validation(&spec.name, object, &value, kind));
    let cannot_convert = || ValidationErrorKind::Coercion {
        to: spec.ty.tag().into(),
    };
    let out_of_range = |range: String| ValidationErrorKind::Range {
        range: range.into(),
    };

    match spec.ty.category() {
        Category::Bool => {
            let converted = match &value {
                Value::Bool(v) => Some(*v),
                Value::String(v) => parse_bool(v),
                v => v.as_i128().map(|v| v != 0),
            };
            match converted {
                Some(v) => Ok(Value::Bool(v)),
                None => reject(cannot_convert()),
            }
        }
        Category::Integer => {
            let Some((min, max)) = spec.ty.int_bounds() else {
                return reject(cannot_convert());
            };
            let converted = match &value {
                Value::String(v) => parse_integer(v, max),
                Value::Bool(v) => Some(i128::from(*v)),
                Value::F32(_) | Value::F64(_) => value.as_f64().and_then(float_to_integer),
                v => v.as_i128(),
            };
            let Some(v) = converted else {
                return reject(cannot_convert());
            };
            if v < min || v > max {
                return reject(out_of_range(format!("{min}..{max}")));
            }
            if !spec.range().contains_int(v) {
                return reject(out_of_range(spec.range().to_string()));
            }
            match spec.ty.int_value(v) {
                Some(v) => Ok(v),
                None => reject(cannot_convert()),
            }
        }
        Category::Float => {
            let converted = match &value {
                Value::String(v) => parse_float(v, spec.ty.float_max().unwrap_or(f64::MAX)),
                Value::Bool(_) | Value::Null | Value::Record(_) | Value::List(_) => None,
                v => v.as_f64(),
            };
            let Some(v) = converted else {
                return reject(cannot_convert());
            };
            if spec.ty == AttributeType::Float && v.is_finite() && v.abs() > f64::from(f32::MAX) {
                return reject(out_of_range(format!("{}..{}", f32::MIN, f32::MAX)));
            }
            if !spec.range().contains_float(v) {
                return reject(out_of_range(spec.range().to_string()));
            }
            Ok(match spec.ty {
                AttributeType::Float => Value::F32(v as f32),
                _ => Value::F64(v),
            })
        }
        Category::String => {
            let Value::String(v) = &value else {
                return reject(cannot_convert());
            };
            match spec.ty {
                AttributeType::Date if !matches_any(v, &DATE_FORMATS, is_date) => {
                    reject(ValidationErrorKind::Format {
                        accepted: DATE_FORMATS.join(", ").into(),
                    })
                }
                AttributeType::Time if !matches_any(v, &TIME_FORMATS, is_time) => {
                    reject(ValidationErrorKind::Format {
                        accepted: TIME_FORMATS.join(", ").into(),
                    })
                }
                AttributeType::Class if !is_known_class(v) => {
                    reject(ValidationErrorKind::UnknownClass)
                }
                _ if !spec.range().contains_str(v) => reject(out_of_range(spec.range().to_string())),
                _ => Ok(Value::String(v.clone())),
            }
        }
    }
}

/// Parses an integer literal.
///
/// A leading `0` tries octal, then hex; otherwise decimal, then hex. A `0x`
/// prefix is accepted for hex. `*` stands for `max`.
pub fn parse_integer(src: &str, max: i128) -> Option<i128> {
    let src = src.trim();
    if src == "*" {
        return Some(max);
    }

    let (negative, digits) = match src.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, src.strip_prefix('+').unwrap_or(src)),
    };
    if digits.is_empty() || digits.contains(['+', '-']) {
        return None;
    }

    let hex = |digits: &str| {
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        i128::from_str_radix(digits, 16).ok()
    };

    let magnitude = match digits.strip_prefix('0') {
        Some(octal) if !octal.is_empty() => {
            i128::from_str_radix(octal, 8).ok().or_else(|| hex(digits))
        }
        _ => digits.parse::<i128>().ok().or_else(|| hex(digits)),
    }?;

    Some(if negative { -magnitude } else { magnitude })
}

/// Parses a float literal; `*` stands for `max`.
pub fn parse_float(src: &str, max: f64) -> Option<f64> {
    match src.trim() {
        "*" => Some(max),
        src => src.parse().ok(),
    }
}

/// `"0"` and `"false"` are false, the empty string is rejected, anything
/// else is true.
pub fn parse_bool(src: &str) -> Option<bool> {
    match src.trim() {
        "" => None,
        "0" => Some(false),
        src if src.eq_ignore_ascii_case("false") => Some(false),
        _ => Some(true),
    }
}

fn float_to_integer(v: f64) -> Option<i128> {
    (v.is_finite() && v.fract() == 0.0 && v.abs() < 1e38).then_some(v as i128)
}

fn is_date(src: &str, format: &str) -> bool {
    NaiveDate::parse_from_str(src, format).is_ok()
}

fn is_time(src: &str, format: &str) -> bool {
    NaiveDateTime::parse_from_str(src, format).is_ok()
}

fn matches_any(src: &str, formats: &[&str], parse: fn(&str, &str) -> bool) -> bool {
    formats.iter().any(|format| parse(src.trim(), format))
}
