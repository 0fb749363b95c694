use super::{AttributeType, Category};
use crate::{coerce, Error, Result};

use regex::Regex;
use std::{fmt, sync::OnceLock};

/// One member of a numeric range: a discrete point or a closed interval.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeItem<T> {
    Point(T),
    Interval(T, T),
}

/// The compiled range constraint of an attribute.
#[derive(Debug, Clone, Default)]
pub enum Range {
    /// No constraint
    #[default]
    Unbounded,

    /// Union of integer points and closed intervals
    Integer(Vec<RangeItem<i128>>),

    /// Union of float points and closed intervals
    Float(Vec<RangeItem<f64>>),

    /// Strings must match the whole pattern
    Pattern(Regex),

    /// Closed set of accepted strings
    Enumerators(Vec<String>),
}

impl<T: PartialOrd> RangeItem<T> {
    pub fn contains(&self, v: &T) -> bool {
        match self {
            RangeItem::Point(p) => v == p,
            RangeItem::Interval(lo, hi) => lo <= v && v <= hi,
        }
    }
}

impl Range {
    /// Compiles the raw range of an attribute of type `ty`.
    ///
    /// Integer types without an explicit range get the closed interval of
    /// their width.
    pub fn compile(ty: AttributeType, src: Option<&str>) -> Result<Range> {
        let src = src.map(str::trim).filter(|src| !src.is_empty());

        let Some(src) = src else {
            return Ok(match ty.int_bounds() {
                Some((min, max)) => Range::Integer(vec![RangeItem::Interval(min, max)]),
                None => Range::Unbounded,
            });
        };

        match (ty, ty.category()) {
            (AttributeType::String, _) => {
                Ok(Range::Pattern(Regex::new(&format!("^(?:{src})$"))?))
            }
            (_, Category::String) => Ok(Range::Enumerators(
                src.split(',').map(|item| item.trim().to_string()).collect(),
            )),
            (_, Category::Integer) => {
                let (_, max) = ty.int_bounds().unwrap_or((i128::MIN, i128::MAX));
                let parse = |bound: &str| {
                    coerce::parse_integer(bound, max).ok_or_else(|| {
                        Error::invalid_schema(format!(
                            "range bound `{bound}` is not a valid {ty} value"
                        ))
                    })
                };
                Ok(Range::Integer(decode_items(src, parse)?))
            }
            (_, Category::Float) => {
                let max = ty.float_max().unwrap_or(f64::MAX);
                let parse = |bound: &str| {
                    coerce::parse_float(bound, max).ok_or_else(|| {
                        Error::invalid_schema(format!(
                            "range bound `{bound}` is not a valid {ty} value"
                        ))
                    })
                };
                Ok(Range::Float(decode_items(src, parse)?))
            }
            (_, Category::Bool) => Ok(Range::Unbounded),
        }
    }

    pub fn contains_int(&self, v: i128) -> bool {
        match self {
            Range::Integer(items) => items.iter().any(|item| item.contains(&v)),
            _ => true,
        }
    }

    pub fn contains_float(&self, v: f64) -> bool {
        match self {
            Range::Float(items) => items.iter().any(|item| item.contains(&v)),
            _ => true,
        }
    }

    pub fn contains_str(&self, v: &str) -> bool {
        match self {
            Range::Pattern(pattern) => pattern.is_match(v),
            Range::Enumerators(items) => items.iter().any(|item| item == v),
            _ => true,
        }
    }
}

/// Splits a comma separated range into items. Each item is `lo..hi`,
/// `lo-hi` or a single value.
fn decode_items<T>(src: &str, parse: impl Fn(&str) -> Result<T>) -> Result<Vec<RangeItem<T>>> {
    static SHORTHAND: OnceLock<Regex> = OnceLock::new();
    let shorthand = SHORTHAND.get_or_init(|| {
        Regex::new(r"^(-?0?x?[\da-fA-F]+(?:\.\d+)?)-(-?0?x?[\da-fA-F]+(?:\.\d+)?)$")
            .expect("range shorthand pattern is valid")
    });

    src.split(',')
        .map(str::trim)
        .map(|item| {
            if let Some((lo, hi)) = item.split_once("..") {
                Ok(RangeItem::Interval(parse(lo.trim())?, parse(hi.trim())?))
            } else if let Some(caps) = shorthand.captures(item) {
                Ok(RangeItem::Interval(parse(&caps[1])?, parse(&caps[2])?))
            } else {
                Ok(RangeItem::Point(parse(item)?))
            }
        })
        .collect()
}

impl<T: fmt::Display> fmt::Display for RangeItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeItem::Point(p) => write!(f, "{p}"),
            RangeItem::Interval(lo, hi) => write!(f, "{lo}..{hi}"),
        }
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Unbounded => f.write_str("*"),
            Range::Integer(items) => join(f, items),
            Range::Float(items) => join(f, items),
            Range::Pattern(pattern) => {
                let src = pattern.as_str();
                let src = src
                    .strip_prefix("^(?:")
                    .and_then(|src| src.strip_suffix(")$"))
                    .unwrap_or(src);
                write!(f, "/{src}/")
            }
            Range::Enumerators(items) => join(f, items),
        }
    }
}
