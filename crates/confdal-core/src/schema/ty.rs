use crate::{Error, Result, Value};
use std::fmt;

/// Semantic type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Bool,
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    S64,
    U64,
    Float,
    Double,
    String,
    Enum,
    Uid,
    /// Reference to a class by name
    Class,
    Date,
    /// Date and time of day
    Time,
}

/// Coarse grouping of attribute types, deciding how raw values coerce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Bool,
    Integer,
    Float,
    String,
}

impl AttributeType {
    /// Parses the store's type tag.
    pub fn from_tag(tag: &str) -> Result<AttributeType> {
        Ok(match tag {
            "bool" => Self::Bool,
            "s8" => Self::S8,
            "u8" => Self::U8,
            "s16" => Self::S16,
            "u16" => Self::U16,
            "s32" => Self::S32,
            "u32" => Self::U32,
            "s64" => Self::S64,
            "u64" => Self::U64,
            "float" => Self::Float,
            "double" => Self::Double,
            "string" => Self::String,
            "enum" => Self::Enum,
            "uid" => Self::Uid,
            "class" => Self::Class,
            "date" => Self::Date,
            "time" => Self::Time,
            _ => return Err(Error::invalid_schema(format!("unknown attribute type `{tag}`"))),
        })
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::S8 => "s8",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::U16 => "u16",
            Self::S32 => "s32",
            Self::U32 => "u32",
            Self::S64 => "s64",
            Self::U64 => "u64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Enum => "enum",
            Self::Uid => "uid",
            Self::Class => "class",
            Self::Date => "date",
            Self::Time => "time",
        }
    }

    pub fn category(self) -> Category {
        match self {
            Self::Bool => Category::Bool,
            Self::S8
            | Self::U8
            | Self::S16
            | Self::U16
            | Self::S32
            | Self::U32
            | Self::S64
            | Self::U64 => Category::Integer,
            Self::Float | Self::Double => Category::Float,
            _ => Category::String,
        }
    }

    pub fn is_string_like(self) -> bool {
        self.category() == Category::String
    }

    /// The closed interval representable by an integer type.
    pub fn int_bounds(self) -> Option<(i128, i128)> {
        Some(match self {
            Self::S8 => (i8::MIN.into(), i8::MAX.into()),
            Self::U8 => (0, u8::MAX.into()),
            Self::S16 => (i16::MIN.into(), i16::MAX.into()),
            Self::U16 => (0, u16::MAX.into()),
            Self::S32 => (i32::MIN.into(), i32::MAX.into()),
            Self::U32 => (0, u32::MAX.into()),
            Self::S64 => (i64::MIN.into(), i64::MAX.into()),
            Self::U64 => (0, u64::MAX.into()),
            _ => return None,
        })
    }

    /// The largest finite value of a float type.
    pub fn float_max(self) -> Option<f64> {
        match self {
            Self::Float => Some(f32::MAX.into()),
            Self::Double => Some(f64::MAX),
            _ => None,
        }
    }

    /// Narrows an in-bounds integer to this type's value variant.
    pub(crate) fn int_value(self, v: i128) -> Option<Value> {
        Some(match self {
            Self::S8 => Value::I8(v.try_into().ok()?),
            Self::U8 => Value::U8(v.try_into().ok()?),
            Self::S16 => Value::I16(v.try_into().ok()?),
            Self::U16 => Value::U16(v.try_into().ok()?),
            Self::S32 => Value::I32(v.try_into().ok()?),
            Self::U32 => Value::U32(v.try_into().ok()?),
            Self::S64 => Value::I64(v.try_into().ok()?),
            Self::U64 => Value::U64(v.try_into().ok()?),
            _ => return None,
        })
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
