use super::DalObject;
use confdal_core::Value;

use std::fmt;

/// The value of an object's field.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Field {
    /// Not set
    #[default]
    Unset,

    /// Attribute value
    Value(Value),

    /// Target of a single-valued relation
    Object(DalObject),

    /// Targets of a multivalue relation
    Objects(Vec<DalObject>),
}

macro_rules! impl_field_from {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl From<$ty> for Field {
                fn from(src: $ty) -> Field {
                    Field::Value(Value::from(src))
                }
            }

            impl From<Vec<$ty>> for Field {
                fn from(src: Vec<$ty>) -> Field {
                    Field::Value(Value::from(src))
                }
            }
        )*
    };
}

impl_field_from!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, &str);

impl Field {
    /// True for [`Field::Unset`] and null values.
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset | Field::Value(Value::Null))
    }

    pub fn is_objects(&self) -> bool {
        matches!(self, Field::Objects(_))
    }

    /// True for multivalue relation targets and attribute lists.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Field::Objects(_) | Field::Value(Value::List(_)))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&DalObject> {
        match self {
            Field::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_objects(&self) -> Option<&[DalObject]> {
        match self {
            Field::Objects(objects) => Some(objects),
            _ => None,
        }
    }

    /// Every object this field points to.
    pub fn objects(&self) -> Vec<DalObject> {
        match self {
            Field::Object(object) => vec![object.clone()],
            Field::Objects(objects) => objects.clone(),
            _ => vec![],
        }
    }
}

impl From<Value> for Field {
    fn from(src: Value) -> Field {
        Field::Value(src)
    }
}

impl From<DalObject> for Field {
    fn from(src: DalObject) -> Field {
        Field::Object(src)
    }
}

impl From<&DalObject> for Field {
    fn from(src: &DalObject) -> Field {
        Field::Object(src.clone())
    }
}

impl From<Vec<DalObject>> for Field {
    fn from(src: Vec<DalObject>) -> Field {
        Field::Objects(src)
    }
}

impl From<&[DalObject]> for Field {
    fn from(src: &[DalObject]) -> Field {
        Field::Objects(src.to_vec())
    }
}

impl From<Option<DalObject>> for Field {
    fn from(src: Option<DalObject>) -> Field {
        src.map(Field::Object).unwrap_or(Field::Unset)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Unset => f.write_str("<unset>"),
            Field::Value(value) => write!(f, "{value}"),
            Field::Object(object) => write!(f, "<{}>", object.full_name()),
            Field::Objects(objects) => {
                f.write_str("[")?;
                for (i, object) in objects.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "<{}>", object.full_name())?;
                }
                f.write_str("]")
            }
        }
    }
}
