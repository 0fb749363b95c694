use crate::schema::AttributeType;

/// Selects which typed store accessor reads or writes a field.
///
/// Attributes of the string family (strings, enumerators, dates, times,
/// uids and class references) are all read through the string getter but
/// written through a setter specific to their type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Accessor {
    pub kind: AccessorKind,

    /// True for the sequence flavor of the accessor
    pub multi: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
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
    Class,
    Date,
    Time,
    Object,
}

impl Accessor {
    pub const fn new(kind: AccessorKind, multi: bool) -> Accessor {
        Accessor { kind, multi }
    }

    pub fn getter(ty: AttributeType, multi: bool) -> Accessor {
        if ty.is_string_like() {
            Accessor::new(AccessorKind::String, multi)
        } else {
            Accessor::setter(ty, multi)
        }
    }

    pub fn setter(ty: AttributeType, multi: bool) -> Accessor {
        let kind = match ty {
            AttributeType::Bool => AccessorKind::Bool,
            AttributeType::S8 => AccessorKind::S8,
            AttributeType::U8 => AccessorKind::U8,
            AttributeType::S16 => AccessorKind::S16,
            AttributeType::U16 => AccessorKind::U16,
            AttributeType::S32 => AccessorKind::S32,
            AttributeType::U32 => AccessorKind::U32,
            AttributeType::S64 => AccessorKind::S64,
            AttributeType::U64 => AccessorKind::U64,
            AttributeType::Float => AccessorKind::Float,
            AttributeType::Double => AccessorKind::Double,
            AttributeType::String => AccessorKind::String,
            AttributeType::Enum => AccessorKind::Enum,
            AttributeType::Uid => AccessorKind::Uid,
            AttributeType::Class => AccessorKind::Class,
            AttributeType::Date => AccessorKind::Date,
            AttributeType::Time => AccessorKind::Time,
        };
        Accessor::new(kind, multi)
    }

    /// Accessor for single (`get_obj`) or multi (`get_objs`) relations.
    pub const fn object(multi: bool) -> Accessor {
        Accessor::new(AccessorKind::Object, multi)
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, AccessorKind::Object)
    }
}
