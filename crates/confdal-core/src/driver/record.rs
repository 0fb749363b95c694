use std::fmt;

/// Handle to one raw record in the store.
///
/// `class` is the record's own (most derived) class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawRecord {
    pub class: String,
    pub id: String,
}

impl RawRecord {
    pub fn new(class: impl Into<String>, id: impl Into<String>) -> RawRecord {
        RawRecord {
            class: class.into(),
            id: id.into(),
        }
    }

    /// `id@class`, the identity key shared with typed objects.
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.id, self.class)
    }
}

impl fmt::Display for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.class)
    }
}
