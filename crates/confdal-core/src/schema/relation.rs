use super::RelationDef;
use crate::driver::Accessor;

/// A relation of a class, with its object accessors bound.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSpec {
    pub name: String,

    /// Name of the target class
    pub class: String,

    pub multivalue: bool,

    pub not_null: bool,

    /// The relation owns its target. Surfaced as metadata only.
    pub aggregation: bool,

    pub description: String,

    pub getter: Accessor,

    pub setter: Accessor,
}

impl RelationSpec {
    pub fn from_def(def: &RelationDef) -> RelationSpec {
        RelationSpec {
            name: def.name.clone(),
            class: def.class.clone(),
            multivalue: def.multivalue,
            not_null: def.not_null,
            aggregation: def.aggregation,
            description: def.description.clone(),
            getter: Accessor::object(def.multivalue),
            setter: Accessor::object(def.multivalue),
        }
    }

    pub fn cardinality(&self) -> &'static str {
        super::cardinality(self.multivalue, self.not_null)
    }
}
