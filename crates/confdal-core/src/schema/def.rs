use serde::{Deserialize, Serialize};

/// An attribute as described by the record store, before any coercion
/// setup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttributeDef {
    pub name: String,

    /// Type tag, e.g. `u8`, `string`, `date`
    #[serde(rename = "type")]
    pub ty: String,

    /// Raw range: numeric intervals, a pattern or enumerators
    #[serde(default)]
    pub range: Option<String>,

    #[serde(default)]
    pub multivalue: bool,

    #[serde(default)]
    pub not_null: bool,

    /// Raw initial value; comma separated for multivalue attributes
    #[serde(default)]
    pub init_value: Option<String>,

    #[serde(default)]
    pub description: String,
}

/// A relation as described by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelationDef {
    pub name: String,

    /// Name of the target class
    #[serde(rename = "type")]
    pub class: String,

    #[serde(default)]
    pub multivalue: bool,

    #[serde(default)]
    pub not_null: bool,

    /// True if the relation owns its target
    #[serde(default)]
    pub aggregation: bool,

    #[serde(default)]
    pub description: String,
}
