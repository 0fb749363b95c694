use confdal_core::schema::{AttributeDef, RelationDef};

use serde::{Deserialize, Serialize};

/// A schema document: the classes it contributes to every database that
/// includes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassDef {
    pub name: String,

    /// Direct superclasses, in declaration order
    #[serde(default)]
    pub superclasses: Vec<String>,

    /// Own attributes; inherited ones are not repeated
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,

    /// Own relations; inherited ones are not repeated
    #[serde(default)]
    pub relations: Vec<RelationDef>,

    #[serde(default)]
    pub description: String,
}

impl SchemaFile {
    pub fn from_json(src: &str) -> confdal_core::Result<SchemaFile> {
        serde_json::from_str(src).map_err(|err| {
            confdal_core::Error::invalid_schema(format!("malformed schema document: {err}"))
        })
    }
}
