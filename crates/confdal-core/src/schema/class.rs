use super::{AttributeSpec, RelationSpec};
use crate::{Driver, Result};

use indexmap::IndexMap;
use std::fmt::{self, Write};

/// Effective schema of one class: its own fields plus every inherited one.
#[derive(Debug, Clone)]
pub struct ClassSchema {
    pub name: String,

    /// Attributes in declaration order, inherited ones included
    pub attributes: IndexMap<String, AttributeSpec>,

    /// Relations in declaration order, inherited ones included
    pub relations: IndexMap<String, RelationSpec>,

    /// Direct superclasses, in declaration order
    pub superclasses: Vec<String>,

    /// Every ancestor
    pub all_superclasses: Vec<String>,

    /// Direct subclasses
    pub subclasses: Vec<String>,

    /// Every descendant
    pub all_subclasses: Vec<String>,
}

/// Renders the cardinality of a field as `min..max`.
pub fn cardinality(multivalue: bool, not_null: bool) -> &'static str {
    match (not_null, multivalue) {
        (false, false) => "0..1",
        (true, false) => "1..1",
        (false, true) => "0..*",
        (true, true) => "1..*",
    }
}

impl ClassSchema {
    /// Reads the schema of `name` from the store and binds every attribute.
    pub fn load(driver: &dyn Driver, name: &str) -> Result<ClassSchema> {
        let mut attributes = IndexMap::new();
        for def in driver.attributes(name, true)? {
            let mut spec = AttributeSpec::from_def(&def)?;
            spec.bind(name)?;
            attributes.insert(spec.name.clone(), spec);
        }

        let relations = driver
            .relations(name, true)?
            .iter()
            .map(|def| (def.name.clone(), RelationSpec::from_def(def)))
            .collect();

        Ok(ClassSchema {
            name: name.to_string(),
            attributes,
            relations,
            superclasses: driver.superclasses(name, false)?,
            all_superclasses: driver.superclasses(name, true)?,
            subclasses: driver.subclasses(name, false)?,
            all_subclasses: driver.subclasses(name, true)?,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.get(name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.relations.contains_key(name)
    }

    /// True if `class` is this class or one of its ancestors.
    pub fn is_a(&self, class: &str) -> bool {
        self.name == class || self.all_superclasses.iter().any(|name| name == class)
    }

    /// Number of direct superclasses.
    pub fn depth(&self) -> usize {
        self.superclasses.len()
    }

    /// Human readable description of the class and its fields.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_description(&mut out);
        out
    }

    fn write_description(&self, out: &mut String) -> fmt::Result {
        write!(out, "class {}", self.name)?;
        if !self.superclasses.is_empty() {
            write!(out, " : {}", self.superclasses.join(", "))?;
        }
        out.push('\n');

        if !self.attributes.is_empty() {
            out.push_str("  attributes:\n");
        }
        for spec in self.attributes.values() {
            write!(out, "    {}: {} [{}]", spec.name, spec.ty, spec.cardinality())?;
            if spec.range_src.is_some() {
                write!(out, " range {}", spec.range())?;
            }
            if let Some(init) = spec.init() {
                write!(out, " = {init}")?;
            }
            if !spec.description.is_empty() {
                write!(out, "  # {}", spec.description)?;
            }
            out.push('\n');
        }

        if !self.relations.is_empty() {
            out.push_str("  relations:\n");
        }
        for spec in self.relations.values() {
            write!(out, "    {}: {} [{}]", spec.name, spec.class, spec.cardinality())?;
            if spec.aggregation {
                out.push_str(" aggregation");
            }
            if !spec.description.is_empty() {
                write!(out, "  # {}", spec.description)?;
            }
            out.push('\n');
        }

        Ok(())
    }
}
