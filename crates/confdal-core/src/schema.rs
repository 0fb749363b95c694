//! Per-class schema metadata, built from what the record store reports.

mod attribute;
pub use attribute::AttributeSpec;

mod cache;
pub use cache::SchemaCache;

mod class;
pub use class::{cardinality, ClassSchema};

mod def;
pub use def::{AttributeDef, RelationDef};

mod range;
pub use range::{Range, RangeItem};

mod relation;
pub use relation::RelationSpec;

mod ty;
pub use ty::{AttributeType, Category};
