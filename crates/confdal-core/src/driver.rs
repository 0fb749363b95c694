mod accessor;
pub use accessor::{Accessor, AccessorKind};

mod record;
pub use record::RawRecord;

use crate::{
    schema::{AttributeDef, RelationDef},
    Result, Value,
};

use std::fmt::Debug;

/// The record store the mapping layer sits on.
///
/// A driver persists records, resolves the class hierarchy and reports the
/// schema of every class it knows about. Implementations use interior
/// mutability; the mapping layer is single-threaded and never calls a driver
/// re-entrantly.
pub trait Driver: Debug + 'static {
    /// Fetch the record `id` of class `class` (or of one of its subclasses).
    fn get_record(&self, class: &str, id: &str) -> Result<RawRecord>;

    /// Every record of class `class`, subclasses included.
    fn records(&self, class: &str) -> Result<Vec<RawRecord>>;

    /// Create a new, empty record in database `at`.
    fn create_record(&self, at: &str, class: &str, id: &str) -> Result<RawRecord>;

    fn destroy_record(&self, record: &RawRecord) -> Result<()>;

    /// Rename a record, returning the handle under its new id.
    fn rename_record(&self, record: &RawRecord, new_id: &str) -> Result<RawRecord>;

    /// True if `id` of class `class` (or of one of its subclasses) is visible.
    fn test_record(&self, class: &str, id: &str) -> bool;

    /// Names of every class visible to the loaded databases.
    fn classes(&self) -> Vec<String>;

    /// Attributes of `class`; inherited ones too when `all` is set.
    fn attributes(&self, class: &str, all: bool) -> Result<Vec<AttributeDef>>;

    /// Relations of `class`; inherited ones too when `all` is set.
    fn relations(&self, class: &str, all: bool) -> Result<Vec<RelationDef>>;

    /// Superclasses of `class`, direct ones first; all ancestors when `all` is set.
    fn superclasses(&self, class: &str, all: bool) -> Result<Vec<String>>;

    /// Subclasses of `class`; all descendants when `all` is set.
    fn subclasses(&self, class: &str, all: bool) -> Result<Vec<String>>;

    /// Read a field through the typed accessor bound to it.
    fn get(&self, record: &RawRecord, name: &str, accessor: Accessor) -> Result<Value>;

    /// Write a field through the typed accessor bound to it.
    fn set(&self, record: &RawRecord, name: &str, accessor: Accessor, value: Value) -> Result<()>;

    /// Names of the databases explicitly loaded.
    fn databases(&self) -> Vec<String>;

    /// Create a database including `includes` and load it.
    fn create_database(&self, name: &str, includes: &[String]) -> Result<()>;

    fn includes(&self, at: &str) -> Result<Vec<String>>;

    fn add_include(&self, at: &str, include: &str) -> Result<()>;

    fn remove_include(&self, at: &str, include: &str) -> Result<()>;

    /// Persist pending changes of every loaded database.
    fn commit(&self, comment: &str) -> Result<()>;
}
