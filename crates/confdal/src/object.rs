mod field;
pub use field::Field;

mod query;
pub use query::{Found, Query};

use crate::registry::DalType;
use confdal_core::{
    coerce,
    schema::{ClassSchema, RelationSpec},
    Error, Result, ValidationErrorKind, Value,
};

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use std::{
    cell::RefCell,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// An instance of a derived class type.
///
/// `DalObject` is a shared handle: clones refer to the same instance and
/// see each other's writes. Two objects are equal when they have the same
/// class and id, wherever they came from.
#[derive(Clone)]
pub struct DalObject(Rc<RefCell<ObjectInner>>);

struct ObjectInner {
    ty: DalType,
    id: String,

    /// `id@class`
    full_name: String,

    values: IndexMap<String, Field>,

    /// Relations written since the last persist
    touched: Vec<String>,

    /// Id the object had before the first rename not yet persisted
    old_id: Option<String>,
}

/// Objects written to since the last reset, keyed by `id@class`. Equal
/// objects share one entry, held by the first instance written.
#[derive(Default)]
pub(crate) struct DirtySet(RefCell<IndexMap<String, DalObject>>);

impl DalObject {
    pub fn new(ty: &DalType, id: impl Into<String>) -> DalObject {
        let id = id.into();
        DalObject(Rc::new(RefCell::new(ObjectInner {
            full_name: format!("{id}@{}", ty.name()),
            ty: ty.clone(),
            id,
            values: IndexMap::new(),
            touched: vec![],
            old_id: None,
        })))
    }

    /// Sets `name` and returns the object, for building objects in one
    /// expression.
    pub fn with(self, name: &str, value: impl Into<Field>) -> Result<DalObject> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn id(&self) -> String {
        self.0.borrow().id.clone()
    }

    pub fn class_name(&self) -> String {
        self.0.borrow().ty.name().to_string()
    }

    /// `id@class`, the key objects are cached under.
    pub fn full_name(&self) -> String {
        self.0.borrow().full_name.clone()
    }

    pub fn ty(&self) -> DalType {
        self.0.borrow().ty.clone()
    }

    pub fn schema(&self) -> Rc<ClassSchema> {
        self.0.borrow().ty.schema().clone()
    }

    /// True if both handles point to the same instance.
    pub fn ptr_eq(&self, other: &DalObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Reads a field.
    ///
    /// An unset attribute takes its initial value if the schema declares
    /// one; unset multivalue fields become empty sequences. Unset
    /// single-valued fields read as [`Field::Unset`] and stay unset.
    pub fn get(&self, name: &str) -> Result<Field> {
        if name == "id" {
            return Ok(Field::Value(Value::String(self.id())));
        }

        let schema = self.schema();
        let mut inner = self.0.borrow_mut();

        if let Some(value) = inner.values.get(name) {
            return Ok(value.clone());
        }

        let materialized = if let Some(spec) = schema.attribute(name) {
            match spec.init() {
                Some(init) => Field::Value(init.clone()),
                None if spec.multivalue => Field::Value(Value::List(vec![])),
                None => return Ok(Field::Unset),
            }
        } else if let Some(spec) = schema.relation(name) {
            if !spec.multivalue {
                return Ok(Field::Unset);
            }
            Field::Objects(vec![])
        } else {
            return Err(Error::unknown_field(&schema.name, name));
        };

        inner.values.insert(name.to_string(), materialized.clone());
        Ok(materialized)
    }

    /// Writes a field after validating it against the schema.
    ///
    /// Attributes are checked for cardinality, then coerced and range
    /// checked. Relations are checked for cardinality, then every target
    /// must be an object of the relation's class or one of its
    /// subclasses. Writing [`Field::Unset`] clears the field.
    pub fn set(&self, name: &str, value: impl Into<Field>) -> Result<()> {
        let value = value.into();
        let schema = self.schema();

        if name == "id" {
            return match value {
                Field::Value(Value::String(id)) => {
                    self.set_id(id);
                    Ok(())
                }
                value => Err(Error::validation(
                    "id",
                    self.full_name(),
                    &value,
                    ValidationErrorKind::Coercion {
                        to: "string".into(),
                    },
                )),
            };
        }

        let checked = if value.is_unset() {
            Field::Unset
        } else if let Some(spec) = schema.attribute(name) {
            let owner = self.full_name();
            let raw = match value {
                Field::Value(value) => value,
                value => {
                    let kind = if value.is_objects() != spec.multivalue {
                        ValidationErrorKind::Cardinality {
                            multivalue: spec.multivalue,
                        }
                    } else {
                        ValidationErrorKind::Coercion {
                            to: spec.ty.tag().into(),
                        }
                    };
                    return Err(Error::validation(name, owner, &value, kind));
                }
            };
            let shared = self.ty();
            let is_known = |class: &str| shared.shared().known.borrow().contains(class);
            Field::Value(coerce::coerce(spec, &owner, raw, &is_known)?)
        } else if let Some(spec) = schema.relation(name) {
            self.check_relation(spec, value)?
        } else {
            return Err(Error::unknown_field(&schema.name, name));
        };

        self.store(name, checked, schema.relation(name).is_some());
        self.mark_updated();
        Ok(())
    }

    /// Writes a field without validating the value. Unknown names are still
    /// rejected.
    pub fn set_unchecked(&self, name: &str, value: impl Into<Field>) -> Result<()> {
        let value = value.into();

        if name == "id" {
            if let Field::Value(Value::String(id)) = value {
                self.set_id(id);
                return Ok(());
            }
        }

        let schema = self.schema();
        if !schema.has_field(name) {
            return Err(Error::unknown_field(&schema.name, name));
        }

        self.store(name, value, schema.relation(name).is_some());
        self.mark_updated();
        Ok(())
    }

    /// Stores a value read from the store. Neither marks the object
    /// updated nor the relation touched.
    pub(crate) fn load(&self, name: &str, value: Field) {
        let mut inner = self.0.borrow_mut();
        if value.is_unset() {
            inner.values.shift_remove(name);
        } else {
            inner.values.insert(name.to_string(), value);
        }
    }

    fn store(&self, name: &str, value: Field, relation: bool) {
        self.load(name, value);
        if relation {
            let mut inner = self.0.borrow_mut();
            if !inner.touched.iter().any(|touched| touched == name) {
                inner.touched.push(name.to_string());
            }
        }
    }

    fn check_relation(&self, spec: &RelationSpec, value: Field) -> Result<Field> {
        let cardinality = || ValidationErrorKind::Cardinality {
            multivalue: spec.multivalue,
        };
        let target = |object: &DalObject| {
            if object.is_a(&spec.class) {
                Ok(())
            } else {
                Err(Error::validation(
                    &spec.name,
                    self.full_name(),
                    Field::Object(object.clone()),
                    ValidationErrorKind::Target {
                        expected: spec.class.as_str().into(),
                    },
                ))
            }
        };

        match value {
            Field::Object(object) if !spec.multivalue => {
                target(&object)?;
                Ok(Field::Object(object))
            }
            Field::Objects(objects) if spec.multivalue => {
                objects.iter().try_for_each(target)?;
                Ok(Field::Objects(objects))
            }
            value => {
                let kind = if value.is_sequence() != spec.multivalue {
                    cardinality()
                } else {
                    ValidationErrorKind::Target {
                        expected: spec.class.as_str().into(),
                    }
                };
                Err(Error::validation(&spec.name, self.full_name(), &value, kind))
            }
        }
    }

    fn set_id(&self, id: String) {
        let old = {
            let mut inner = self.0.borrow_mut();
            let full_name = format!("{id}@{}", inner.ty.name());
            inner.id = id;
            std::mem::replace(&mut inner.full_name, full_name)
        };
        self.ty().shared().updated.rekey(self, &old);
    }

    fn mark_updated(&self) {
        self.ty().shared().updated.insert(self);
    }

    /// Changes the object's id. The store record keeps its old id until the
    /// object is next persisted.
    pub fn rename(&self, new_id: impl Into<String>) {
        let new_id = new_id.into();
        if new_id == self.id() {
            return;
        }

        {
            let mut inner = self.0.borrow_mut();
            if inner.old_id.is_none() {
                inner.old_id = Some(inner.id.clone());
            }
        }
        self.set_id(new_id);
    }

    /// The id the store still knows this object by, if a rename is pending.
    pub fn pending_rename(&self) -> Option<String> {
        self.0.borrow().old_id.clone()
    }

    pub(crate) fn clear_rename(&self) {
        self.0.borrow_mut().old_id = None;
    }

    /// Relations written since the object was last persisted.
    pub fn touched(&self) -> Vec<String> {
        self.0.borrow().touched.clone()
    }

    pub(crate) fn clear_touched(&self) {
        self.0.borrow_mut().touched.clear();
    }

    /// Copies every field `other` holds that this object's class also has.
    /// Fields unknown to this class are skipped.
    pub fn copy(&self, other: &DalObject) -> Result<()> {
        let schema = self.schema();
        let values: Vec<_> = other
            .0
            .borrow()
            .values
            .iter()
            .filter(|(name, _)| schema.has_field(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        for (name, value) in values {
            self.set_unchecked(&name, value)?;
        }
        Ok(())
    }

    /// Objects this object's relations point to, in schema order.
    pub(crate) fn related(&self) -> Vec<DalObject> {
        let schema = self.schema();
        let inner = self.0.borrow();

        schema
            .relations
            .keys()
            .filter_map(|name| inner.values.get(name))
            .flat_map(Field::objects)
            .collect()
    }

    /// This object and every object reachable from it, each once,
    /// depth first.
    pub fn traverse_all(&self) -> Vec<DalObject> {
        let mut visited = IndexMap::new();
        let mut stack = vec![self.clone()];

        while let Some(object) = stack.pop() {
            let key = object.full_name();
            if visited.contains_key(&key) {
                continue;
            }

            let related = object.related();
            visited.insert(key, object);
            stack.extend(related.into_iter().rev());
        }

        visited.into_values().collect()
    }

    /// Searches the objects reachable from this one.
    ///
    /// `class` and `query` each take an exact name, a pattern or nothing.
    /// Patterns must match from the start of the name. An exact id finds
    /// one object and fails if there is none; otherwise every match is
    /// returned, sorted.
    pub fn find(
        &self,
        class: impl Into<Query>,
        query: impl Into<Query>,
        include_subclasses: bool,
    ) -> Result<Found> {
        let class = class.into();
        let matches_class = |object: &DalObject| {
            if include_subclasses {
                object.types().iter().any(|name| class.matches(name))
            } else {
                class.matches(&object.class_name())
            }
        };

        let candidates = self.traverse_all().into_iter().filter(matches_class);

        match query.into() {
            Query::Id(id) => candidates
                .into_iter()
                .find(|object| object.id() == id)
                .map(Found::One)
                .ok_or_else(|| {
                    Error::object_not_found(format!("{id}@{class} under {}", self.full_name()))
                }),
            query => Ok(Found::many(
                candidates
                    .filter(|object| query.matches(&object.id()))
                    .collect(),
            )),
        }
    }

    /// True if `class` is this object's class or one of its ancestors.
    pub fn is_a(&self, class: &str) -> bool {
        self.0.borrow().ty.is_a(class)
    }

    /// True if `pattern` matches the start of this object's class name or
    /// of one of its ancestors'.
    pub fn is_a_pattern(&self, pattern: &Regex) -> bool {
        self.types().iter().any(|name| query::matches_at_start(pattern, name))
    }

    /// This object's class name followed by every ancestor's.
    pub fn types(&self) -> Vec<String> {
        self.0.borrow().ty.types()
    }
}

impl PartialEq for DalObject {
    fn eq(&self, other: &DalObject) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (lhs, rhs) = (self.0.borrow(), other.0.borrow());
        lhs.ty.name() == rhs.ty.name() && lhs.id == rhs.id
    }
}

impl Eq for DalObject {}

impl Hash for DalObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.borrow().full_name.hash(state);
    }
}

impl PartialOrd for DalObject {
    fn partial_cmp(&self, other: &DalObject) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DalObject {
    fn cmp(&self, other: &DalObject) -> Ordering {
        if self.ptr_eq(other) {
            return Ordering::Equal;
        }
        let (lhs, rhs) = (self.0.borrow(), other.0.borrow());
        lhs.ty
            .name()
            .cmp(rhs.ty.name())
            .then_with(|| lhs.id.cmp(&rhs.id))
    }
}

impl fmt::Debug for DalObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DalObject({})", self.0.borrow().full_name)
    }
}

impl fmt::Display for DalObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = self.schema();
        let inner = self.0.borrow();

        writeln!(f, "{}:", inner.full_name)?;

        for spec in schema.attributes.values() {
            write!(f, "  {}: ", spec.name)?;
            match (inner.values.get(&spec.name), spec.init()) {
                (Some(value), _) => writeln!(f, "{value}")?,
                (None, Some(init)) => writeln!(f, "<unset, defaults to {init}>")?,
                (None, None) if spec.not_null => writeln!(f, "<unset, must be set>")?,
                (None, None) => writeln!(f, "<unset>")?,
            }
        }

        for spec in schema.relations.values() {
            write!(f, "  {}: ", spec.name)?;
            match inner.values.get(&spec.name) {
                Some(value) => writeln!(f, "{value}")?,
                None if spec.not_null => writeln!(f, "<unset, must be set>")?,
                None => writeln!(f, "<unset>")?,
            }
        }

        Ok(())
    }
}

type ObjectPtr = *const RefCell<ObjectInner>;

impl DalObject {
    fn ptr(&self) -> ObjectPtr {
        Rc::as_ptr(&self.0)
    }

    /// Objects held by any field, once per reference.
    fn targets(&self) -> Vec<DalObject> {
        self.0
            .borrow()
            .values
            .values()
            .flat_map(|value| match value {
                Field::Object(object) => vec![object.clone()],
                Field::Objects(objects) => objects.clone(),
                _ => vec![],
            })
            .collect()
    }
}

/// Severs the fields of every object reachable from `roots` that nothing
/// outside these objects keeps alive, freeing the cycles among them.
/// Objects still held elsewhere, and everything they reach, keep their
/// fields.
pub(crate) fn release(roots: Vec<DalObject>) {
    let mut closure: IndexMap<ObjectPtr, DalObject> = IndexMap::new();
    let mut stack = roots;
    while let Some(object) = stack.pop() {
        if closure.contains_key(&object.ptr()) {
            continue;
        }
        stack.extend(object.targets());
        closure.insert(object.ptr(), object);
    }

    // Handles accounted for: the closure's own plus every field reference
    let mut internal: IndexMap<ObjectPtr, usize> = closure.keys().map(|ptr| (*ptr, 1)).collect();
    for object in closure.values() {
        for target in object.targets() {
            if let Some(count) = internal.get_mut(&target.ptr()) {
                *count += 1;
            }
        }
    }

    let mut stack: Vec<ObjectPtr> = closure
        .iter()
        .filter(|(ptr, object)| {
            internal
                .get(*ptr)
                .is_some_and(|count| Rc::strong_count(&object.0) > *count)
        })
        .map(|(ptr, _)| *ptr)
        .collect();

    let mut held = IndexSet::new();
    while let Some(ptr) = stack.pop() {
        if !held.insert(ptr) {
            continue;
        }
        if let Some(object) = closure.get(&ptr) {
            stack.extend(object.targets().iter().map(DalObject::ptr));
        }
    }

    let mut severed = vec![];
    for (ptr, object) in &closure {
        if !held.contains(ptr) {
            severed.extend(object.0.borrow_mut().take_objects());
        }
    }
    tracing::trace!(
        objects = closure.len(),
        severed = closure.len() - held.len(),
        "released objects"
    );
}

impl ObjectInner {
    fn take_objects(&mut self) -> Vec<DalObject> {
        let mut objects = vec![];
        for value in self.values.values_mut() {
            match std::mem::take(value) {
                Field::Object(object) => objects.push(object),
                Field::Objects(items) => objects.extend(items),
                other => *value = other,
            }
        }
        objects
    }
}

impl Drop for ObjectInner {
    // Long chains of objects are released one link at a time
    fn drop(&mut self) {
        let mut stack = self.take_objects();
        while let Some(object) = stack.pop() {
            if let Ok(inner) = Rc::try_unwrap(object.0) {
                stack.extend(inner.into_inner().take_objects());
            }
        }
    }
}

impl DirtySet {
    /// Returns `true` if the object was not in the set yet.
    pub(crate) fn insert(&self, object: &DalObject) -> bool {
        let key = object.full_name();
        let mut set = self.0.borrow_mut();
        if set.contains_key(&key) {
            return false;
        }
        set.insert(key, object.clone());
        true
    }

    /// Moves `object`'s entry after its id changed from `old`.
    pub(crate) fn rekey(&self, object: &DalObject, old: &str) {
        let mut set = self.0.borrow_mut();
        if !set.get(old).is_some_and(|entry| entry.ptr_eq(object)) {
            return;
        }
        set.shift_remove(old);
        set.entry(object.full_name()).or_insert_with(|| object.clone());
    }

    pub(crate) fn objects(&self) -> Vec<DalObject> {
        self.0.borrow().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub(crate) fn clear(&self) {
        let objects = std::mem::take(&mut *self.0.borrow_mut());
        drop(objects);
    }

    pub(crate) fn drain(&self) -> Vec<DalObject> {
        let objects = std::mem::take(&mut *self.0.borrow_mut());
        objects.into_values().collect()
    }
}

impl fmt::Debug for DirtySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.borrow().keys()).finish()
    }
}
