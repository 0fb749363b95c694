use crate::{
    object::{self, DirtySet},
    DalObject,
};
use confdal_core::{schema::ClassSchema, Driver, Error, Result, SchemaCache};

use indexmap::{IndexMap, IndexSet};
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
    rc::Rc,
};

/// Handle to a derived class type. Two handles are the same type iff they
/// point to the same [`ClassType`].
pub type DalType = Rc<ClassType>;

/// A type derived from one schema class.
pub struct ClassType {
    schema: Rc<ClassSchema>,

    /// Types of the direct superclasses
    bases: Vec<DalType>,

    shared: Rc<Shared>,
}

/// State reachable from every derived type and every object.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    /// Names of every derived type
    pub(crate) known: RefCell<IndexSet<String>>,

    /// Objects written to since the last reset
    pub(crate) updated: DirtySet,
}

/// The context every session works in: the schema of every class seen so
/// far, the types derived from it and the set of updated objects.
///
/// A registry outlives sessions and may be shared by several of them, so a
/// class seen twice always maps to the same type.
#[derive(Default)]
pub struct Registry {
    schemas: SchemaCache,
    types: RefCell<IndexMap<String, DalType>>,
    shared: Rc<Shared>,
}

impl ClassType {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &Rc<ClassSchema> {
        &self.schema
    }

    /// Types of the direct superclasses, in declaration order.
    pub fn bases(&self) -> &[DalType] {
        &self.bases
    }

    /// True if `class` names this type or one of its ancestors.
    pub fn is_a(&self, class: &str) -> bool {
        let mut stack = vec![self];
        while let Some(ty) = stack.pop() {
            if ty.name() == class {
                return true;
            }
            stack.extend(ty.bases.iter().map(|base| &**base));
        }
        false
    }

    /// This type's name followed by the name of every ancestor.
    pub fn types(&self) -> Vec<String> {
        let mut names = IndexSet::new();
        let mut queue = VecDeque::from([self]);
        while let Some(ty) = queue.pop_front() {
            if names.insert(ty.name().to_string()) {
                queue.extend(ty.bases.iter().map(|base| &**base));
            }
        }
        names.into_iter().collect()
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }
}

impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassType")
            .field("name", &self.name())
            .field(
                "bases",
                &self.bases.iter().map(|base| base.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    /// Picks up the classes the store made visible since the last refresh
    /// and derives their types. Returns the new types.
    pub fn refresh(&self, driver: &dyn Driver) -> Result<Vec<DalType>> {
        self.schemas.refresh(driver)?;

        let pending: Vec<_> = self
            .schemas
            .names()
            .into_iter()
            .filter(|name| !self.types.borrow().contains_key(name))
            .collect();

        self.derive(&pending)
    }

    /// Derives the types of `classes`, reusing the types of classes already
    /// derived.
    ///
    /// Classes with fewer superclasses go first. A class whose bases are not
    /// derived yet moves to the back of the queue; a full turn of the queue
    /// without progress means some base can never be derived.
    pub fn derive(&self, classes: &[String]) -> Result<Vec<DalType>> {
        let mut schemas = classes
            .iter()
            .map(|name| self.schemas.schema(name))
            .collect::<Result<Vec<_>>>()?;
        schemas.sort_by_key(|schema| schema.all_superclasses.len());

        let mut queue = VecDeque::from(schemas);
        let mut stalled = 0;

        while let Some(schema) = queue.pop_front() {
            if self.types.borrow().contains_key(&schema.name) {
                stalled = 0;
                continue;
            }

            let bases = {
                let types = self.types.borrow();
                schema
                    .superclasses
                    .iter()
                    .map(|name| types.get(name).cloned())
                    .collect::<Option<Vec<_>>>()
            };

            match bases {
                Some(bases) => {
                    tracing::debug!(class = %schema.name, bases = ?schema.superclasses, "deriving type");
                    self.insert(Rc::new(ClassType {
                        schema,
                        bases,
                        shared: self.shared.clone(),
                    }));
                    stalled = 0;
                }
                None => {
                    queue.push_back(schema);
                    stalled += 1;

                    if stalled >= queue.len() {
                        let blocked: Vec<_> =
                            queue.iter().map(|schema| schema.name.as_str()).collect();
                        return Err(Error::invalid_schema(format!(
                            "cannot derive types for {}: superclasses are missing",
                            blocked.join(", ")
                        )));
                    }
                }
            }
        }

        classes.iter().map(|name| self.ty(name)).collect()
    }

    /// Makes an externally built type available for derivation.
    ///
    /// Classes deriving from `name` use `base` as their superclass type.
    /// Registering a name that already has a type returns the existing one.
    pub fn register(&self, name: &str, bases: &[DalType]) -> Result<DalType> {
        if let Some(ty) = self.get(name) {
            return Ok(ty);
        }

        let ty = Rc::new(ClassType {
            schema: self.schemas.schema(name)?,
            bases: bases.to_vec(),
            shared: self.shared.clone(),
        });
        self.insert(ty.clone());
        Ok(ty)
    }

    fn insert(&self, ty: DalType) {
        self.shared.known.borrow_mut().insert(ty.name().to_string());
        self.types.borrow_mut().insert(ty.name().to_string(), ty);
    }

    pub fn get(&self, name: &str) -> Option<DalType> {
        self.types.borrow().get(name).cloned()
    }

    /// Like [`get`](Self::get), failing for classes with no type.
    pub fn ty(&self, name: &str) -> Result<DalType> {
        self.get(name)
            .ok_or_else(|| Error::invalid_schema(format!("no type derived for class `{name}`")))
    }

    /// Every derived type, in derivation order.
    pub fn types(&self) -> Vec<DalType> {
        self.types.borrow().values().cloned().collect()
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.shared.known.borrow().contains(name)
    }

    /// Objects written to since the last [`reset_updated`](Self::reset_updated).
    pub fn updated(&self) -> Vec<DalObject> {
        self.shared.updated.objects()
    }

    pub fn reset_updated(&self) {
        self.shared.updated.clear();
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        object::release(self.shared.updated.drain());
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.schemas.names())
            .field("updated", &self.shared.updated.len())
            .finish()
    }
}
