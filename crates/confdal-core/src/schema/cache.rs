use super::ClassSchema;
use crate::{Driver, Error, Result};

use indexmap::IndexMap;
use std::{cell::RefCell, rc::Rc};

/// Schema of every class seen so far.
///
/// The cache only ever grows: a refresh adds the classes that became
/// visible and leaves existing entries untouched, so schemas handed out
/// earlier stay valid.
#[derive(Debug, Default)]
pub struct SchemaCache {
    classes: RefCell<IndexMap<String, Rc<ClassSchema>>>,
}

impl SchemaCache {
    pub fn new() -> SchemaCache {
        SchemaCache::default()
    }

    /// Builds a cache holding every class the store knows about.
    pub fn load(driver: &dyn Driver) -> Result<SchemaCache> {
        let cache = SchemaCache::new();
        cache.refresh(driver)?;
        Ok(cache)
    }

    /// Adds the classes not cached yet and returns their names.
    pub fn refresh(&self, driver: &dyn Driver) -> Result<Vec<String>> {
        let mut added = vec![];

        for name in driver.classes() {
            if self.contains(&name) {
                continue;
            }

            let schema = ClassSchema::load(driver, &name)?;
            self.classes
                .borrow_mut()
                .insert(name.clone(), Rc::new(schema));
            added.push(name);
        }

        if !added.is_empty() {
            tracing::debug!(classes = ?added, "schema cache refreshed");
        }

        Ok(added)
    }

    pub fn get(&self, name: &str) -> Option<Rc<ClassSchema>> {
        self.classes.borrow().get(name).cloned()
    }

    /// Like [`get`](Self::get), failing for classes never seen.
    pub fn schema(&self, name: &str) -> Result<Rc<ClassSchema>> {
        self.get(name)
            .ok_or_else(|| Error::invalid_schema(format!("unknown class `{name}`")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.borrow().contains_key(name)
    }

    /// Cached class names, in the order they were added.
    pub fn names(&self) -> Vec<String> {
        self.classes.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.classes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.borrow().is_empty()
    }
}
